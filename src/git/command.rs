//! Git command builders
//!
//! Each builder produces the exact argument vector that will be executed.
//! The `Display` rendering is part of the contract: it is what the UI shows
//! and what tests assert against, so it must match what a user could paste
//! into a shell.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommand {
    args: Vec<String>,
}

impl GitCommand {
    fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Arguments passed to `git`, in order, unquoted.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Build a commit command. Each line of the message becomes its own `-m`
    /// segment, which is how git reassembles a multi-line message.
    pub fn commit(message: &str, flags: &[&str]) -> Self {
        let mut args: Vec<String> = vec!["commit".to_string()];
        args.extend(flags.iter().map(|f| f.to_string()));
        for line in message.lines() {
            args.push("-m".to_string());
            args.push(line.to_string());
        }
        Self { args }
    }

    pub fn fetch() -> Self {
        Self::new(["fetch"])
    }

    pub fn stage(path: &str) -> Self {
        Self::new(["add", "--", path])
    }

    pub fn unstage(path: &str) -> Self {
        Self::new(["reset", "HEAD", "--", path])
    }

    pub fn checkout(branch: &str) -> Self {
        Self::new(["checkout", branch])
    }

    pub fn head_message() -> Self {
        Self::new(["log", "-1", "--pretty=%B"])
    }

    pub fn current_branch() -> Self {
        Self::new(["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn status() -> Self {
        Self::new(["status", "--porcelain"])
    }

    pub fn branches() -> Self {
        Self::new(["branch", "--format=%(refname:short)"])
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git")?;
        for arg in &self.args {
            write!(f, " {}", render_arg(arg))?;
        }
        Ok(())
    }
}

/// Shell-equivalent rendering of one argument: plain args pass through,
/// anything the shell would reinterpret gets double-quoted with the usual
/// backslash escapes.
fn render_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_alphanumeric() || "-_./=:%@,+".contains(c));
    if plain {
        return arg.to_string();
    }

    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_splits_message_lines_into_m_segments() {
        let cmd = GitCommand::commit("line one\nline two", &["--flag"]);
        assert_eq!(cmd.to_string(), r#"git commit --flag -m "line one" -m "line two""#);
    }

    #[test]
    fn test_commit_single_line_without_flags() {
        let cmd = GitCommand::commit("fix parser", &[]);
        assert_eq!(cmd.to_string(), r#"git commit -m "fix parser""#);
        assert_eq!(cmd.args(), ["commit", "-m", "fix parser"]);
    }

    #[test]
    fn test_rendering_escapes_shell_metacharacters() {
        let cmd = GitCommand::commit(r#"say "hi" for $5"#, &[]);
        assert_eq!(cmd.to_string(), r#"git commit -m "say \"hi\" for \$5""#);
    }

    #[test]
    fn test_plain_args_are_not_quoted() {
        assert_eq!(GitCommand::fetch().to_string(), "git fetch");
        assert_eq!(
            GitCommand::stage("src/main.rs").to_string(),
            "git add -- src/main.rs"
        );
        assert_eq!(
            GitCommand::unstage("src/main.rs").to_string(),
            "git reset HEAD -- src/main.rs"
        );
    }

    #[test]
    fn test_path_with_spaces_is_quoted() {
        assert_eq!(
            GitCommand::stage("my file.rs").to_string(),
            r#"git add -- "my file.rs""#
        );
    }

    #[test]
    fn test_read_builders() {
        assert_eq!(
            GitCommand::head_message().args(),
            ["log", "-1", "--pretty=%B"]
        );
        assert_eq!(
            GitCommand::branches().args(),
            ["branch", "--format=%(refname:short)"]
        );
    }
}
