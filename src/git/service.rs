//! Git execution
//!
//! Everything that touches the repository goes through `GitService`, so the
//! rest of the app (and every test) can swap in a fake. The real
//! implementation shells out to `git` and folds stderr into the error on
//! failure.

use std::path::PathBuf;

use eyre::Result;

use super::command::GitCommand;

pub trait GitService: Send + Sync {
    /// Run a command and return its stdout.
    fn execute(&self, cmd: &GitCommand) -> Result<String>;

    /// Head commit message, trailing newline stripped.
    fn head_message(&self) -> Result<String> {
        Ok(self
            .execute(&GitCommand::head_message())?
            .trim_end()
            .to_string())
    }

    /// Currently checked-out branch name.
    fn current_branch(&self) -> Result<String> {
        Ok(self
            .execute(&GitCommand::current_branch())?
            .trim_end()
            .to_string())
    }

    /// Porcelain status, one entry per changed file.
    fn status_lines(&self) -> Result<Vec<String>> {
        Ok(lines_of(&self.execute(&GitCommand::status())?))
    }

    /// Local branch names.
    fn branch_lines(&self) -> Result<Vec<String>> {
        Ok(lines_of(&self.execute(&GitCommand::branches())?))
    }
}

fn lines_of(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|l| l.trim_end().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Shells out to the `git` binary in a working directory.
pub struct ShellGitService {
    dir: PathBuf,
}

impl ShellGitService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl GitService for ShellGitService {
    fn execute(&self, cmd: &GitCommand) -> Result<String> {
        log::debug!("running {cmd}");
        let output = duct::cmd("git", cmd.args())
            .dir(&self.dir)
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.is_empty() {
                eyre::bail!("{cmd} failed with exit code {:?}", output.status.code());
            }
            eyre::bail!("{stderr}");
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
