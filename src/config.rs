//! User configuration
//!
//! Loaded once at startup from a TOML file. Key overrides are parsed into
//! `Key`s up front, so a typo in a key name is a startup error instead of a
//! binding that silently never fires.

use std::path::Path;

use eyre::{Result, WrapErr};
use serde::Deserialize;

use crate::tui::error::ConfigError;
use crate::tui::keys::Key;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Ask before quitting.
    pub confirm_on_quit: bool,
    /// How often panels are refreshed in the background, in milliseconds.
    pub refresh_interval_ms: u64,
    pub keys: KeyOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            confirm_on_quit: true,
            refresh_interval_ms: 2000,
            keys: KeyOverrides::default(),
        }
    }
}

/// Raw key names from the config file; `None` means use the default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeyOverrides {
    pub quit: Option<String>,
    pub help: Option<String>,
    pub fetch: Option<String>,
    pub refresh: Option<String>,
    pub stage: Option<String>,
    pub unstage: Option<String>,
    pub commit: Option<String>,
    pub checkout: Option<String>,
}

/// Key overrides resolved against the defaults.
#[derive(Debug, Clone, Copy)]
pub struct Keymap {
    pub quit: Key,
    pub help: Key,
    pub fetch: Key,
    pub refresh: Key,
    pub stage: Key,
    pub unstage: Key,
    pub commit: Key,
    pub checkout: Key,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading config at {}", path.display()))?;
        toml::from_str(&raw).wrap_err_with(|| format!("parsing config at {}", path.display()))
    }

    pub fn keymap(&self) -> Result<Keymap, ConfigError> {
        let k = &self.keys;
        Ok(Keymap {
            quit: resolve(&k.quit, Key::char('q'))?,
            help: resolve(&k.help, Key::char('?'))?,
            fetch: resolve(&k.fetch, Key::char('f'))?,
            refresh: resolve(&k.refresh, Key::char('r'))?,
            stage: resolve(&k.stage, Key::char('s'))?,
            unstage: resolve(&k.unstage, Key::char('u'))?,
            commit: resolve(&k.commit, Key::char('c'))?,
            checkout: resolve(&k.checkout, Key::char('o'))?,
        })
    }
}

fn resolve(name: &Option<String>, default: Key) -> Result<Key, ConfigError> {
    match name {
        Some(name) => Key::parse(name),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_without_a_file() {
        let config = Config::default();
        assert!(config.confirm_on_quit);
        assert_eq!(config.refresh_interval_ms, 2000);

        let keymap = config.keymap().unwrap();
        assert_eq!(keymap.quit, Key::char('q'));
        assert_eq!(keymap.help, Key::char('?'));
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let config: Config = toml::from_str(
            r#"
            confirm_on_quit = false

            [keys]
            quit = "ctrl+c"
            fetch = "F"
            "#,
        )
        .unwrap();

        assert!(!config.confirm_on_quit);
        let keymap = config.keymap().unwrap();
        assert_eq!(keymap.quit, Key::ctrl('c'));
        assert_eq!(keymap.fetch, Key::char('F'));
        // untouched keys keep their defaults
        assert_eq!(keymap.commit, Key::char('c'));
    }

    #[test]
    fn test_unknown_key_name_is_fatal() {
        let config: Config = toml::from_str(
            r#"
            [keys]
            quit = "hyper+q"
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.keymap(),
            Err(ConfigError::UnknownKeyName { .. })
        ));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let parsed: Result<Config, _> = toml::from_str("confirm_on_exit = true");
        assert!(parsed.is_err());
    }
}
