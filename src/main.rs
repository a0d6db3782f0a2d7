use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;

use grit::cli::Cli;
use grit::config::Config;
use grit::git::ShellGitService;
use grit::tui::App;

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let cli = Cli::parse();
    let config = match cli.config.clone().or_else(default_config_path) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    let git = Arc::new(ShellGitService::new(cli.repo.clone()));
    let mut app = App::new(&config, git)?;
    app.run()
}

fn default_config_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/grit/config.toml"))
}
