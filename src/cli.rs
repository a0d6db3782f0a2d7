use std::path::PathBuf;

use clap::Parser;
use clap::builder::styling::{AnsiColor, Color, Style, Styles};

#[derive(Debug, Clone, Parser)]
#[command(name = "grit", author, version, about, styles = get_styles())]
pub struct Cli {
    /// Repository to open
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Configuration file (default: ~/.config/grit/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// CLI styling for colored help output
pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .header(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Yellow))),
        )
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green))))
        .invalid(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .error(
            Style::new()
                .bold()
                .fg_color(Some(Color::Ansi(AnsiColor::Red))),
        )
        .valid(
            Style::new()
                .bold()
                .underline()
                .fg_color(Some(Color::Ansi(AnsiColor::Green))),
        )
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
}
