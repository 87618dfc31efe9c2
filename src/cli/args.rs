//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

use crate::watcher::WatchMode;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Watch files and directories, print normalized change events
#[derive(Parser, Debug)]
#[command(
    name = "pathwarden",
    version = env!("CARGO_PKG_VERSION"),
    about = "Watch files and directories, print normalized change events",
    long_about = "Watch a file or a directory tree and print one event per real change.\n\
                  Roots that do not exist yet are waited for; roots that disappear are\n\
                  reported and waited for again.",
    styles = clap_cargo_style()
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch a single path
    Watch {
        /// File or directory to watch (need not exist yet)
        path: PathBuf,

        /// Watch a single file or a whole directory tree
        #[arg(short, long, value_enum, default_value_t = WatchMode::Dir)]
        mode: WatchMode,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Watch every [[watches]] entry from the settings file
    Run {
        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Display active settings
    Config,

    /// Create .pathwarden/settings.toml in the current directory
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_watch_defaults_to_dir_mode() {
        let cli = Cli::try_parse_from(["pathwarden", "watch", "/srv/inbox"]).unwrap();
        match cli.command {
            Commands::Watch { path, mode, json } => {
                assert_eq!(path, PathBuf::from("/srv/inbox"));
                assert_eq!(mode, WatchMode::Dir);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_watch_file_mode_json() {
        let cli = Cli::try_parse_from([
            "pathwarden",
            "watch",
            "app.conf",
            "--mode",
            "file",
            "--json",
            "-c",
            "custom.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert!(matches!(
            cli.command,
            Commands::Watch {
                mode: WatchMode::File,
                json: true,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["pathwarden", "watch", "x", "--mode", "pipe"]).is_err());
    }
}
