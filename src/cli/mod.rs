//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod analyze;
pub mod args;
pub mod context;
pub mod listen;

pub use args::{GlobalOptions, OutputFormat};
pub use context::CommandContext;

/// Timings report analyzer for Minecraft server timings links
#[derive(Parser, Debug)]
#[command(name = "timingsbot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "TIMINGSBOT_FORMAT",
        default_value = "pretty",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "TIMINGSBOT_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "TIMINGSBOT_DEBUG", hide_env = true)]
    pub debug: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze the timings link found in TEXT (or stdin)
    Analyze {
        /// Message text; read from stdin when omitted
        text: Vec<String>,
    },

    /// Treat each stdin line as a chat message and answer every timings link
    Listen {
        /// Sender name attached to every message
        #[arg(long, default_value = "stdin")]
        sender: String,
    },

    /// Display version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_collects_words() {
        let cli = Cli::parse_from(["timingsbot", "analyze", "see", "https://timings.aikar.co/?id=1"]);

        match cli.command {
            Commands::Analyze { text } => {
                assert_eq!(text, vec!["see", "https://timings.aikar.co/?id=1"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.format, OutputFormat::Pretty);
        assert!(!cli.debug);
    }

    #[test]
    fn test_listen_sender_default() {
        let cli = Cli::parse_from(["timingsbot", "listen", "--format", "table"]);

        match cli.command {
            Commands::Listen { sender } => assert_eq!(sender, "stdin"),
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.format, OutputFormat::Table);
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
