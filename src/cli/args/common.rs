//! Common CLI types shared across commands

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty format - colored findings with a spinner while waiting
    #[default]
    Pretty,
    /// Table format - one row per finding
    Table,
    /// JSON format - structured for scripts
    Json,
}
