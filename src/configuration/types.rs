use serde::Deserialize;

/// Rendering used for decoded messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Multi-line human-readable dump.
    #[default]
    Text,
    /// One JSON document per line.
    Json,
}
