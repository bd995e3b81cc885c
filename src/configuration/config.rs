use super::types::OutputFormat;
use crate::error_handling::types::ConfigError;
use crate::session_management::KeyPolicy;
use clap::Parser;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ADDR: &str = ":2055";
pub const DEFAULT_READ_BUFFER: usize = 2 << 16;
pub const DEFAULT_MAX_DATAGRAM: usize = 8192;
pub const MIN_READ_BUFFER: usize = 1024;
pub const MAX_DATAGRAM_RANGE: std::ops::RangeInclusive<usize> = 512..=65535;

/// Long flags also accepted with a single leading dash (`-addr :2055`).
const LONG_FLAGS: [&str; 7] = [
    "addr",
    "config",
    "key-by",
    "read-buffer",
    "max-datagram",
    "format",
    "session-timeout-secs",
];

/// Command-line flags. Every flag is optional so that unset flags fall back
/// to the configuration file, then to the built-in defaults.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "nf-dump")]
#[command(version)]
#[command(about = "Receive NetFlow v1/5/6/7/9 and IPFIX datagrams and dump them")]
pub struct Args {
    /// Listen address as host:port; an empty host listens on all IPv4 interfaces
    #[arg(long, env = "NF_DUMP_ADDR", value_name = "ADDR")]
    pub addr: Option<String>,

    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// How exporters are told apart
    #[arg(long, value_enum)]
    pub key_by: Option<KeyPolicy>,

    /// Socket receive buffer size in bytes
    #[arg(long, value_name = "BYTES")]
    pub read_buffer: Option<usize>,

    /// Largest datagram read in one receive, in bytes
    #[arg(long, value_name = "BYTES")]
    pub max_datagram: Option<usize>,

    /// Output rendering
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Evict exporter sessions idle for this long; 0 never evicts
    #[arg(long, value_name = "SECS")]
    pub session_timeout_secs: Option<u64>,
}

/// Application configuration after merging flags, file and defaults.
///
/// # Examples
///
/// ```
/// use nf_dump::configuration::Config;
///
/// let config = Config::from_toml("addr = \"127.0.0.1:9995\"\nformat = \"json\"").unwrap();
/// assert_eq!(config.addr, "127.0.0.1:9995");
/// assert_eq!(config.max_datagram, 8192);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub addr: String,
    pub key_by: KeyPolicy,
    pub read_buffer: usize,
    pub max_datagram: usize,
    pub format: OutputFormat,
    pub session_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            key_by: KeyPolicy::default(),
            read_buffer: DEFAULT_READ_BUFFER,
            max_datagram: DEFAULT_MAX_DATAGRAM,
            format: OutputFormat::default(),
            session_timeout_secs: 0,
        }
    }
}

impl Config {
    /// Builds the configuration from the process arguments.
    ///
    /// `--help`, `--version` and malformed flags are handled by `clap`, which
    /// prints and exits.
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::from_parsed(Args::parse_from(normalize_flags(std::env::args_os())))
    }

    /// Like [`Config::from_args`] over an explicit argument list, returning
    /// flag errors instead of exiting.
    pub fn try_from_arg_iter<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let args = Args::try_parse_from(normalize_flags(args))
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
        Self::from_parsed(args)
    }

    /// Merges parsed flags over the file they name (if any) and validates the result.
    pub fn from_parsed(args: Args) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(addr) = args.addr {
            config.addr = addr;
        }
        if let Some(key_by) = args.key_by {
            config.key_by = key_by;
        }
        if let Some(read_buffer) = args.read_buffer {
            config.read_buffer = read_buffer;
        }
        if let Some(max_datagram) = args.max_datagram {
            config.max_datagram = max_datagram;
        }
        if let Some(format) = args.format {
            config.format = format;
        }
        if let Some(secs) = args.session_timeout_secs {
            config.session_timeout_secs = secs;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.addr.is_empty() || !self.addr.contains(':') {
            return Err(ConfigError::InvalidAddress(format!(
                "'{}' is not host:port",
                self.addr
            )));
        }
        if self.read_buffer < MIN_READ_BUFFER {
            return Err(ConfigError::NotInRange(format!(
                "read-buffer {} is below {}",
                self.read_buffer, MIN_READ_BUFFER
            )));
        }
        if !MAX_DATAGRAM_RANGE.contains(&self.max_datagram) {
            return Err(ConfigError::NotInRange(format!(
                "max-datagram {} is outside {}..={}",
                self.max_datagram,
                MAX_DATAGRAM_RANGE.start(),
                MAX_DATAGRAM_RANGE.end()
            )));
        }
        Ok(())
    }

    /// Idle timeout for exporter sessions, `None` when eviction is disabled.
    pub fn session_timeout(&self) -> Option<Duration> {
        match self.session_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn normalize_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let Some(rest) = text.strip_prefix('-') else {
                return arg;
            };
            let name = rest.split('=').next().unwrap_or(rest);
            if !rest.starts_with('-') && LONG_FLAGS.contains(&name) {
                OsString::from(format!("-{}", text))
            } else {
                arg
            }
        })
        .collect()
}
