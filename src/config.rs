//! Configuration management for Docconv Server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid format override '{0}': expected ext=identifier")]
    InvalidOverride(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub conversion: ConversionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum request body size for `/convert`
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversionConfig {
    /// pandoc executable
    pub pandoc_path: String,
    /// LibreOffice (`soffice`) executable
    pub libreoffice_path: String,
    /// PDF engine handed to pandoc (`--pdf-engine`)
    pub pdf_engine: Option<String>,
    /// Retry failed pandoc runs through LibreOffice
    pub fallback_enabled: bool,
    /// What to do with extensions missing from the format table
    pub unknown_input: UnknownInputPolicy,
    /// Re-encode text-like inputs as UTF-8 before conversion
    pub normalize_text: bool,
    /// Extra `extension -> input format` entries, applied over the defaults
    pub format_overrides: Vec<(String, String)>,
    pub fetch_timeout_secs: u64,
    pub converter_timeout_secs: u64,
    /// Upper bound for documents fetched from a URL
    pub max_download_bytes: u64,
    /// Root directory for per-request temp artifacts
    pub temp_dir: PathBuf,
}

/// Input-format hint used for extensions the format table does not know
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownInputPolicy {
    /// Always pass this identifier to the converter
    Fixed(String),
    /// Omit the hint and let the converter detect the format
    AutoDetect,
}

impl UnknownInputPolicy {
    /// Parse `auto` or a converter identifier
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("auto") {
            UnknownInputPolicy::AutoDetect
        } else {
            UnknownInputPolicy::Fixed(value.to_lowercase())
        }
    }
}

impl Default for UnknownInputPolicy {
    fn default() -> Self {
        // pandoc has no "plain" reader; markdown is its generic text reader
        UnknownInputPolicy::Fixed("markdown".to_string())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_upload_bytes: 100 * 1024 * 1024,
            },
            conversion: ConversionConfig::default(),
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        ConversionConfig {
            pandoc_path: "pandoc".to_string(),
            libreoffice_path: "soffice".to_string(),
            pdf_engine: None,
            fallback_enabled: false,
            unknown_input: UnknownInputPolicy::default(),
            normalize_text: true,
            format_overrides: Vec::new(),
            fetch_timeout_secs: 60,
            converter_timeout_secs: 120,
            max_download_bytes: 100 * 1024 * 1024,
            temp_dir: env::temp_dir(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.server.max_upload_bytes)?,
            },
            conversion: ConversionConfig {
                pandoc_path: env::var("PANDOC_PATH").unwrap_or(defaults.conversion.pandoc_path),
                libreoffice_path: env::var("LIBREOFFICE_PATH")
                    .unwrap_or(defaults.conversion.libreoffice_path),
                pdf_engine: env::var("PANDOC_PDF_ENGINE").ok().filter(|s| !s.trim().is_empty()),
                fallback_enabled: parse_bool("FALLBACK_ENABLED", defaults.conversion.fallback_enabled)?,
                unknown_input: env::var("UNKNOWN_INPUT_FORMAT")
                    .map(|v| UnknownInputPolicy::parse(&v))
                    .unwrap_or(defaults.conversion.unknown_input),
                normalize_text: parse_bool("NORMALIZE_TEXT", defaults.conversion.normalize_text)?,
                format_overrides: match env::var("FORMAT_OVERRIDES") {
                    Ok(raw) => parse_overrides(&raw)?,
                    Err(_) => Vec::new(),
                },
                fetch_timeout_secs: parse_var("FETCH_TIMEOUT_SECS", defaults.conversion.fetch_timeout_secs)?,
                converter_timeout_secs: parse_var(
                    "CONVERTER_TIMEOUT_SECS",
                    defaults.conversion.converter_timeout_secs,
                )?,
                max_download_bytes: parse_var("MAX_DOWNLOAD_BYTES", defaults.conversion.max_download_bytes)?,
                temp_dir: env::var("TEMP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.conversion.temp_dir),
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue { name, value }),
        },
        Err(_) => Ok(default),
    }
}

/// Parse `docx=docx,txt=markdown` into table entries
pub fn parse_overrides(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (ext, ident) = pair
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidOverride(pair.to_string()))?;
            let ext = ext.trim().trim_start_matches('.').to_lowercase();
            let ident = ident.trim().to_lowercase();
            if ext.is_empty() || ident.is_empty() {
                return Err(ConfigError::InvalidOverride(pair.to_string()));
            }
            Ok((ext, ident))
        })
        .collect()
}
