use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "onecard";

pub const DEFAULT_TITLE: &str = "Contact editor";
const DEFAULT_STATUS_TTL_MS: u64 = 4000;

const DEFAULT_ADDRESS_LABELS: &[&str] = &["Home", "Work", "Other"];
const DEFAULT_PHONE_LABELS: &[&str] = &["Mobile", "Home", "Work", "Fax", "Other"];
const DEFAULT_MAIL_LABELS: &[&str] = &["Home", "Work", "Other"];

#[derive(Debug, Clone)]
pub struct Config {
    /// Window title shown while the name field is blank.
    pub default_title: String,
    /// How long a transient status message stays on screen.
    pub status_ttl_ms: u64,
    pub labels: LabelPresets,
}

/// Category presets offered by the label cycler for each field kind.
/// Labels on disk are free-form; these only seed the UI.
#[derive(Debug, Clone)]
pub struct LabelPresets {
    pub address: Vec<String>,
    pub phone: Vec<String>,
    pub mail: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_title: DEFAULT_TITLE.to_string(),
            status_ttl_ms: DEFAULT_STATUS_TTL_MS,
            labels: LabelPresets {
                address: to_strings(DEFAULT_ADDRESS_LABELS),
                phone: to_strings(DEFAULT_PHONE_LABELS),
                mail: to_strings(DEFAULT_MAIL_LABELS),
            },
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    default_title: Option<String>,
    status_ttl_ms: Option<u64>,
    #[serde(default)]
    labels: LabelsFile,
}

#[derive(Debug, Default, Deserialize)]
struct LabelsFile {
    address: Option<Vec<String>>,
    phone: Option<Vec<String>>,
    mail: Option<Vec<String>>,
}

/// Load configuration from the platform config dir. A missing file is not
/// an error; the editor must start bare on a fresh machine.
pub fn load() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(Config::default());
    }
    load_from(&path)
}

fn load_from(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;
    let file: ConfigFile = toml::from_str(&raw)
        .with_context(|| format!("failed to parse {} as TOML", path.display()))?;
    Ok(merge(file))
}

fn merge(file: ConfigFile) -> Config {
    let defaults = Config::default();
    Config {
        default_title: file.default_title.unwrap_or(defaults.default_title),
        status_ttl_ms: file.status_ttl_ms.unwrap_or(defaults.status_ttl_ms),
        labels: LabelPresets {
            address: file.labels.address.unwrap_or(defaults.labels.address),
            phone: file.labels.phone.unwrap_or(defaults.labels.phone),
            mail: file.labels.mail.unwrap_or(defaults.labels.mail),
        },
    }
}

fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("ONECARD_CONFIG") {
        return Ok(expand_tilde(Path::new(&path)));
    }
    let base = BaseDirs::new().context("could not determine home directory")?;
    Ok(base.config_dir().join(APP_NAME).join(CONFIG_FILE_NAME))
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}
