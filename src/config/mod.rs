/// Configuration system for custpulse.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults** - [`schema::CustpulseConfig::default()`]
/// 2. **User global config** - `~/.custpulse/config.toml`
/// 3. **Project local config** - `.custpulse.toml` in the current directory
/// 4. **Environment variables** - highest precedence
///
/// Layers are merged key by key: a file that only sets `[dashboard] bins`
/// leaves every other value from the previous layer in place.
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::CustpulseConfig;

/// Environment variables checked for the service credential, in order.
pub const API_KEY_VARS: [&str; 3] = ["CUSTPULSE_API_KEY", "GEMINI_API_KEY", "API_KEY"];

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration: defaults → global TOML → project
/// TOML → env vars.
pub fn load() -> CustpulseConfig {
    let mut config = load_files(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config);
    config
}

/// Merge the given TOML files over the defaults, in order.
///
/// Missing or malformed files are skipped, including files that parse as
/// TOML but carry a value of the wrong type.
pub fn load_files(paths: &[Option<PathBuf>]) -> CustpulseConfig {
    let Ok(mut merged) = toml::Value::try_from(CustpulseConfig::default()) else {
        return CustpulseConfig::default();
    };

    let layers: Vec<toml::Value> = paths
        .iter()
        .flatten()
        .filter_map(|path| read_toml_value(path))
        .collect();

    // api_key is skipped on serialization, so it never survives the value
    // round trip; pick it up from the last layer that sets it.
    let api_key = layers
        .iter()
        .filter_map(|layer| layer.get("analysis")?.get("api_key")?.as_str())
        .last()
        .map(str::to_string);

    for layer in layers {
        merge_values(&mut merged, layer);
    }

    let mut config: CustpulseConfig = merged.try_into().unwrap_or_default();
    if api_key.is_some() {
        config.analysis.api_key = api_key;
    }
    config
}

/// Read one config layer; `None` unless it deserializes into the schema.
fn read_toml_value(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    let value: toml::Value = toml::from_str(&content).ok()?;
    value.clone().try_into::<CustpulseConfig>().ok()?;
    Some(value)
}

/// Recursively overlay `overlay` onto `base`. Tables merge; other values
/// replace.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// `~/.custpulse/`
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".custpulse"))
}

fn global_config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".custpulse.toml"))
}

/// Path to the global config file, for display and `config init`.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Path to the project config file, for display.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `CUSTPULSE_API_KEY`, `GEMINI_API_KEY`, `API_KEY` - service credential
///   (first non-empty wins)
/// - `CUSTPULSE_MODEL` - model name
/// - `CUSTPULSE_BASE_URL` - API base URL
/// - `CUSTPULSE_TIMEOUT_MS` - request timeout
/// - `CUSTPULSE_LOGGING` - run log on/off
fn apply_env_overrides(config: &mut CustpulseConfig) {
    if let Some(key) = API_KEY_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|val| !val.trim().is_empty())
    {
        config.analysis.api_key = Some(key);
    }

    if let Ok(val) = std::env::var("CUSTPULSE_MODEL")
        && !val.is_empty()
    {
        config.analysis.model = val;
    }
    if let Ok(val) = std::env::var("CUSTPULSE_BASE_URL")
        && !val.is_empty()
    {
        config.analysis.base_url = val;
    }
    if let Ok(val) = std::env::var("CUSTPULSE_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.analysis.timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("CUSTPULSE_LOGGING") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / show
// ---------------------------------------------------------------------------

/// Write the annotated default config to `~/.custpulse/config.toml`.
///
/// Refuses to overwrite an existing file unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.custpulse/ directory")?;
    }

    fs::write(&path, CustpulseConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single dotted key (e.g. `dashboard.bins`) in the global config file.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(&path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config as TOML value")?
    } else {
        toml::Value::try_from(CustpulseConfig::default())
            .context("failed to serialize default config")?
    };

    // Fill in sections missing from a hand-written file so the key can be
    // located and typed against its default.
    let mut defaults = toml::Value::try_from(CustpulseConfig::default())
        .context("failed to serialize default config")?;
    merge_values(&mut defaults, root);
    root = defaults;

    set_toml_value(&mut root, key, value)?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path, parsing the raw
/// text according to the type of the value it replaces.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let Some((section_path, leaf)) = key.rsplit_once('.') else {
        anyhow::bail!("config key must be of the form section.key, got '{key}'");
    };

    let mut current = root;
    for part in section_path.split('.') {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{section_path}'"))?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None if leaf == "log_path" || leaf == "api_key" => {
            toml::Value::String(raw_value.to_string())
        }
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// The effective (fully resolved) config as TOML. The API key is omitted.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, content: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("custpulse-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_files_without_files_gives_defaults() {
        let config = load_files(&[None, None]);
        assert_eq!(config.dashboard.bins, 5);
        assert_eq!(config.analysis.model, "gemini-2.5-flash");
    }

    #[test]
    fn later_layers_override_only_the_keys_they_set() {
        let global = temp_file(
            "global.toml",
            "[analysis]\nmodel = \"global-model\"\ntemperature = 0.7\n",
        );
        let project = temp_file("project.toml", "[analysis]\nmodel = \"project-model\"\n");

        let config = load_files(&[Some(global), Some(project)]);
        assert_eq!(config.analysis.model, "project-model");
        assert_eq!(config.analysis.temperature, 0.7);
        assert_eq!(config.dashboard.top_preferences, 10);
    }

    #[test]
    fn api_key_in_file_is_picked_up() {
        let file = temp_file("key.toml", "[analysis]\napi_key = \"from-file\"\n");
        let config = load_files(&[Some(file)]);
        assert_eq!(config.analysis.api_key(), Some("from-file"));
    }

    #[test]
    fn malformed_file_is_skipped() {
        let bad = temp_file("bad.toml", "[dashboard\nbins = ");
        let config = load_files(&[Some(bad)]);
        assert_eq!(config.dashboard.bins, 5);
    }

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("off"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn set_toml_value_types_against_existing_value() {
        let mut root = toml::Value::try_from(CustpulseConfig::default()).unwrap();
        set_toml_value(&mut root, "dashboard.bins", "8").unwrap();
        set_toml_value(&mut root, "dashboard.high_churn_threshold", "70.5").unwrap();
        set_toml_value(&mut root, "logging.enabled", "no").unwrap();
        set_toml_value(&mut root, "analysis.model", "gemini-2.5-pro").unwrap();

        let config: CustpulseConfig = root.try_into().unwrap();
        assert_eq!(config.dashboard.bins, 8);
        assert_eq!(config.dashboard.high_churn_threshold, 70.5);
        assert!(!config.logging.enabled);
        assert_eq!(config.analysis.model, "gemini-2.5-pro");
    }

    #[test]
    fn set_toml_value_rejects_bad_keys_and_values() {
        let mut root = toml::Value::try_from(CustpulseConfig::default()).unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "1").is_err());
        assert!(set_toml_value(&mut root, "dashboard.unknown", "1").is_err());
        assert!(set_toml_value(&mut root, "dashboard.bins", "many").is_err());
        assert!(set_toml_value(&mut root, "bins", "3").is_err());
    }

    #[test]
    fn show_effective_config_round_trips() {
        let text = show_effective_config().unwrap();
        let _: CustpulseConfig = toml::from_str(&text).unwrap();
    }
}
