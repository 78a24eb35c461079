/// Integration tests for configuration layering.
///
/// # Safety
///
/// The env-var test uses `std::env::set_var` / `remove_var`, which are
/// `unsafe` in Rust 2024 edition. All env mutations live in a single
/// `#[test]` so no other test in this binary observes them mid-change.
use std::fs;
use std::path::PathBuf;

use custpulse::config::{self, API_KEY_VARS};
use custpulse::llm::InferenceService;
use custpulse::llm::gemini::GeminiClient;

/// Helper: set an env var (wraps the `unsafe` call).
///
/// # Safety
/// Must only be called from single-threaded test contexts.
unsafe fn set_env(key: &str, val: &str) {
    unsafe { std::env::set_var(key, val) }
}

/// Helper: remove an env var (wraps the `unsafe` call).
///
/// # Safety
/// Must only be called from single-threaded test contexts.
unsafe fn remove_env(key: &str) {
    unsafe { std::env::remove_var(key) }
}

fn temp_file(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("custpulse-it-config-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn env_vars_override_files_and_defaults() {
    for var in API_KEY_VARS {
        unsafe { remove_env(var) };
    }

    // --- fallback order: the first non-empty variable wins ---
    unsafe { set_env("CUSTPULSE_API_KEY", "  ") };
    unsafe { set_env("GEMINI_API_KEY", "gemini-key") };
    unsafe { set_env("API_KEY", "generic-key") };
    let cfg = config::load();
    assert_eq!(cfg.analysis.api_key(), Some("gemini-key"));

    unsafe { set_env("CUSTPULSE_API_KEY", "primary-key") };
    let cfg = config::load();
    assert_eq!(cfg.analysis.api_key(), Some("primary-key"));
    assert!(GeminiClient::from_config(&cfg.analysis).has_credential());

    // --- model / endpoint / timeout / logging ---
    unsafe { set_env("CUSTPULSE_MODEL", "gemini-test") };
    unsafe { set_env("CUSTPULSE_BASE_URL", "http://127.0.0.1:1") };
    unsafe { set_env("CUSTPULSE_TIMEOUT_MS", "1500") };
    unsafe { set_env("CUSTPULSE_LOGGING", "off") };
    let cfg = config::load();
    assert_eq!(cfg.analysis.model, "gemini-test");
    assert_eq!(cfg.analysis.base_url, "http://127.0.0.1:1");
    assert_eq!(cfg.analysis.timeout_ms, 1500);
    assert!(!cfg.logging.enabled);

    // --- unparseable timeout leaves the previous layer in place ---
    unsafe { set_env("CUSTPULSE_TIMEOUT_MS", "soon") };
    assert_ne!(config::load().analysis.timeout_ms, 1500);

    // --- the key never appears in the shown config ---
    let shown = config::show_effective_config().unwrap();
    assert!(!shown.contains("primary-key"));
    assert!(shown.contains("gemini-test"));

    for var in API_KEY_VARS {
        unsafe { remove_env(var) };
    }
    for var in [
        "CUSTPULSE_MODEL",
        "CUSTPULSE_BASE_URL",
        "CUSTPULSE_TIMEOUT_MS",
        "CUSTPULSE_LOGGING",
    ] {
        unsafe { remove_env(var) };
    }
}

#[test]
fn project_file_overrides_global_file_key_by_key() {
    let global = temp_file(
        "global.toml",
        "[dashboard]\nbins = 8\ntop_preferences = 3\n\n[analysis]\napi_key = \"file-key\"\n",
    );
    let project = temp_file("project.toml", "[dashboard]\nbins = 4\n");

    let cfg = config::load_files(&[Some(global), Some(project)]);
    assert_eq!(cfg.dashboard.bins, 4);
    assert_eq!(cfg.dashboard.top_preferences, 3);
    assert_eq!(cfg.dashboard.high_churn_threshold, 60.0);
    assert_eq!(cfg.analysis.api_key(), Some("file-key"));

    let options = cfg.dashboard.options();
    assert_eq!(options.bins, 4);
    assert_eq!(options.top_preferences, 3);
}

#[test]
fn malformed_file_is_skipped() {
    let broken = temp_file("broken.toml", "[dashboard\nbins = = 2\n");
    let cfg = config::load_files(&[Some(broken)]);
    assert_eq!(cfg.dashboard.bins, 5);
}

#[test]
fn wrongly_typed_file_does_not_discard_other_layers() {
    let global = temp_file(
        "typed-global.toml",
        "[analysis]\nmodel = \"global-model\"\n\n[dashboard]\ntop_preferences = 3\n",
    );
    let project = temp_file("typed-project.toml", "[dashboard]\nbins = \"five\"\n");

    let cfg = config::load_files(&[Some(global), Some(project)]);
    assert_eq!(cfg.analysis.model, "global-model");
    assert_eq!(cfg.dashboard.top_preferences, 3);
    assert_eq!(cfg.dashboard.bins, 5);
}
