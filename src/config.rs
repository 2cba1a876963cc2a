// src/config.rs

//! Settings loading utilities.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Settings;
use crate::pipeline::Filter;

/// Load and validate settings from a file.
///
/// Unlike the store, settings have no usable fallback: a missing or
/// malformed file is an error.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Err(AppError::config(format!(
            "Settings file not found: {}",
            path.display()
        )));
    }
    let settings = Settings::load(path).map_err(|e| {
        AppError::config(format!("Settings file {} not valid: {}", path.display(), e))
    })?;
    settings.validate()?;
    log::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Compile the configured filter and fail on malformed regexes.
///
/// Runs never fail on a bad pattern; this is the strict check used by `validate`.
pub fn check_filter(settings: &Settings) -> Result<Option<Filter>> {
    let Some(spec) = settings.filter_spec()? else {
        return Ok(None);
    };
    let filter = Filter::compile(&spec, settings.on_type_mismatch);
    if let Some(bad) = filter.malformed_patterns().first() {
        return Err(AppError::validation(format!(
            "filter pattern {:?} at {} is not a valid regex: {}",
            bad.pattern, bad.path, bad.error
        )));
    }
    Ok(Some(filter))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_settings(tmp: &TempDir, filter: &str) -> std::path::PathBuf {
        let path = tmp.path().join("settings.toml");
        let content = format!(
            "storage = \"store.json\"\n[source]\npath = \"listings.json\"\n[filter]\n{}\n",
            filter
        );
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_missing_settings_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_settings(&tmp.path().join("nope.toml"));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_invalid_settings_is_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.toml");
        fs::write(&path, "storage = ").unwrap();
        assert!(matches!(load_settings(&path), Err(AppError::Config(_))));
    }

    #[test]
    fn test_check_filter_reports_bad_regex() {
        let tmp = TempDir::new().unwrap();
        let settings = load_settings(&write_settings(&tmp, "title = \"[Wohnung\"")).unwrap();
        assert!(matches!(check_filter(&settings), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_check_filter_accepts_good_filter() {
        let tmp = TempDir::new().unwrap();
        let settings = load_settings(&write_settings(&tmp, "title = \"^Wohnung\"")).unwrap();
        assert!(check_filter(&settings).unwrap().is_some());
    }
}
