// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use storyline_app::PaneKind;

const CONFIG_VERSION: i64 = 1;
pub const APP_NAME: &str = "storyline";
pub const CONFIG_PATH_ENV: &str = "STORYLINE_CONFIG_PATH";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const LOG_FILE_NAME: &str = "storyline.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub files: Files,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            files: Files::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Files {
    pub export_path: Option<String>,
    pub import_path: Option<String>,
    pub standards_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub start_pane: Option<String>,
    pub show_story_json: Option<bool>,
    pub show_timeline_json: Option<bool>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            start_pane: Some(PaneKind::Timeline.label().to_owned()),
            show_story_json: Some(false),
            show_timeline_json: Some(false),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and put values under [files], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        for (key, value) in [
            ("files.export_path", &self.files.export_path),
            ("files.import_path", &self.files.import_path),
        ] {
            if let Some(value) = value {
                storyline_files::validate_document_path(value)
                    .with_context(|| format!("{key} in {}", path.display()))?;
            }
        }
        for (key, what, value) in [
            ("files.standards_dir", "standards directory", &self.files.standards_dir),
            ("log.file", "log file", &self.log.file),
        ] {
            if let Some(value) = value {
                storyline_files::validate_local_path(what, value)
                    .with_context(|| format!("{key} in {}", path.display()))?;
            }
        }

        if let Some(pane) = &self.ui.start_pane
            && PaneKind::parse(pane).is_none()
        {
            bail!(
                "ui.start_pane in {} must be \"story\" or \"timeline\", got {pane:?}",
                path.display()
            );
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            bail!(
                "log.level in {} must be one of {}, got {level:?}",
                path.display(),
                LOG_LEVELS.join(", ")
            );
        }

        Ok(())
    }

    pub fn export_path(&self) -> Result<PathBuf> {
        match &self.files.export_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => storyline_files::default_export_path(),
        }
    }

    pub fn import_path(&self) -> Option<PathBuf> {
        self.files.import_path.as_ref().map(PathBuf::from)
    }

    pub fn standards_dir(&self) -> Option<PathBuf> {
        self.files.standards_dir.as_ref().map(PathBuf::from)
    }

    pub fn start_pane(&self) -> PaneKind {
        self.ui
            .start_pane
            .as_deref()
            .and_then(PaneKind::parse)
            .unwrap_or(PaneKind::Timeline)
    }

    pub fn show_story_json(&self) -> bool {
        self.ui.show_story_json.unwrap_or(false)
    }

    pub fn show_timeline_json(&self) -> bool {
        self.ui.show_timeline_json.unwrap_or(false)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.file {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve a data directory; set log.file in the config")
        })?;
        Ok(data_root.join(APP_NAME).join(LOG_FILE_NAME))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# storyline config\n# Place this file at: {}\n\nversion = 1\n\n[files]\n# Optional. Default is <documents dir>/{} (or {})\n# export_path = \"/absolute/path/to/{}\"\n# import_path = \"/absolute/path/to/patient.json\"\n# standards_dir = \"/absolute/path/to/standards\"\n\n[ui]\nstart_pane = \"timeline\"\nshow_story_json = false\nshow_timeline_json = false\n\n[log]\n# STORYLINE_LOG overrides this level\nlevel = \"{}\"\n# file = \"/absolute/path/to/{}\"\n",
            path.display(),
            storyline_files::EXPORT_FILE_NAME,
            storyline_files::EXPORT_PATH_ENV,
            storyline_files::EXPORT_FILE_NAME,
            DEFAULT_LOG_LEVEL,
            LOG_FILE_NAME,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{CONFIG_PATH_ENV, Config};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use storyline_app::PaneKind;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.start_pane(), PaneKind::Timeline);
        assert!(!config.show_story_json());
        assert_eq!(config.log_level(), "info");
        assert_eq!(config.import_path(), None);
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[ui]\nstart_pane = \"story\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[files], [ui], and [log]"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[files]\nexport_path = \"/tmp/out.json\"\nimport_path = \"/tmp/in.json\"\nstandards_dir = \"/tmp/standards\"\n[ui]\nstart_pane = \"story\"\nshow_timeline_json = true\n[log]\nlevel = \"debug\"\nfile = \"/tmp/storyline.log\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.export_path()?, PathBuf::from("/tmp/out.json"));
        assert_eq!(config.import_path(), Some(PathBuf::from("/tmp/in.json")));
        assert_eq!(config.standards_dir(), Some(PathBuf::from("/tmp/standards")));
        assert_eq!(config.start_pane(), PaneKind::Story);
        assert!(config.show_timeline_json());
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.log_file()?, PathBuf::from("/tmp/storyline.log"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn invalid_start_pane_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nstart_pane = \"dashboard\"\n")?;
        let error = Config::load(&path).expect_err("unknown pane should fail");
        assert!(error.to_string().contains("ui.start_pane"));
        Ok(())
    }

    #[test]
    fn invalid_log_level_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[log]\nlevel = \"loud\"\n")?;
        let error = Config::load(&path).expect_err("unknown level should fail");
        assert!(error.to_string().contains("log.level"));
        Ok(())
    }

    #[test]
    fn uri_shaped_paths_are_rejected() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[files]\nexport_path = \"https://example.com/out.json\"\n")?;
        let error = Config::load(&path).expect_err("URI export path should fail");
        let message = format!("{error:#}");
        assert!(message.contains("files.export_path"));
        assert!(message.contains("looks like a URI"));
        Ok(())
    }

    #[test]
    fn standards_dir_may_end_with_a_separator() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[files]\nstandards_dir = \"/srv/standards/\"\n")?;
        assert!(Config::load(&path).is_ok());
        Ok(())
    }

    #[test]
    fn uri_log_file_is_rejected_as_a_log_path() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[log]\nfile = \"s3://logs/app.log\"\n")?;
        let error = Config::load(&path).expect_err("URI log file should fail");
        let message = format!("{error:#}");
        assert!(message.contains("log.file"));
        assert!(message.contains("log file path"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, &override_path);
        }
        let resolved = Config::default_path();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        assert_eq!(resolved?, override_path);
        Ok(())
    }

    #[test]
    fn export_path_falls_back_to_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(storyline_files::EXPORT_PATH_ENV, "/from/env/out.json");
        }
        let config = Config::load(&path)?;
        let resolved = config.export_path();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(storyline_files::EXPORT_PATH_ENV);
        }
        assert_eq!(resolved?, PathBuf::from("/from/env/out.json"));
        Ok(())
    }

    #[test]
    fn log_file_defaults_under_data_dir() -> Result<()> {
        let config = Config::default();
        let path = config.log_file()?;
        assert!(path.ends_with("storyline/storyline.log"), "got {}", path.display());
        Ok(())
    }

    #[test]
    fn example_config_includes_required_sections() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[files]"));
        assert!(example.contains("[ui]"));
        assert!(example.contains("[log]"));

        let written = temp.path().join("example.toml");
        std::fs::write(&written, &example)?;
        let parsed = Config::load(&written)?;
        assert_eq!(parsed.start_pane(), PaneKind::Timeline);
        Ok(())
    }
}
