//! Loads `portfmt.toml` and merges it with CLI overrides into a
//! [`portfmt_core::Settings`].
//!
//! Grounded on the teacher's `Manifest::load`/`to_toml` pattern: a plain
//! `serde`-derived record, parsed with `toml::from_str`, found by walking
//! up from the current directory.

use std::fs;
use std::path::{Path, PathBuf};

use portfmt_core::{Behavior, Settings};
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "portfmt.toml";

/// The on-disk shape of `portfmt.toml`. Every field is optional so a
/// project can override only what it cares about; anything absent falls
/// back to [`Settings::default`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub wrapcol: Option<usize>,
    #[serde(default)]
    pub target_command_format_wrapcol: Option<usize>,
    #[serde(default)]
    pub target_command_format_threshold: Option<usize>,
    #[serde(default)]
    pub diff_context: Option<usize>,
    #[serde(default)]
    pub unsorted_variables: Option<bool>,
    #[serde(default)]
    pub always_sort_variables: Option<bool>,
    #[serde(default)]
    pub keep_eol_comments: Option<bool>,
    #[serde(default)]
    pub format_target_commands: Option<bool>,
}

impl FileConfig {
    /// Loads `portfmt.toml` from `dir`, walking up through parent
    /// directories until found. Returns the default (empty) config if no
    /// such file exists anywhere above `dir`.
    pub fn load_from(dir: &Path) -> Result<FileConfig, String> {
        let mut current = Some(dir);
        while let Some(d) = current {
            let path = d.join(CONFIG_FILE_NAME);
            if path.exists() {
                let content = fs::read_to_string(&path)
                    .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
                return toml::from_str(&content).map_err(|e| format!("failed to parse {}: {e}", path.display()));
            }
            current = d.parent();
        }
        Ok(FileConfig::default())
    }

    /// Merges this file config into `settings`, overwriting any field the
    /// file specifies.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(v) = self.wrapcol {
            settings.wrapcol = v;
        }
        if let Some(v) = self.target_command_format_wrapcol {
            settings.target_command_format_wrapcol = v;
        }
        if let Some(v) = self.target_command_format_threshold {
            settings.target_command_format_threshold = v;
        }
        if let Some(v) = self.diff_context {
            settings.diff_context = v;
        }
        if let Some(v) = self.unsorted_variables {
            settings.behavior.unsorted_variables = v;
        }
        if let Some(v) = self.always_sort_variables {
            settings.behavior.always_sort_variables = v;
        }
        if let Some(v) = self.keep_eol_comments {
            settings.behavior.keep_eol_comments = v;
        }
        if let Some(v) = self.format_target_commands {
            settings.behavior.format_target_commands = v;
        }
    }
}

/// Builds the effective [`Settings`] for a run: defaults, then
/// `portfmt.toml` (if found above `cwd`), then explicit CLI overrides.
#[allow(clippy::too_many_arguments)]
pub fn resolve_settings(
    cwd: &Path,
    wrapcol: Option<usize>,
    diff_context: Option<usize>,
    filename: Option<String>,
    unsorted_variables: bool,
    keep_eol_comments: bool,
    no_color: bool,
) -> Result<Settings, String> {
    let mut settings = Settings::default();
    FileConfig::load_from(cwd)?.apply(&mut settings);

    if let Some(v) = wrapcol {
        settings.wrapcol = v;
    }
    if let Some(v) = diff_context {
        settings.diff_context = v;
    }
    if let Some(name) = filename {
        settings.filename = name;
    }
    if unsorted_variables {
        settings.behavior.unsorted_variables = true;
    }
    if keep_eol_comments {
        settings.behavior.keep_eol_comments = true;
    }
    if no_color {
        settings.behavior.output_no_color = true;
    }
    Ok(settings)
}

pub fn default_config_search_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[allow(dead_code)]
pub fn behavior_from_file(cfg: &FileConfig) -> Behavior {
    let mut settings = Settings::default();
    cfg.apply(&mut settings);
    settings.behavior
}
