use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_addr: String,
    pub font: FontSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSettings {
    pub family: String,
    pub fallback_families: Vec<String>,
    pub path: Option<String>,
    pub heading_size: f32,
    pub body_size: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8001".to_string(),
            font: FontSettings::default(),
        }
    }
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            family: "Arial".to_string(),
            fallback_families: Vec::new(),
            path: None,
            heading_size: 36.0,
            body_size: 24.0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSection>,
    font: Option<FontSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    addr: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSection {
    family: Option<String>,
    fallback_families: Option<Vec<String>>,
    path: Option<String>,
    heading_size: Option<f32>,
    body_size: Option<f32>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    load_settings_from(&ordered_paths)
}

/// Starts from the embedded defaults and merges every existing file in order.
pub fn load_settings_from(paths: &[PathBuf]) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);

    for path in paths {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr {
                if !addr.trim().is_empty() {
                    self.server_addr = addr.trim().to_string();
                }
            }
        }
        if let Some(font) = incoming.font {
            if let Some(family) = font.family {
                if !family.trim().is_empty() {
                    self.font.family = family;
                }
            }
            if let Some(families) = font.fallback_families {
                self.font.fallback_families = families
                    .into_iter()
                    .filter(|family| !family.trim().is_empty())
                    .collect();
            }
            if let Some(path) = font.path {
                if !path.trim().is_empty() {
                    self.font.path = Some(path);
                }
            }
            if let Some(size) = font.heading_size {
                if size.is_finite() && size > 0.0 {
                    self.font.heading_size = size;
                }
            }
            if let Some(size) = font.body_size {
                if size.is_finite() && size > 0.0 {
                    self.font.body_size = size;
                }
            }
        }
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".visual-memory"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_apply_without_files() {
        let settings = load_settings_from(&[]).expect("settings");
        assert_eq!(settings.server_addr, "127.0.0.1:8001");
        assert_eq!(settings.font.family, "Arial");
        assert_eq!(settings.font.heading_size, 36.0);
        assert_eq!(settings.font.body_size, 24.0);
        assert!(settings.font.path.is_none());
        assert!(
            settings
                .font
                .fallback_families
                .iter()
                .any(|family| family == "sans-serif")
        );
    }

    #[test]
    fn later_files_override_earlier_ones() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        fs::write(
            &first,
            "[server]\naddr = \"0.0.0.0:9000\"\n[font]\nfamily = \"Helvetica\"\nbody_size = 20.0\n",
        )
        .expect("write first");
        fs::write(&second, "[font]\nfamily = \"Verdana\"\n").expect("write second");
        let missing = dir.path().join("missing.toml");

        let settings = load_settings_from(&[first, missing, second]).expect("settings");
        assert_eq!(settings.server_addr, "0.0.0.0:9000");
        assert_eq!(settings.font.family, "Verdana");
        assert_eq!(settings.font.body_size, 20.0);
        assert_eq!(settings.font.heading_size, 36.0);
    }

    #[test]
    fn invalid_values_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "[server]\naddr = \"  \"\n[font]\nfamily = \"\"\npath = \" \"\nheading_size = 0.0\nbody_size = -3.0\nfallback_families = [\"\", \"Noto Sans\"]\n",
        )
        .expect("write");

        let settings = load_settings_from(&[path]).expect("settings");
        assert_eq!(settings.server_addr, "127.0.0.1:8001");
        assert_eq!(settings.font.family, "Arial");
        assert!(settings.font.path.is_none());
        assert_eq!(settings.font.heading_size, 36.0);
        assert_eq!(settings.font.body_size, 24.0);
        assert_eq!(settings.font.fallback_families, vec!["Noto Sans".to_string()]);
    }

    #[test]
    fn non_finite_sizes_are_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[font]\nheading_size = inf\nbody_size = nan\n").expect("write");

        let settings = load_settings_from(&[path]).expect("settings");
        assert_eq!(settings.font.heading_size, 36.0);
        assert_eq!(settings.font.body_size, 24.0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[font\nfamily = ").expect("write");
        let err = load_settings_from(&[path]).expect_err("parse error");
        assert!(err.to_string().contains("failed to parse settings"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = load_settings(Some(Path::new("/nonexistent/visual-memory.toml")))
            .expect_err("missing file");
        assert!(err.to_string().contains("settings file not found"));
    }
}
