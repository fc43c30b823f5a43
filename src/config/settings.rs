use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Json, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Embed the default settings at compile time
const DEFAULT_SETTINGS: &str = include_str!("../../default-settings.toml");

/// Application settings, as opposed to a repository's project configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Directories searched for templates, in order.
    #[serde(default)]
    pub template_dirs: Vec<PathBuf>,

    /// Validate the project configuration before running.
    #[serde(default = "default_validate")]
    pub validate: bool,
}

fn default_validate() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            template_dirs: Vec::new(),
            validate: default_validate(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_with_custom_config(None)
    }

    pub fn load_with_custom_config(custom_config: Option<&Path>) -> Result<Self> {
        Self::figment(custom_config)
            .extract()
            .context("Failed to load hookwarden settings")
    }

    /// The layered provider chain; later layers win.
    pub fn figment(custom_config: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_SETTINGS));

        // A custom file replaces the user and repository layers
        if let Some(custom_path) = custom_config {
            figment = match custom_path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => figment.merge(Json::file(custom_path)),
                _ => figment.merge(Toml::file(custom_path)),
            };
        } else {
            let user_config = Self::user_config_path();
            figment = figment
                .merge(Toml::file(&user_config))
                .merge(Json::file(user_config.with_extension("json")))
                .merge(Toml::file(".hookwarden.toml"))
                .merge(Json::file(".hookwarden.json"));
        }

        // Environment variables always have highest priority
        figment.merge(Env::prefixed("HOOKWARDEN_"))
    }

    fn user_config_path() -> PathBuf {
        match std::env::var("HOME") {
            Ok(home) => PathBuf::from(home).join(".config/hookwarden/config.toml"),
            Err(_) => PathBuf::from("~/.config/hookwarden/config.toml"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_embedded_defaults() {
        Jail::expect_with(|jail| {
            let home = jail.directory().display().to_string();
            jail.set_env("HOME", home);
            let settings: Settings = Settings::figment(None).extract()?;
            assert_eq!(settings, Settings::default());
            Ok(())
        });
    }

    #[test]
    fn test_repository_file_and_env_layers() {
        Jail::expect_with(|jail| {
            let home = jail.directory().display().to_string();
            jail.set_env("HOME", home);
            jail.create_file(
                ".hookwarden.toml",
                r#"
template_dirs = ["/opt/hookwarden/templates"]
validate = true
"#,
            )?;
            jail.set_env("HOOKWARDEN_VALIDATE", "false");

            let settings: Settings = Settings::figment(None).extract()?;
            assert_eq!(
                settings.template_dirs,
                vec![PathBuf::from("/opt/hookwarden/templates")]
            );
            assert!(!settings.validate);
            Ok(())
        });
    }

    #[test]
    fn test_custom_file_replaces_repository_file() {
        Jail::expect_with(|jail| {
            let home = jail.directory().display().to_string();
            jail.set_env("HOME", home);
            jail.create_file(".hookwarden.toml", "template_dirs = [\"/repo\"]")?;
            jail.create_file("custom.json", r#"{ "template_dirs": ["/custom"] }"#)?;

            let settings: Settings =
                Settings::figment(Some(Path::new("custom.json"))).extract()?;
            assert_eq!(settings.template_dirs, vec![PathBuf::from("/custom")]);
            Ok(())
        });
    }

    #[test]
    fn test_missing_custom_file_falls_back_to_defaults() {
        let settings = Settings::load_with_custom_config(Some(Path::new("non_existent.toml")));
        assert!(settings.is_ok(), "Should handle missing custom config gracefully");
    }
}
