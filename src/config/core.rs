use anyhow::Result;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
};
use serde::Serialize;

use super::Settings;

// Embed the default config at compile time
pub const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Layered configuration: defaults, user file, project file, custom file, env, CLI.
pub struct SweepConfig {
    figment: Figment,
}

impl SweepConfig {
    pub fn load() -> Result<Self> {
        Self::load_with(None, None::<()>)
    }

    pub fn load_with<T: Serialize>(custom_config: Option<&str>, cli_overrides: Option<T>) -> Result<Self> {
        tracing::trace!("config load: starting");

        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG)); // Embedded defaults

        let user_base = Self::user_config_base_path();
        figment = figment
            // User config - support multiple formats
            .merge(Toml::file(format!("{user_base}.toml")))
            .merge(Json::file(format!("{user_base}.json")))
            .merge(Yaml::file(format!("{user_base}.yaml")))
            .merge(Yaml::file(format!("{user_base}.yml")))
            // Project config - support multiple formats
            .merge(Toml::file("s1-sweep.toml"))
            .merge(Json::file("s1-sweep.json"))
            .merge(Yaml::file("s1-sweep.yaml"))
            .merge(Yaml::file("s1-sweep.yml"));

        if let Some(custom_path) = custom_config {
            tracing::debug!("config load: custom file {}", custom_path);
            figment = match custom_path.rsplit('.').next() {
                Some("json") => figment.merge(Json::file(custom_path)),
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(custom_path)),
                _ => figment.merge(Toml::file(custom_path)),
            };
        }

        // S1_API__TOKEN -> api.token
        figment = figment.merge(Env::prefixed("S1_").split("__"));

        if let Some(overrides) = cli_overrides {
            tracing::trace!("config load: applying CLI overrides");
            figment = figment.merge(Serialized::defaults(overrides));
        }

        Ok(SweepConfig { figment })
    }

    /// Extract the typed settings (not yet validated)
    pub fn settings(&self) -> Result<Settings> {
        Ok(self.figment.extract()?)
    }

    /// Get a nested object/section as JSON
    pub fn get_section(&self, path: &str) -> Result<serde_json::Value> {
        Ok(self.figment.extract_inner(path)?)
    }

    /// Get the full merged configuration as a structured value
    pub fn get_full_config(&self) -> Result<serde_json::Value> {
        Ok(self.figment.extract()?)
    }

    fn user_config_base_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{home}/.config/s1-sweep/config"),
            Err(_) => "~/.config/s1-sweep/config".to_string(),
        }
    }
}
