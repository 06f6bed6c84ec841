use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use crate::bootimg::config::Settings;
use crate::bootimg::host::{DEPLOY_DIR_IMAGE, DISTRO_ARCH};

pub const CONFIG_FILE: &str = ".bootimg-efi.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<Settings>,
    /// Build variables, consulted before the process environment
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn generate_config_file(force: bool) -> anyhow::Result<()> {
        use std::io::Write;

        // Check if file already exists
        if std::path::Path::new(CONFIG_FILE).exists() && !force {
            anyhow::bail!(
                "Configuration file {} already exists. Use --force to overwrite.",
                CONFIG_FILE
            );
        }

        let config_content = Self::generate_full_config()?;

        let mut file = fs::File::create(CONFIG_FILE)?;
        file.write_all(config_content.as_bytes())?;

        info!("Configuration file generated: {}", CONFIG_FILE);
        info!("Please edit this file to customize configuration");
        Ok(())
    }

    pub fn generate_full_config() -> anyhow::Result<String> {
        let mut vars = BTreeMap::new();
        vars.insert(DEPLOY_DIR_IMAGE.to_string(), "/path/to/deploy/images".to_string());
        vars.insert(DISTRO_ARCH.to_string(), "amd64".to_string());
        let config = AppConfig {
            plugin: Some(Settings::default()),
            vars,
        };
        let toml_content = toml::to_string_pretty(&config)?;
        Ok(format!(
            "# bootimg-efi configuration file\n# All fields are optional, [vars] override environment variables\n\n{}",
            toml_content
        ))
    }
}
