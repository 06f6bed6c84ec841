//! Lookups the host tool provides to the plugin.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Build variable holding the deploy directory.
pub const DEPLOY_DIR_IMAGE: &str = "DEPLOY_DIR_IMAGE";
/// Build variable holding the target architecture.
pub const DISTRO_ARCH: &str = "DISTRO_ARCH";

/// Resolves build variables by name.
pub trait VarLookup {
    fn var(&self, name: &str) -> Option<String>;
}

/// Resolves a custom loader configuration file to its content.
pub trait ConfigLookup {
    fn load(&self, name: &str) -> Option<String>;
}

impl VarLookup for BTreeMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Explicit variables first, then the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvVars {
    overrides: BTreeMap<String, String>,
}

impl EnvVars {
    pub fn new(overrides: BTreeMap<String, String>) -> Self {
        Self { overrides }
    }
}

impl VarLookup for EnvVars {
    fn var(&self, name: &str) -> Option<String> {
        self.overrides
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
            .filter(|v| !v.is_empty())
    }
}

/// Looks a config name up in each search directory, then as given.
#[derive(Debug, Clone, Default)]
pub struct SearchPathConfigs {
    search_path: Vec<PathBuf>,
}

impl SearchPathConfigs {
    pub fn new(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    pub fn push(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        self.search_path.push(dir.into());
        self
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        self.search_path
            .iter()
            .map(|dir| dir.join(name))
            .find(|p| p.is_file())
            .or_else(|| Some(PathBuf::from(name)).filter(|p| p.is_file()))
    }
}

impl ConfigLookup for SearchPathConfigs {
    fn load(&self, name: &str) -> Option<String> {
        let path = self.resolve(name)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!("Custom config {} found at {}", name, path.display());
                Some(content)
            }
            Err(e) => {
                warn!("Failed to read custom config {}: {e}", path.display());
                None
            }
        }
    }
}
