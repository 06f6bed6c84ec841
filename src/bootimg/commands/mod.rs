use anyhow::Result;
use std::collections::BTreeMap;

use super::cli::BootAction;
use super::config::Settings;
use super::exec::SystemRunner;
use super::host::{EnvVars, SearchPathConfigs};
use super::plugin::BootimgEfi;

mod configure;
pub mod layout;
mod ls;
mod prepare;

pub use layout::Layout;

pub fn run(action: BootAction, settings: &Settings, vars: &BTreeMap<String, String>) -> Result<()> {
    match action {
        BootAction::Configure { part } => {
            let layout = Layout::load(&part)?;
            with_plugin(settings, vars, &layout, |plugin| {
                configure::configure(plugin, &layout)
            })
        }
        BootAction::Prepare { part, dirs } => {
            let layout = Layout::load(&part)?;
            with_plugin(settings, vars, &layout, |plugin| {
                prepare::prepare(plugin, &layout, &dirs)
            })
        }
        BootAction::Build { part, dirs } => {
            let layout = Layout::load(&part)?;
            with_plugin(settings, vars, &layout, |plugin| {
                configure::configure(plugin, &layout)?;
                prepare::prepare(plugin, &layout, &dirs)
            })
        }
        BootAction::Ls { image, path } => ls::ls(&image, &path),
    }
}

/// Runs `f` with the plugin wired to the host: build variables from
/// the config file and environment, configfiles from the search path
/// and the layout directory, tools run on this machine.
pub fn with_plugin<R>(
    settings: &Settings,
    vars: &BTreeMap<String, String>,
    layout: &Layout,
    f: impl FnOnce(&BootimgEfi<'_>) -> Result<R>,
) -> Result<R> {
    let vars = EnvVars::new(vars.clone());
    let mut configs = SearchPathConfigs::new(settings.config_search_path.clone());
    configs.push(&layout.base_dir);
    let runner = SystemRunner;
    let plugin = BootimgEfi::new(settings, &vars, &configs, &runner);
    f(&plugin)
}
