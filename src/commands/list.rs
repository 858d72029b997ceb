// `setup-ide list`: prints every registered tool, where it would be installed and
// whether it already is.

use crate::installers::{self, ToolDefinition};
use crate::libs::config_loading::load_app_config;
use crate::libs::paths::{resolve_config_path, tool_install_path};
use crate::log_error;
use crate::schemas::config::AppConfig;
use anyhow::Result;
use prettytable::{Table, row};

fn build_table(tools: &[ToolDefinition], config: &AppConfig) -> Table {
    let mut table = Table::new();
    table.set_titles(row!["Id", "Name", "Description", "Arch", "Path", "Installed"]);
    for tool in tools {
        let spec = &tool.spec;
        let path = tool_install_path(spec, config, None);
        let arches = spec
            .only_on_archs
            .iter()
            .map(|arch| arch.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let installed = if spec.is_installed_at(&path) {
            spec.detect_version(&path).unwrap_or_else(|| "yes".to_string())
        } else {
            "no".to_string()
        };
        table.add_row(row![spec.id, spec.name, spec.description, arches, path.display(), installed]);
    }
    table
}

fn list(config: Option<&str>) -> Result<()> {
    let config = load_app_config(&resolve_config_path(config))?;
    build_table(&installers::registry(), &config).printstd();
    Ok(())
}

pub fn run(config: Option<&str>) {
    if let Err(e) = list(config) {
        log_error!("{:#}", e);
        std::process::exit(1);
    }
}
