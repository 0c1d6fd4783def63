//! Write a configuration file.

use std::path::{Path, PathBuf};

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{InitOutput, OutputFormat, Render};

/// Execute the init command.
///
/// Saves `config` (already carrying any `--server`/`--network` overrides)
/// to `path`, refusing to overwrite unless `force` is set.
pub fn init(
    mut config: CliConfig,
    format: OutputFormat,
    path: &Path,
    force: bool,
    keypair: Option<PathBuf>,
) -> CliResult<String> {
    if path.exists() && !force {
        return Err(CliError::ConfigExists(path.display().to_string()));
    }

    if keypair.is_some() {
        config.wallet.keypair = keypair;
    }
    config.cedros.validate()?;
    config.save(path)?;

    let output = InitOutput {
        config_path: path.display().to_string(),
        server_url: config.cedros.server_url.clone(),
        network: config.cedros.network.to_string(),
    };
    Ok(output.render(format))
}
