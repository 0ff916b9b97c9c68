pub mod bench;
pub mod run;

use std::path::Path;

use pareval_rt::SweepConfig;

use crate::error::CliError;

/// The sweep file if one was given, otherwise the built-in defaults.
fn load_sweep(path: Option<&Path>) -> Result<SweepConfig, CliError> {
    match path {
        Some(path) => {
            log::debug!("Reading sweep config from {}", path.display());
            Ok(SweepConfig::from_file(path)?)
        }
        None => Ok(SweepConfig::default()),
    }
}
