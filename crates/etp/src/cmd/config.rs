// ETP - Execution Trace Prediction
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Config command and configuration file resolution

use std::path::{Path, PathBuf};

use etp_engine::EngineConfig;
use eyre::{bail, Result, WrapErr};
use tracing::info;

use crate::ConfigAction;

/// The configuration file to use: `explicit` when given, else `~/.etp.toml`
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => EngineConfig::default_path()
            .ok_or_else(|| eyre::eyre!("Unable to determine home directory")),
    }
}

/// Load the configuration at `path`. An explicitly requested file must exist;
/// a missing default file means default settings.
pub fn load(path: &Path, explicit: bool) -> Result<EngineConfig> {
    let config = if explicit {
        EngineConfig::load(path)
    } else {
        EngineConfig::load_or_default(path)
    };
    config.wrap_err_with(|| format!("Failed to load configuration from {}", path.display()))
}

/// Execute a `config` action
pub fn run(action: ConfigAction, path: &Path, explicit: bool) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load(path, explicit)?;
            print!("{}", config.to_toml_string()?);
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            EngineConfig::default().save(path)?;
            info!("Wrote default configuration to {}", path.display());
            println!("{}", path.display());
        }
    }
    Ok(())
}
