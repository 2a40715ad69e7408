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

//! Engine configuration, stored as TOML (`~/.etp.toml` by default).
//!
//! Every section has defaults, so a partial file (or none at all) is valid.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    extract::OperatorMasking,
    interp::{ExecutionLimits, DEFAULT_MAX_CALL_DEPTH},
    mutation::HarnessPolicy,
    tracer::LineTracer,
    ConfigError,
};

/// Name of the configuration file in the home directory
pub const CONFIG_FILE_NAME: &str = ".etp.toml";

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tracer resource bounds and prelude
    pub tracer: TracerConfig,
    /// Which operator families may be masked
    pub masking: OperatorMasking,
    /// How inconclusive mutation variants are judged
    pub policy: HarnessPolicy,
    /// Random sampling
    pub sampling: SamplingConfig,
    /// Alternative operators tried by the mutation harness
    pub replacements: ReplacementConfig,
    /// `operator` pipeline settings
    pub operator: OperatorPipelineConfig,
    /// `stepped-input` pipeline settings
    pub stepped_input: SteppedInputConfig,
    /// `stepped-operator` pipeline settings
    pub stepped_operator: SteppedOperatorConfig,
}

/// Tracer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Abort a run after this many line events
    pub max_line_events: Option<u64>,
    /// Maximum nesting of function calls
    pub max_call_depth: usize,
    /// Source executed before every snippet; its line events are not counted
    /// and its globals are not reported
    pub prelude: Option<String>,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self { max_line_events: None, max_call_depth: DEFAULT_MAX_CALL_DEPTH, prelude: None }
    }
}

/// Sampling configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Seed for reproducible sampling; unseeded runs draw from entropy
    pub seed: Option<u64>,
}

/// Built-in replacement tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementPreset {
    /// `<` and `>` swap, `+` and `-` swap
    #[default]
    Default,
    /// Arithmetic operators also try `*` and `/`
    Extended,
}

impl ReplacementPreset {
    /// Replacement table of the preset
    pub fn table(self) -> HashMap<char, Vec<char>> {
        let mut table = HashMap::from([
            ('<', vec!['>']),
            ('>', vec!['<']),
            ('+', vec!['-']),
            ('-', vec!['+']),
        ]);
        if self == Self::Extended {
            table.insert('+', vec!['-', '*', '/']);
            table.insert('-', vec!['+', '*', '/']);
            table.insert('*', vec!['+', '-', '/']);
            table.insert('/', vec!['+', '-', '*']);
        }
        table
    }
}

/// Replacement table configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplacementConfig {
    /// Base table
    pub preset: ReplacementPreset,
    /// Per-symbol overrides of the base table; an empty list disables the
    /// symbol
    pub overrides: BTreeMap<String, Vec<String>>,
}

/// `operator` pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorPipelineConfig {
    /// Randomly keep at most this many candidates per snippet (0 keeps all)
    pub candidate_limit: usize,
}

/// `stepped-input` pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteppedInputConfig {
    /// Randomly keep at most this many literals per snippet (0 keeps all)
    pub literal_limit: usize,
    /// Randomly keep at most this many steps per literal (0 keeps all)
    pub step_limit: usize,
    /// Only emit literals whose value is recoverable from the snapshot
    pub verify_literals: bool,
}

impl Default for SteppedInputConfig {
    fn default() -> Self {
        Self { literal_limit: 3, step_limit: 10, verify_literals: false }
    }
}

/// `stepped-operator` pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteppedOperatorConfig {
    /// Randomly keep at most this many steps per snippet (0 keeps all)
    pub step_limit: usize,
    /// Randomly keep at most this many candidates per step (0 keeps all)
    pub candidate_limit: usize,
}

impl Default for SteppedOperatorConfig {
    fn default() -> Self {
        Self { step_limit: 3, candidate_limit: 0 }
    }
}

impl EngineConfig {
    /// Default configuration file path (`~/.etp.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Render the configuration as TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load the configuration at `path`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load the configuration at `path`, falling back to defaults when the
    /// file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config file {:?} not found, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Write the configuration to `path`
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml_string()?;
        fs::write(path, content)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        debug!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Resource bounds for the tracer
    pub fn limits(&self) -> ExecutionLimits {
        ExecutionLimits {
            max_line_events: self.tracer.max_line_events,
            max_call_depth: self.tracer.max_call_depth,
        }
    }

    /// Build the tracer described by the `[tracer]` section
    pub fn tracer(&self) -> Result<LineTracer, ConfigError> {
        LineTracer::new(self.tracer.prelude.clone(), self.limits())
    }

    /// The preset table with overrides applied
    pub fn replacement_table(&self) -> Result<HashMap<char, Vec<char>>, ConfigError> {
        let mut table = self.replacements.preset.table();
        for (symbol, alternatives) in &self.replacements.overrides {
            let symbol = single_char(symbol)?;
            let alternatives =
                alternatives.iter().map(|entry| single_char(entry)).collect::<Result<Vec<_>, _>>()?;
            table.insert(symbol, alternatives);
        }
        Ok(table)
    }
}

fn single_char(entry: &str) -> Result<char, ConfigError> {
    let mut chars = entry.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConfigError::InvalidReplacement { entry: entry.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
[sampling]
seed = 7

[stepped_input]
step_limit = 2
"#,
        )
        .unwrap();
        assert_eq!(config.sampling.seed, Some(7));
        assert_eq!(config.stepped_input.step_limit, 2);
        assert_eq!(config.stepped_input.literal_limit, 3);
        assert_eq!(config.tracer.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
        assert!(config.masking.arithmetic);
        assert!(!config.masking.comparison);
        assert!(config.policy.errors_are_ambiguous);
    }

    #[test]
    fn test_replacement_tables() {
        let table = EngineConfig::default().replacement_table().unwrap();
        assert_eq!(table[&'+'], vec!['-']);
        assert_eq!(table[&'<'], vec!['>']);
        assert!(!table.contains_key(&'*'));

        let mut config = EngineConfig::default();
        config.replacements.preset = ReplacementPreset::Extended;
        config.replacements.overrides.insert("<".to_string(), vec![]);
        let table = config.replacement_table().unwrap();
        assert_eq!(table[&'+'], vec!['-', '*', '/']);
        assert!(table[&'<'].is_empty());

        config.replacements.overrides.insert("<=".to_string(), vec![">".to_string()]);
        assert!(matches!(
            config.replacement_table(),
            Err(ConfigError::InvalidReplacement { entry }) if entry == "<="
        ));
    }

    #[test]
    fn test_preset_names() {
        let config = EngineConfig::from_toml_str("[replacements]\npreset = \"extended\"\n").unwrap();
        assert_eq!(config.replacements.preset, ReplacementPreset::Extended);
        assert!(EngineConfig::from_toml_str("[replacements]\npreset = \"bogus\"\n").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = EngineConfig::default();
        config.tracer.max_line_events = Some(10_000);
        config.tracer.prelude = Some("offset = 3\n".to_string());
        config.operator.candidate_limit = 4;
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.tracer().unwrap().limits().max_line_events, Some(10_000));

        let missing = dir.path().join("missing.toml");
        assert_eq!(EngineConfig::load_or_default(&missing).unwrap(), EngineConfig::default());
        assert!(matches!(EngineConfig::load(&missing), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_invalid_prelude() {
        let mut config = EngineConfig::default();
        config.tracer.prelude = Some("x = (1\n".to_string());
        assert!(matches!(config.tracer(), Err(ConfigError::Prelude(_))));
    }
}
