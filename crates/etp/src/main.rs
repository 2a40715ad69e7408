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

//! ETP - Execution Trace Prediction
//!
//! Turns a corpus of code snippets into training artifacts that ask a model to
//! predict facts about their execution: line counts, final variable values,
//! masked operators and masked inputs.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use etp_common::init_logging;
use etp_engine::{EngineConfig, PipelineKind, ReplacementPreset};
use eyre::Result;
use tracing::{debug, info};

mod cmd;

/// Command-line interface for ETP
#[derive(Debug, Parser)]
#[command(name = "etp")]
#[command(about = "Execution Trace Prediction - build execution-reasoning corpora from code snippets")]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: ~/.etp.toml)
    #[arg(long, global = true, env = "ETP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seed for reproducible sampling
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Worker threads (0 = one per core, 1 = sequential)
    #[arg(long, short = 'j', global = true, default_value = "0")]
    pub jobs: usize,

    /// Also write logs to a file
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Verbosity level (repeat for more: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Label each snippet with its executed line count
    LineCount(RunArgs),
    /// Label each snippet with its final variable values
    Output(RunArgs),
    /// Mask operators recoverable from the final variable values
    Operator(OperatorArgs),
    /// Mask numeric inputs and show a later execution snapshot
    SteppedInput(SteppedInputArgs),
    /// Mask operators recoverable from a mid-execution snapshot
    SteppedOperator(SteppedOperatorArgs),
    /// Inspect or create the configuration file
    Config {
        /// Config action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Input and output files shared by every pipeline
#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Corpus of snippets separated by blank lines
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the artifacts
    #[arg(short, long)]
    pub output: PathBuf,

    /// Write `<snippet index> <artifact count>` per snippet
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Write a JSON run summary
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

/// Options of the operator pipelines
#[derive(Debug, Clone, Args)]
pub struct MaskingArgs {
    /// Also try `*` and `/` as alternatives for arithmetic operators
    #[arg(long)]
    pub extended: bool,

    /// Also mask comparison operators
    #[arg(long)]
    pub comparisons: bool,
}

/// `operator` arguments
#[derive(Debug, Clone, Args)]
pub struct OperatorArgs {
    #[command(flatten)]
    #[allow(missing_docs)]
    pub run: RunArgs,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub masking: MaskingArgs,

    /// Randomly keep at most this many operators per snippet (0 = all)
    #[arg(long)]
    pub limit: Option<usize>,
}

/// `stepped-input` arguments
#[derive(Debug, Clone, Args)]
pub struct SteppedInputArgs {
    #[command(flatten)]
    #[allow(missing_docs)]
    pub run: RunArgs,

    /// Randomly keep at most this many literals per snippet (0 = all)
    #[arg(long)]
    pub literal_limit: Option<usize>,

    /// Randomly keep at most this many steps per literal (0 = all)
    #[arg(long)]
    pub step_limit: Option<usize>,

    /// Only keep literals whose value shows in the other variables
    #[arg(long)]
    pub verify_literals: bool,
}

/// `stepped-operator` arguments
#[derive(Debug, Clone, Args)]
pub struct SteppedOperatorArgs {
    #[command(flatten)]
    #[allow(missing_docs)]
    pub run: RunArgs,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub masking: MaskingArgs,

    /// Randomly keep at most this many steps per snippet (0 = all)
    #[arg(long)]
    pub step_limit: Option<usize>,

    /// Randomly keep at most this many operators per step (0 = all)
    #[arg(long)]
    pub candidate_limit: Option<usize>,
}

/// `config` actions
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl MaskingArgs {
    fn apply(&self, config: &mut EngineConfig) {
        if self.extended {
            config.replacements.preset = ReplacementPreset::Extended;
        }
        if self.comparisons {
            config.masking.comparison = true;
        }
    }
}

impl Commands {
    /// The pipeline to run, its file arguments and the configuration with
    /// command-line overrides applied
    fn pipeline(&self, mut config: EngineConfig) -> Option<(PipelineKind, &RunArgs, EngineConfig)> {
        let (kind, run) = match self {
            Self::LineCount(run) => (PipelineKind::LineCount, run),
            Self::Output(run) => (PipelineKind::Output, run),
            Self::Operator(args) => {
                args.masking.apply(&mut config);
                if let Some(limit) = args.limit {
                    config.operator.candidate_limit = limit;
                }
                (PipelineKind::Operator, &args.run)
            }
            Self::SteppedInput(args) => {
                if let Some(limit) = args.literal_limit {
                    config.stepped_input.literal_limit = limit;
                }
                if let Some(limit) = args.step_limit {
                    config.stepped_input.step_limit = limit;
                }
                config.stepped_input.verify_literals |= args.verify_literals;
                (PipelineKind::SteppedInput, &args.run)
            }
            Self::SteppedOperator(args) => {
                args.masking.apply(&mut config);
                if let Some(limit) = args.step_limit {
                    config.stepped_operator.step_limit = limit;
                }
                if let Some(limit) = args.candidate_limit {
                    config.stepped_operator.candidate_limit = limit;
                }
                (PipelineKind::SteppedOperator, &args.run)
            }
            Self::Config { .. } => return None,
        };
        Some((kind, run, config))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set RUST_LOG based on verbosity
    if std::env::var("RUST_LOG").is_err() {
        let level = match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        std::env::set_var("RUST_LOG", level);
    }
    let _guard = init_logging("etp", cli.log_file)?;

    let config_path = cmd::config::resolve_path(cli.config.as_deref())?;
    if let Commands::Config { action } = &cli.command {
        return cmd::config::run(*action, &config_path, cli.config.is_some());
    }

    let mut config = cmd::config::load(&config_path, cli.config.is_some())?;
    if cli.seed.is_some() {
        config.sampling.seed = cli.seed;
    }
    debug!(?config, "effective configuration");

    let Some((kind, run, config)) = cli.command.pipeline(config) else {
        return Ok(());
    };
    info!("Running {} pipeline on {}", kind, run.input.display());
    cmd::run::run_pipeline(kind, run, &config, cli.jobs)
}
