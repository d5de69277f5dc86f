//! samrender cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; samrender ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render a template for an environment
    ///
    /// With --env2 both environments are rendered and the difference is printed instead
    Render(RenderCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct RenderCommand {
    /// Path to the template
    pub template: PathBuf,

    #[clap(flatten)]
    pub config: ConfigArgs,

    /// Second environment to diff the first one against
    #[clap(long = "env2")]
    pub env2: Option<String>,

    #[clap(flatten)]
    pub backend: BackendArgs,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// samconfig file holding the environment overrides
    #[clap(long = "config", default_value = samrender::config::DEFAULT_CONFIG_FILE)]
    pub file: PathBuf,

    /// Environment name in the config file
    #[clap(long = "env", default_value = samrender::config::DEFAULT_ENVIRONMENT)]
    pub env: String,
}

#[derive(Parser, Debug)]
pub struct BackendArgs {
    /// AWS profile used to look up exports and secrets
    ///
    /// Without a profile all external values are mocked.
    #[clap(long = "profile")]
    pub profile: Option<String>,

    /// Use mock values when a lookup fails instead of aborting
    #[clap(long = "mock-on-failure", requires("profile"))]
    pub mock_on_failure: bool,

    /// Seconds to wait for a single lookup
    #[clap(long = "timeout", default_value_t = 10)]
    pub timeout: u64,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Print the loaded template
    Template { template: PathBuf },
    /// List the intrinsic functions a template uses
    Functions { template: PathBuf },
}
