//! livedoc: run the code samples in documentation as a test suite.
//!
//! Every fenced block tagged with the sample language (`js` by default) is
//! written to the staging directory as `example<N>.<ext>`, compiled into the
//! output directory by an external compiler, wrapped in a test-case scaffold
//! and finally handed to an external test runner:
//!
//! - **extract**: select tagged fences from the documentation sources
//! - **reset**: delete and recreate the staging and output directories
//! - **stage**: write each block to its own file
//! - **compile**: one compiler process per staged file
//! - **wrap**: add the scaffold prologue/epilogue to each compiled file
//! - **test**: start the test runner in the output directory
//!
//! Usage: `livedoc [-c livedoc.toml] [docs/*.md]...`

mod build;
mod config;
mod directive;
mod error;
mod extract;
mod materialize;
mod pipeline;
mod runner;
mod scaffold;
mod stage;
mod workspace;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, ExitPolicy};
use pipeline::Pipeline;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "livedoc",
    about = "Compile and test the code samples embedded in documentation"
)]
struct Cli {
    /// Documentation files (glob patterns supported). Overrides `sources`.
    sources: Vec<String>,

    /// Config file [default: livedoc.toml if present]
    #[arg(short = 'c', long, env = "LIVEDOC_CONFIG")]
    config: Option<PathBuf>,

    /// Fence tag of the sample language
    #[arg(short = 'l', long, env = "LIVEDOC_LANG")]
    lang: Option<String>,

    /// Extension for staged files (defaults to the language tag)
    #[arg(short = 'e', long)]
    extension: Option<String>,

    /// Directory for extracted examples
    #[arg(long, env = "LIVEDOC_STAGING_DIR")]
    staging: Option<PathBuf>,

    /// Directory for compiled, wrapped tests
    #[arg(short = 'o', long, env = "LIVEDOC_OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// How the test runner's exit status affects ours
    #[arg(long, value_enum)]
    exit_policy: Option<ExitPolicy>,

    /// Stop after wrapping; do not start the test runner
    #[arg(long)]
    no_run: bool,

    /// Print the selected examples and exit without touching any directory
    #[arg(long)]
    list: bool,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Layer command-line overrides on top of the loaded configuration.
    fn apply(&self, mut config: Config) -> Config {
        if !self.sources.is_empty() {
            config.sources = self.sources.clone();
        }
        if let Some(ref lang) = self.lang {
            config.lang = lang.clone();
        }
        if let Some(ref ext) = self.extension {
            config.extension = Some(ext.clone());
        }
        if let Some(ref dir) = self.staging {
            config.staging_dir = dir.clone();
        }
        if let Some(ref dir) = self.output {
            config.output_dir = dir.clone();
        }
        if let Some(policy) = self.exit_policy {
            config.runner.exit_policy = policy;
        }
        config
    }

    fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over -v/-q.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("livedoc={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let config = cli.apply(config);
    let pipeline = Pipeline::new(config).context("invalid configuration")?;

    if cli.list {
        return list_examples(&pipeline).await;
    }

    let report = pipeline.run(!cli.no_run).await?;
    tracing::info!(
        staged = report.staged,
        compiled = report.compiled,
        wrapped = report.wrapped,
        "pipeline finished"
    );
    let policy = pipeline.config().runner.exit_policy;
    Ok(ExitCode::from(report.runner.exit_code(policy)))
}

/// `--list`: one line per selected block with its staged name and origin.
async fn list_examples(pipeline: &Pipeline) -> Result<ExitCode> {
    let config = pipeline.config();
    for block in pipeline.collect_blocks().await? {
        let first_line = block.body.lines().next().unwrap_or("");
        println!(
            "{}\t{}:{}\t{}",
            block.file_name(config.extension()),
            block.source.display(),
            block.line,
            first_line
        );
    }
    Ok(ExitCode::SUCCESS)
}
