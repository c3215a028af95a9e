//! Error types for configuration loading and the pipeline stages.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid glob pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// A fatal pipeline error. Every variant names the file (or process) that
/// caused it so the offending example can be located.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("failed to reset workspace directory {path}: {source}")]
    Reset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read documentation {path}: {source}")]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write example {path}: {source}")]
    Materialize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read staged file {path}: {source}")]
    ReadStaged {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch {program} for {path}: {source}")]
    Spawn {
        program: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("compiling {file} failed ({})", describe_code(*code))]
    Compile { file: PathBuf, code: Option<i32> },

    #[error("compiler exited successfully for {file} but did not produce {output}")]
    MissingOutput { file: PathBuf, output: PathBuf },

    #[error("failed to wrap {path}: {source}")]
    Scaffold {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch test runner {program}: {source}")]
    RunnerSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stage task did not complete: {0}")]
    Task(#[from] tokio::task::JoinError),
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
