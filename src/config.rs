//! Run configuration.
//!
//! Defaults reproduce the classic traceur + mocha setup. A `livedoc.toml`
//! can override any of them:
//!
//! ```toml
//! sources = ["docs/*.md"]
//! lang = "ts"
//! staging_dir = "build/examples"
//! output_dir = "build/tests"
//!
//! [compiler]
//! program = "npx"
//! args = ["tsc", "{input}", "--outFile", "{output}"]
//!
//! [runner]
//! exit_policy = "ignore"
//! ```
//!
//! Relative paths are resolved against the working directory, not the
//! location of the config file.

use crate::directive::DirectiveParser;
use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "livedoc.toml";

/// Everything one pipeline run needs. Passed explicitly into the pipeline so
/// independent runs never share directories by accident.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Documentation files or glob patterns
    pub sources: Vec<String>,
    /// Fence tag of the sample language
    pub lang: String,
    /// Staged file extension; falls back to `lang`
    pub extension: Option<String>,
    pub staging_dir: PathBuf,
    pub output_dir: PathBuf,
    pub directive: DirectiveConfig,
    pub compiler: CompilerConfig,
    pub runner: RunnerConfig,
    pub scaffold: ScaffoldConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectiveConfig {
    pub marker: String,
}

/// External compiler. `{input}` and `{output}` in `args` are replaced with
/// the staged file and its output path.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub program: String,
    pub args: Vec<String>,
}

/// External test runner. `{preload}` and `{output}` in `args` are replaced
/// with the absolute preload path and the output directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub program: String,
    pub args: Vec<String>,
    pub preload: Option<PathBuf>,
    pub exit_policy: ExitPolicy,
}

/// Test-case scaffold; `${name}` in the prologue is the output file name.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScaffoldConfig {
    pub prologue: String,
    pub epilogue: String,
}

/// How the test runner's exit status affects our own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExitPolicy {
    /// Wait for the runner and exit with its code
    #[default]
    Propagate,
    /// Wait for the runner but always succeed
    Ignore,
    /// Start the runner and return without waiting
    Detach,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: vec!["LanguageFeatures.md".to_string()],
            lang: "js".to_string(),
            extension: None,
            staging_dir: PathBuf::from("tmp"),
            output_dir: PathBuf::from("test"),
            directive: DirectiveConfig::default(),
            compiler: CompilerConfig::default(),
            runner: RunnerConfig::default(),
            scaffold: ScaffoldConfig::default(),
        }
    }
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        Self {
            marker: "//".to_string(),
        }
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            program: "./node_modules/.bin/traceur".to_string(),
            args: ["--script", "{input}", "--out", "{output}"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "./node_modules/.bin/mocha".to_string(),
            args: ["--require", "{preload}"].map(String::from).to_vec(),
            preload: Some(PathBuf::from("test-utils.js")),
            exit_policy: ExitPolicy::Propagate,
        }
    }
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            prologue: [
                r#"var expect = require("chai").expect;"#,
                r#"describe("${name}", function(){"#,
                r#"  it("works", function() {"#,
            ]
            .join("\n"),
            epilogue: ["  });", "});"].join("\n"),
        }
    }
}

impl Config {
    /// Load configuration. An explicit path must exist; otherwise
    /// `livedoc.toml` is used when present and defaults when not.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !candidate.is_file() {
                    tracing::debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Self::from_toml(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Extension given to staged and output files.
    pub fn extension(&self) -> &str {
        self.extension.as_deref().unwrap_or(&self.lang)
    }

    pub fn directive_parser(&self) -> Result<DirectiveParser, ConfigError> {
        DirectiveParser::new(&self.directive.marker)
    }

    /// Reject configurations that cannot produce a sound run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Validation(msg.to_string()));

        if self.lang.trim().is_empty() {
            return invalid("lang must not be empty");
        }
        if self.extension().trim().is_empty() {
            return invalid("extension must not be empty");
        }
        if self.staging_dir.as_os_str().is_empty() || self.output_dir.as_os_str().is_empty() {
            return invalid("staging_dir and output_dir must be set");
        }
        if dirs_overlap(&self.staging_dir, &self.output_dir) {
            return invalid(
                "staging_dir and output_dir must be different directories, neither inside the other",
            );
        }
        if self.compiler.program.is_empty() {
            return invalid("compiler.program must be set");
        }
        for placeholder in ["{input}", "{output}"] {
            if !self.compiler.args.iter().any(|a| a.contains(placeholder)) {
                return Err(ConfigError::Validation(format!(
                    "compiler.args must reference {placeholder}"
                )));
            }
        }
        if self.runner.program.is_empty() {
            return invalid("runner.program must be set");
        }
        if self.runner.preload.is_none() && self.runner.args.iter().any(|a| a.contains("{preload}")) {
            return invalid("runner.args reference {preload} but runner.preload is not set");
        }
        self.directive_parser()?;
        Ok(())
    }

    /// Expand `sources` into documentation paths.
    ///
    /// Plain paths, and existing files whose names merely look like globs,
    /// are kept as given (a missing file fails when it is read). Glob
    /// patterns are expanded; a pattern matching nothing only warns.
    /// The result is sorted and deduplicated so block numbering is stable.
    pub fn expand_sources(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let mut files = Vec::new();
        for pattern in &self.sources {
            if !is_glob(pattern) || Path::new(pattern).is_file() {
                files.push(PathBuf::from(pattern));
                continue;
            }
            let matches: Vec<_> = glob::glob(pattern)
                .map_err(|source| ConfigError::Pattern {
                    pattern: pattern.clone(),
                    source,
                })?
                .filter_map(|r| r.ok())
                .filter(|p| p.is_file())
                .collect();
            if matches.is_empty() {
                tracing::warn!("no files matched: {}", pattern);
            }
            files.extend(matches);
        }
        files.sort();
        files.dedup();
        Ok(files)
    }
}

/// True when `a` and `b` are the same directory or one contains the other,
/// compared on absolute paths with `.` segments removed.
fn dirs_overlap(a: &Path, b: &Path) -> bool {
    let normalize = |p: &Path| -> PathBuf {
        std::path::absolute(p)
            .unwrap_or_else(|_| p.to_path_buf())
            .components()
            .collect()
    };
    let (a, b) = (normalize(a), normalize(b));
    a.starts_with(&b) || b.starts_with(&a)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}
