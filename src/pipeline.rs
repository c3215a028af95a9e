//! The end-to-end run: extract, reset, stage, compile, wrap, test.
//!
//! Stages run strictly one after another. Inside a stage every file is
//! handled concurrently and the next stage starts only once all of them
//! have finished. The first error stops the run; files already written stay
//! on disk until the next reset.

use crate::build::{compile_all, Compiler};
use crate::config::Config;
use crate::error::PipelineError;
use crate::extract::{extract_blocks, CodeBlock};
use crate::materialize::materialize;
use crate::runner::{RunnerOutcome, TestRunner};
use crate::scaffold::{inject_all, Scaffold};
use crate::workspace::Workspace;
use anyhow::Result;
use std::sync::Arc;

/// Counts of what a run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub staged: usize,
    pub compiled: usize,
    pub wrapped: usize,
    pub runner: RunnerOutcome,
}

/// A configured pipeline. Owns its configuration so separate instances can
/// run side by side on different directories.
pub struct Pipeline {
    config: Config,
    compiler: Arc<Compiler>,
    scaffold: Arc<Scaffold>,
    runner: TestRunner,
}

impl Pipeline {
    /// Validate `config` and prepare the external tool templates.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let compiler = Compiler::new(&config.compiler, config.directive_parser()?);
        let scaffold = Scaffold::new(&config.scaffold);
        let runner = TestRunner::new(&config.runner);
        Ok(Self {
            config,
            compiler: Arc::new(compiler),
            scaffold: Arc::new(scaffold),
            runner,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn workspace(&self) -> Workspace {
        Workspace::new(&self.config.staging_dir, &self.config.output_dir)
    }

    /// Read every documentation source and select the sample blocks,
    /// numbered continuously across sources.
    pub async fn collect_blocks(&self) -> Result<Vec<CodeBlock>> {
        let mut blocks = Vec::new();
        for source in self.config.expand_sources()? {
            let text = tokio::fs::read_to_string(&source)
                .await
                .map_err(|e| PipelineError::ReadSource {
                    path: source.clone(),
                    source: e,
                })?;
            let found = extract_blocks(&source, &text, &self.config.lang, blocks.len());
            tracing::debug!("{}: {} {} block(s)", source.display(), found.len(), self.config.lang);
            blocks.extend(found);
        }
        Ok(blocks)
    }

    /// Run every stage. With `run_tests` false the run stops after wrapping.
    pub async fn run(&self, run_tests: bool) -> Result<Report> {
        let blocks = self.collect_blocks().await?;
        let ws = self.workspace();

        ws.reset().await?;
        let staged = materialize(blocks, &ws.staging, self.config.extension()).await?;
        let compiled = compile_all(Arc::clone(&self.compiler), &ws.staging, &ws.output).await?;
        let wrapped = inject_all(Arc::clone(&self.scaffold), &ws.output).await?;

        let runner = if run_tests {
            self.runner.run(&ws.output).await?
        } else {
            tracing::info!("skipping test runner");
            RunnerOutcome::Skipped
        };

        Ok(Report {
            staged: staged.len(),
            compiled: compiled.len(),
            wrapped: wrapped.len(),
            runner,
        })
    }
}
