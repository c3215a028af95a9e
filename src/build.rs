//! Compile every staged example with the external compiler.
//!
//! Each file in the staging directory gets its own compiler process, all of
//! them started at once. The compiler's stderr goes straight to ours so
//! diagnostics show up live. One non-zero exit fails the whole stage.

use crate::config::CompilerConfig;
use crate::directive::{Directive, DirectiveParser};
use crate::error::PipelineError;
use crate::stage::fan_out;
use crate::workspace::list_files;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

/// An external compiler invocation template.
#[derive(Debug, Clone)]
pub struct Compiler {
    program: String,
    args: Vec<String>,
    directives: DirectiveParser,
}

impl Compiler {
    pub fn new(config: &CompilerConfig, directives: DirectiveParser) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            directives,
        }
    }

    /// Arguments for one invocation: the template with `{input}` and
    /// `{output}` substituted, then the directive argument if there is one.
    pub fn command_args(
        &self,
        input: &Path,
        output: &Path,
        directive: Option<&Directive>,
    ) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect();
        if let Some(d) = directive {
            args.push(d.argument.clone());
        }
        args
    }

    /// Compile `input` into `output_dir`, keeping the file name.
    async fn compile(&self, input: PathBuf, output_dir: &Path) -> Result<PathBuf, PipelineError> {
        let content = tokio::fs::read(&input)
            .await
            .map_err(|source| PipelineError::ReadStaged {
                path: input.clone(),
                source,
            })?;

        let output = match input.file_name() {
            Some(name) => output_dir.join(name),
            None => output_dir.to_path_buf(), // coverage:off - listed entries always have a name
        };
        // only the first line matters; the rest may be in any encoding
        let first_line = content.split(|b| *b == b'\n').next().unwrap_or_default();
        let directive = self.directives.parse(&String::from_utf8_lossy(first_line));
        if let Some(ref d) = directive {
            tracing::debug!("{}: forwarding directive {}", input.display(), d.argument);
        }
        let args = self.command_args(&input, &output, directive.as_ref());
        tracing::debug!(program = %self.program, ?args, "compiling {}", input.display());

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| PipelineError::Spawn {
                program: self.program.clone(),
                path: input.clone(),
                source,
            })?;

        if !status.success() {
            tracing::error!("{} failed to compile: {}", input.display(), status);
            return Err(PipelineError::Compile {
                file: input,
                code: status.code(),
            });
        }
        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(PipelineError::MissingOutput {
                file: input,
                output,
            });
        }
        Ok(output)
    }
}

/// Compile every file currently in `staging` into `output_dir`.
///
/// Returns the compiled paths sorted by name.
pub async fn compile_all(
    compiler: Arc<Compiler>,
    staging: &Path,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, PipelineError> {
    let inputs = list_files(staging)
        .await
        .map_err(|source| PipelineError::ReadStaged {
            path: staging.to_path_buf(),
            source,
        })?;
    tracing::info!("compiling {} file(s) from {}", inputs.len(), staging.display());

    let mut compiled = fan_out(inputs, |input| {
        let compiler = Arc::clone(&compiler);
        let output_dir = output_dir.to_path_buf();
        async move { compiler.compile(input, &output_dir).await }
    })
    .await?;

    compiled.sort();
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn compiler(program: &str, args: &[&str]) -> Arc<Compiler> {
        let config = CompilerConfig {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
        };
        Arc::new(Compiler::new(&config, DirectiveParser::new("//").unwrap()))
    }

    /// `sh -c SCRIPT input output [directive]`: the script sees the paths as
    /// `$0` and `$1` and a forwarded directive as `$2`.
    fn sh(script: &str) -> Arc<Compiler> {
        compiler("sh", &["-c", script, "{input}", "{output}"])
    }

    fn dirs() -> (TempDir, PathBuf, PathBuf) {
        let root = TempDir::new().unwrap();
        let staging = root.path().join("tmp");
        let output = root.path().join("test");
        std::fs::create_dir(&staging).unwrap();
        std::fs::create_dir(&output).unwrap();
        (root, staging, output)
    }

    #[test]
    fn substitutes_placeholders() {
        let c = compiler("traceur", &["--script", "{input}", "--out", "{output}"]);
        let args = c.command_args(Path::new("tmp/example0.js"), Path::new("test/example0.js"), None);
        assert_eq!(args, vec!["--script", "tmp/example0.js", "--out", "test/example0.js"]);
    }

    #[test]
    fn appends_directive_argument() {
        let c = compiler("traceur", &["--script", "{input}", "--out", "{output}"]);
        let d = Directive {
            argument: "--foo".to_string(),
        };
        let args = c.command_args(Path::new("a.js"), Path::new("b.js"), Some(&d));
        assert_eq!(args.last().map(String::as_str), Some("--foo"));
        assert_eq!(args.len(), 5);
    }

    #[tokio::test]
    async fn compiles_each_staged_file() {
        let (_root, staging, output) = dirs();
        std::fs::write(staging.join("example0.js"), "var a;\n").unwrap();
        std::fs::write(staging.join("example1.js"), "var b;\n").unwrap();

        let compiled = compile_all(sh(r#"cp "$0" "$1""#), &staging, &output).await.unwrap();
        assert_eq!(compiled, vec![output.join("example0.js"), output.join("example1.js")]);
        assert_eq!(std::fs::read_to_string(output.join("example1.js")).unwrap(), "var b;\n");
    }

    #[tokio::test]
    async fn includes_files_dropped_into_staging() {
        let (_root, staging, output) = dirs();
        std::fs::write(staging.join("handwritten.js"), "x();\n").unwrap();

        let compiled = compile_all(sh(r#"cp "$0" "$1""#), &staging, &output).await.unwrap();
        assert_eq!(compiled, vec![output.join("handwritten.js")]);
    }

    #[tokio::test]
    async fn forwards_directive_only_when_present() {
        let (_root, staging, output) = dirs();
        std::fs::write(staging.join("example0.js"), "// --foo\nvar a;\n").unwrap();
        std::fs::write(staging.join("example1.js"), "var b;\n").unwrap();

        // the stand-in compiler writes its extra argument, or "none"
        let c = sh(r#"printf '%s' "${2-none}" > "$1""#);
        compile_all(c, &staging, &output).await.unwrap();
        assert_eq!(std::fs::read_to_string(output.join("example0.js")).unwrap(), "--foo");
        assert_eq!(std::fs::read_to_string(output.join("example1.js")).unwrap(), "none");
    }

    #[tokio::test]
    async fn non_utf8_examples_still_compile() {
        let (_root, staging, output) = dirs();
        std::fs::write(staging.join("latin1.js"), b"var s = '\xe9';\n").unwrap();
        std::fs::write(staging.join("flagged.js"), b"// --foo\nvar s = '\xe9';\n").unwrap();

        let c = sh(r#"cp "$0" "$1"; printf '%s' "${2-}" > "$1.arg""#);
        compile_all(c, &staging, &output).await.unwrap();
        assert_eq!(std::fs::read(output.join("latin1.js")).unwrap(), b"var s = '\xe9';\n");
        assert_eq!(std::fs::read_to_string(output.join("latin1.js.arg")).unwrap(), "");
        assert_eq!(std::fs::read_to_string(output.join("flagged.js.arg")).unwrap(), "--foo");
    }

    #[tokio::test]
    async fn nonzero_exit_names_the_file() {
        let (_root, staging, output) = dirs();
        std::fs::write(staging.join("example0.js"), "fine\n").unwrap();
        std::fs::write(staging.join("example1.js"), "BROKEN\n").unwrap();

        let c = sh(r#"if grep -q BROKEN "$0"; then exit 3; fi; cp "$0" "$1""#);
        match compile_all(c, &staging, &output).await {
            Err(PipelineError::Compile { file, code }) => {
                assert_eq!(file, staging.join("example1.js"));
                assert_eq!(code, Some(3));
            }
            other => panic!("expected compile error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let (_root, staging, output) = dirs();
        std::fs::write(staging.join("example0.js"), "x\n").unwrap();

        let c = compiler("./definitely-not-a-compiler", &["{input}", "{output}"]);
        match compile_all(c, &staging, &output).await {
            Err(PipelineError::Spawn { path, .. }) => assert_eq!(path, staging.join("example0.js")),
            other => panic!("expected spawn error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_without_output_is_an_error() {
        let (_root, staging, output) = dirs();
        std::fs::write(staging.join("example0.js"), "x\n").unwrap();

        match compile_all(sh("true"), &staging, &output).await {
            Err(PipelineError::MissingOutput { output: missing, .. }) => {
                assert_eq!(missing, output.join("example0.js"));
            }
            other => panic!("expected missing output error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_staging_compiles_nothing() {
        let (_root, staging, output) = dirs();
        let compiled = compile_all(sh("exit 1"), &staging, &output).await.unwrap();
        assert!(compiled.is_empty());
    }
}
