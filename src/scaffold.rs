//! Wrap compiled examples in a test-case scaffold.
//!
//! With the default templates a compiled `example0.js` becomes:
//!
//! ```text
//! var expect = require("chai").expect;
//! describe("example0.js", function(){
//!   it("works", function() {
//! <compiled code>
//!   });
//! });
//! ```
//!
//! Wrapping rewrites files in place and is not idempotent; the workspace
//! reset at the start of each run guarantees every file is wrapped once.

use crate::config::ScaffoldConfig;
use crate::error::PipelineError;
use crate::stage::fan_out;
use crate::workspace::list_files;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Prologue/epilogue pair wrapped around each test file.
#[derive(Debug, Clone)]
pub struct Scaffold {
    prologue: String,
    epilogue: String,
}

impl Scaffold {
    pub fn new(config: &ScaffoldConfig) -> Self {
        Self {
            prologue: config.prologue.clone(),
            epilogue: config.epilogue.clone(),
        }
    }

    /// Wrapped content for the file called `name`. The compiled bytes are
    /// kept as they are, whatever their encoding.
    pub fn wrap(&self, name: &str, content: &[u8]) -> Vec<u8> {
        let prologue = self.prologue.replace("${name}", name);
        let mut out = Vec::with_capacity(prologue.len() + content.len() + self.epilogue.len() + 2);
        out.extend_from_slice(prologue.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(content);
        out.push(b'\n');
        out.extend_from_slice(self.epilogue.as_bytes());
        out
    }

    async fn wrap_file(&self, path: PathBuf) -> Result<PathBuf, PipelineError> {
        let err = |source| PipelineError::Scaffold {
            path: path.clone(),
            source,
        };
        let content = tokio::fs::read(&path).await.map_err(err)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tokio::fs::write(&path, self.wrap(&name, &content))
            .await
            .map_err(err)?;
        Ok(path)
    }
}

/// Wrap every file in `output_dir` in place. Returns the wrapped paths
/// sorted by name.
pub async fn inject_all(
    scaffold: Arc<Scaffold>,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, PipelineError> {
    let files = list_files(output_dir)
        .await
        .map_err(|source| PipelineError::Scaffold {
            path: output_dir.to_path_buf(),
            source,
        })?;
    tracing::info!("wrapping {} test file(s) in {}", files.len(), output_dir.display());

    let mut wrapped = fan_out(files, |path| {
        let scaffold = Arc::clone(&scaffold);
        async move { scaffold.wrap_file(path).await }
    })
    .await?;

    wrapped.sort();
    Ok(wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn default_scaffold() -> Arc<Scaffold> {
        Arc::new(Scaffold::new(&ScaffoldConfig::default()))
    }

    #[test]
    fn wraps_with_default_templates() {
        let wrapped = default_scaffold().wrap("example0.js", b"var x = 1 + 1;");
        let expected = [
            r#"var expect = require("chai").expect;"#,
            r#"describe("example0.js", function(){"#,
            r#"  it("works", function() {"#,
            "var x = 1 + 1;",
            "  });",
            "});",
        ]
        .join("\n");
        assert_eq!(wrapped, expected.into_bytes());
    }

    #[test]
    fn custom_templates_substitute_name() {
        let scaffold = Scaffold::new(&ScaffoldConfig {
            prologue: "def test_${name}():".to_string(),
            epilogue: "# end ${name}".to_string(),
        });
        let wrapped = scaffold.wrap("ex", b"    pass");
        assert_eq!(wrapped, b"def test_ex():\n    pass\n# end ${name}");
    }

    #[tokio::test]
    async fn rewrites_every_output_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("example0.js"), "a();\n").unwrap();
        std::fs::write(dir.path().join("example1.js"), "b();\n").unwrap();

        let wrapped = inject_all(default_scaffold(), dir.path()).await.unwrap();
        assert_eq!(wrapped.len(), 2);

        for (name, body) in [("example0.js", "a();"), ("example1.js", "b();")] {
            let content = std::fs::read_to_string(dir.path().join(name)).unwrap();
            let label = content.find(&format!("describe(\"{name}\"")).unwrap();
            let code = content.find(body).unwrap();
            let close = content.rfind("});").unwrap();
            assert!(label < code && code < close, "bad wrapping: {content}");
        }
    }

    #[tokio::test]
    async fn keeps_non_utf8_content_intact() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("latin1.js"), b"var s = '\xe9';").unwrap();

        inject_all(default_scaffold(), dir.path()).await.unwrap();
        let wrapped = std::fs::read(dir.path().join("latin1.js")).unwrap();
        let expected = [
            &b"var expect = require(\"chai\").expect;\ndescribe(\"latin1.js\", function(){\n  it(\"works\", function() {\n"[..],
            b"var s = '\xe9';",
            b"\n  });\n});",
        ]
        .concat();
        assert_eq!(wrapped, expected);
    }

    #[tokio::test]
    async fn empty_output_dir_is_fine() {
        let dir = TempDir::new().unwrap();
        assert!(inject_all(default_scaffold(), dir.path()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_output_dir_reports_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent");
        match inject_all(default_scaffold(), &missing).await {
            Err(PipelineError::Scaffold { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected scaffold error, got {other:?}"),
        }
    }
}
