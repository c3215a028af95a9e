//! Compiler directives embedded in the first line of an example.
//!
//! Grammar (first line only):
//!
//! ```text
//! directive = marker SP "--" flag-text
//! ```
//!
//! With the default `//` marker, an example starting with `// --experimental`
//! is compiled with the extra argument `--experimental`. Anything else on the
//! first line, or a directive on a later line, is ordinary code.

use crate::error::ConfigError;
use regex::Regex;

/// Extra compiler argument requested by an example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub argument: String,
}

/// Recognises directives introduced by a particular comment marker.
#[derive(Debug, Clone)]
pub struct DirectiveParser {
    re: Regex,
}

impl DirectiveParser {
    pub fn new(marker: &str) -> Result<Self, ConfigError> {
        if marker.is_empty() {
            return Err(ConfigError::Validation(
                "directive marker must not be empty".to_string(),
            ));
        }
        let pattern = format!(r"^{} --(.*)$", regex::escape(marker));
        let re = Regex::new(&pattern)
            .map_err(|e| ConfigError::Validation(format!("directive marker {marker:?}: {e}")))?;
        Ok(Self { re })
    }

    /// Parse the directive on the first line of `content`, if any.
    pub fn parse(&self, content: &str) -> Option<Directive> {
        let first = content.lines().next()?;
        let caps = self.re.captures(first)?;
        let flag = caps.get(1)?.as_str().trim();
        if flag.is_empty() {
            return None;
        }
        Some(Directive {
            argument: format!("--{flag}"),
        })
    }
}
