//! Extract tagged code blocks from documentation text.
//!
//! Only fenced blocks are recognised: a line starting with ```` ``` ````
//! immediately followed by a language tag opens a block, the next line
//! starting with ```` ``` ```` closes it. This is deliberately not a markdown
//! parser; indented code, `~~~` fences and nesting are not understood.

use std::path::{Path, PathBuf};

/// Code fence delimiter.
pub const FENCE: &str = "```";

/// A selected code block, numbered by its position among selected blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language tag that selected this block
    pub tag: String,
    /// Fence content without the opening tag line
    pub body: String,
    /// 0-based position among selected blocks; names the staged file
    pub index: usize,
    /// Documentation file the block came from
    pub source: PathBuf,
    /// Line of the opening fence (1-indexed)
    pub line: usize,
}

impl CodeBlock {
    /// Staged file name for this block: `example<index>.<ext>`.
    pub fn file_name(&self, ext: &str) -> String {
        format!("example{}.{}", self.index, ext)
    }
}

/// A fenced block before selection.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Fence<'a> {
    info: &'a str,
    body: String,
    line: usize,
}

/// Split `text` into every fenced block, in document order.
///
/// An unterminated fence runs to the end of the text.
fn split_fences(text: &str) -> Vec<Fence<'_>> {
    let mut fences = Vec::new();
    let mut lines = text.lines().enumerate();

    while let Some((i, line)) = lines.next() {
        let Some(info) = line.strip_prefix(FENCE) else {
            continue;
        };

        let mut body = String::new();
        for (_, inner) in lines.by_ref() {
            if inner.starts_with(FENCE) {
                break;
            }
            body.push_str(inner);
            body.push('\n');
        }

        fences.push(Fence {
            info,
            body,
            line: i + 1,
        });
    }
    fences
}

/// The language tag of a fence info string: its first whitespace-delimited
/// token. A fence with a space right after the marker has no tag.
fn tag_of(info: &str) -> &str {
    if info.starts_with(char::is_whitespace) {
        return "";
    }
    info.split_whitespace().next().unwrap_or("")
}

/// Select the blocks of `text` whose tag is exactly `tag` (case-sensitive),
/// numbering them from `first_index` in document order.
pub fn extract_blocks(source: &Path, text: &str, tag: &str, first_index: usize) -> Vec<CodeBlock> {
    split_fences(text)
        .into_iter()
        .filter(|fence| tag_of(fence.info) == tag)
        .enumerate()
        .map(|(i, fence)| CodeBlock {
            tag: tag.to_string(),
            body: fence.body,
            index: first_index + i,
            source: source.to_path_buf(),
            line: fence.line,
        })
        .collect()
}
