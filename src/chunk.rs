//! Markdown-aware document chunker.
//!
//! Splits a document into overlapping [`Chunk`]s sized for full-text search.
//! Splitting is delegated to `text_splitter::MarkdownSplitter`, which prefers
//! the highest semantic boundary that fits (headings, then blocks, then
//! paragraphs, sentences, words) and never cuts inside a code block, table,
//! or link unless that single unit is larger than the chunk capacity.
//!
//! # Algorithm
//!
//! 1. Strip a leading YAML front-matter block (`---\n ... ---\n`).
//! 2. Run the markdown splitter with a capacity of [`DOC_CHUNK_SIZE`]
//!    characters and [`DOC_CHUNK_OVERLAP`] characters of overlap.
//! 3. Drop pieces that hold nothing but headings (except the last); their
//!    headings reach the following piece through step 4.
//! 4. Prefix each piece with the headings it sits under that fall before
//!    its start, e.g. `# Alerting\n## Routing tree\n\n<body>`. The capacity
//!    applies to the body; the heading path comes on top.
//! 5. Number the resulting pieces `1..=n` in document order.

use text_splitter::{ChunkConfig, MarkdownSplitter};

use crate::error::{DocsError, Result};
use crate::models::Chunk;

/// Chunk capacity in characters.
pub const DOC_CHUNK_SIZE: usize = 8 * 1024;

/// Overlap between consecutive chunks in characters.
pub const DOC_CHUNK_OVERLAP: usize = 1024;

const FENCE: &str = "---\n";

/// Removes a leading `---`-delimited front-matter block, if present.
///
/// The block runs from an opening `---\n` at the very start of the text to
/// the next `---\n`, inclusive.
pub fn strip_front_matter(content: &str) -> &str {
    let Some(rest) = content.strip_prefix(FENCE) else {
        return content;
    };
    match rest.find(FENCE) {
        Some(end) => &rest[end + FENCE.len()..],
        None => content,
    }
}

/// Reusable markdown chunker with a fixed size and overlap.
pub struct DocsChunker {
    splitter: MarkdownSplitter<text_splitter::Characters>,
}

impl DocsChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = ChunkConfig::new(chunk_size)
            .with_overlap(overlap)
            .map_err(|e| DocsError::ChunkConfig {
                message: e.to_string(),
            })?
            .with_trim(true);
        Ok(Self {
            splitter: MarkdownSplitter::new(config),
        })
    }

    /// Chunker with the default docs sizing.
    pub fn with_defaults() -> Result<Self> {
        Self::new(DOC_CHUNK_SIZE, DOC_CHUNK_OVERLAP)
    }

    /// Splits already front-matter-stripped `content` of document `name`.
    pub fn chunk(&self, name: &str, content: &str) -> Vec<Chunk> {
        let headings = headings(content);
        let pieces: Vec<(usize, &str)> = self.splitter.chunk_indices(content).collect();

        let mut path: Vec<&Heading> = Vec::new();
        let mut next_heading = 0;
        let mut chunks = Vec::with_capacity(pieces.len());
        for (i, &(offset, text)) in pieces.iter().enumerate() {
            while let Some(heading) = headings.get(next_heading).filter(|h| h.offset < offset) {
                path.retain(|h| h.level < heading.level);
                path.push(heading);
                next_heading += 1;
            }
            if i + 1 < pieces.len() && is_heading_only(text) {
                continue;
            }

            // A piece opening with its own heading only inherits the levels above it.
            let own_level = heading_level(text.trim_start()).unwrap_or(usize::MAX);
            let context: Vec<&str> = path
                .iter()
                .filter(|h| h.level < own_level)
                .map(|h| h.line)
                .collect();
            let content = if context.is_empty() {
                text.to_string()
            } else {
                format!("{}\n\n{text}", context.join("\n"))
            };

            chunks.push(Chunk {
                id: chunks.len() + 1,
                name: name.to_string(),
                content,
            });
        }
        chunks
    }
}

/// An ATX heading line and where it starts in the document.
struct Heading<'a> {
    offset: usize,
    level: usize,
    line: &'a str,
}

/// ATX headings outside fenced code blocks, in document order.
fn headings(content: &str) -> Vec<Heading<'_>> {
    let mut found = Vec::new();
    let mut in_fence = false;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let start = offset;
        offset += line.len();

        let trimmed = line.trim_end();
        let body = trimmed.trim_start();
        let indent = trimmed.len() - body.len();
        if indent > 3 {
            continue;
        }
        if body.starts_with("```") || body.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(level) = heading_level(body) {
            found.push(Heading {
                offset: start + indent,
                level,
                line: body,
            });
        }
    }
    found
}

/// `1..=6` for `#`..`######` followed by a space or end of line.
fn heading_level(line: &str) -> Option<usize> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    match line.as_bytes().get(level) {
        None | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') => Some(level),
        _ => None,
    }
}

fn is_heading_only(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .all(|l| heading_level(l).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_front_matter() {
        let doc = "---\ntitle: Getting started\nsort_rank: 1\n---\n# Getting started\n";
        assert_eq!(strip_front_matter(doc), "# Getting started\n");
    }

    #[test]
    fn test_strip_front_matter_absent() {
        let doc = "# Title\n\n---\n\nnot front matter\n---\n";
        assert_eq!(strip_front_matter(doc), doc);
    }

    #[test]
    fn test_strip_front_matter_stops_at_first_closing_fence() {
        let doc = "---\na: 1\n---\nbody\n---\nmore\n";
        assert_eq!(strip_front_matter(doc), "body\n---\nmore\n");
    }

    #[test]
    fn test_small_doc_is_one_chunk() {
        let chunker = DocsChunker::with_defaults().unwrap();
        let chunks = chunker.chunk("index.md", "# Title\n\nSome text.");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].id, 1);
        assert_eq!(chunks[0].name, "index.md");
        assert_eq!(chunks[0].content, "# Title\n\nSome text.");
    }

    #[test]
    fn test_empty_doc_has_no_chunks() {
        let chunker = DocsChunker::with_defaults().unwrap();
        assert!(chunker.chunk("empty.md", "").is_empty());
        assert!(chunker.chunk("blank.md", "  \n\n ").is_empty());
    }

    #[test]
    fn test_large_doc_ids_are_sequential_and_bounded() {
        let chunker = DocsChunker::new(200, 20).unwrap();
        let mut doc = String::new();
        for i in 0..30 {
            doc.push_str(&format!("## Section {i}\n\nParagraph number {i} with some words.\n\n"));
        }
        let chunks = chunker.chunk("big.md", &doc);
        assert!(chunks.len() > 1);
        let heading_room = "## Section 29\n\n".len();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.id, i + 1);
            assert!(chunk.content.chars().count() <= 200 + heading_room);
        }
    }

    #[test]
    fn test_later_chunks_keep_heading_path() {
        let chunker = DocsChunker::new(400, 50).unwrap();
        let mut doc = String::from("# Alerting\n\n## Routing tree\n\n");
        for i in 0..40 {
            doc.push_str(&format!("Route number {i} matches alerts by label.\n\n"));
        }
        doc.push_str("## Inhibition\n\n");
        for i in 0..15 {
            doc.push_str(&format!("Inhibition rule {i} mutes dependent alerts.\n\n"));
        }

        let chunks = chunker.chunk("alerting/config.md", &doc);
        assert!(chunks.len() > 3, "{}", chunks.len());
        assert!(chunks[0].content.starts_with("# Alerting\n"));
        assert!(chunks.iter().all(|c| !is_heading_only(&c.content)));

        for chunk in &chunks[1..] {
            assert!(chunk.content.starts_with("# Alerting\n"), "{}", chunk.content);
        }
        let routing = chunks
            .iter()
            .rev()
            .find(|c| c.content.contains("Route number 39"))
            .unwrap();
        assert!(routing.content.starts_with("# Alerting\n## Routing tree\n\n"));

        let last = chunks.last().unwrap();
        assert!(last.content.contains("## Inhibition"), "{}", last.content);
        assert!(!last.content.starts_with("# Alerting\n## Routing tree"));
    }

    #[test]
    fn test_heading_inside_code_fence_is_ignored() {
        let found = headings("# Real\n\n```sh\n# not a heading\n```\n###### Six\n#hashtag\n");
        let lines: Vec<(usize, &str)> = found.iter().map(|h| (h.level, h.line)).collect();
        assert_eq!(lines, vec![(1, "# Real"), (6, "###### Six")]);
    }

    #[test]
    fn test_heading_only_doc_is_kept() {
        let chunker = DocsChunker::with_defaults().unwrap();
        let chunks = chunker.chunk("stub.md", "# Stub");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "# Stub");
    }

    #[test]
    fn test_code_block_is_kept_whole_when_it_fits() {
        let chunker = DocsChunker::new(120, 0).unwrap();
        let code = "```yaml\nscrape_configs:\n  - job_name: node\n```";
        let doc = format!("{}\n\n{code}\n\n{}", "intro ".repeat(15), "outro ".repeat(15));
        let chunks = chunker.chunk("cfg.md", &doc);
        assert!(chunks.iter().any(|c| c.content.contains(code)));
    }

    #[test]
    fn test_invalid_overlap_is_rejected() {
        assert!(matches!(
            DocsChunker::new(10, 10),
            Err(DocsError::ChunkConfig { .. })
        ));
    }
}
