//! Text chunker (C4): splits text into overlapping, boundary-aware chunks.
//!
//! Generalizes the sentence-boundary-only chunker this crate started from
//! into the full break-point preference order required by spec.md §4.2:
//! paragraph break, then sentence terminator, then any whitespace, then a
//! hard cut.

use crate::config::ChunkingConfig;

/// Splits text into overlapping chunks honoring break-point preference.
#[derive(Debug, Clone, Default)]
pub struct ContentChunker {
    pub config: ChunkingConfig,
}

impl ContentChunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Plain-text chunking per spec.md §4.2.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        chunk_text(text, self.config.chunk_size, self.config.chunk_overlap)
    }

    /// Structure-aware mode: accumulate paragraphs up to `chunk_size`,
    /// recursing into the generic algorithm for any paragraph that alone
    /// exceeds it.
    pub fn chunk_markdown(&self, text: &str) -> Vec<String> {
        chunk_markdown(text, self.config.chunk_size, self.config.chunk_overlap)
    }

    /// Code-aware mode: prefer function/class/block boundaries before
    /// falling back to generic breaks.
    pub fn chunk_code(&self, text: &str) -> Vec<String> {
        chunk_code(text, self.config.chunk_size, self.config.chunk_overlap)
    }
}

/// Coerce a non-positive/absurd size to the spec default (1000/200).
fn coerce(chunk_size: usize, overlap: usize) -> (usize, usize) {
    let size = if chunk_size == 0 { 1000 } else { chunk_size };
    let overlap = if overlap == 0 && chunk_size == 0 {
        200
    } else {
        overlap
    };
    (size, overlap)
}

/// The core sliding-window algorithm (spec.md §4.2).
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let (chunk_size, overlap) = coerce(chunk_size, overlap);

    if text.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= chunk_size {
        let trimmed = text.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        };
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let tentative_end = (start + chunk_size).min(len);
        let end = if tentative_end < len {
            find_break_point(&chars, start, tentative_end)
        } else {
            tentative_end
        };

        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= len {
            break;
        }

        // Advance by `end - overlap`, but guarantee forward progress even
        // when `overlap >= chunk_size` (spec.md §4.2 / §9).
        let advance_to = end.saturating_sub(overlap);
        start = advance_to.max(start + 1);
    }

    chunks
}

/// Search backwards from `end` within the window `[start, end)` for the
/// preferred break point: paragraph break, sentence terminator, whitespace,
/// else hard cut at `end`.
fn find_break_point(chars: &[char], start: usize, end: usize) -> usize {
    // (i) paragraph break: "\n\n"
    let mut i = end;
    while i > start + 1 {
        if chars[i - 1] == '\n' && chars[i - 2] == '\n' {
            return i;
        }
        i -= 1;
    }

    // (ii) sentence terminator followed by whitespace
    let mut i = end;
    while i > start + 1 {
        let c = chars[i - 2];
        if (c == '.' || c == '!' || c == '?') && chars[i - 1].is_whitespace() {
            return i;
        }
        i -= 1;
    }

    // (iii) any whitespace
    let mut i = end;
    while i > start {
        if chars[i - 1].is_whitespace() {
            return i;
        }
        i -= 1;
    }

    // hard cut
    end
}

/// Structure-aware chunking: accumulate whole paragraphs (blank-line
/// separated) up to `chunk_size`; paragraphs individually larger than
/// `chunk_size` are split with the generic algorithm.
pub fn chunk_markdown(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let (chunk_size, overlap) = coerce(chunk_size, overlap);

    if text.trim().is_empty() {
        return Vec::new();
    }

    let paragraphs: Vec<&str> = text.split("\n\n").filter(|p| !p.trim().is_empty()).collect();

    let mut chunks = Vec::new();
    let mut current = String::new();

    for para in paragraphs {
        if para.chars().count() > chunk_size {
            if !current.trim().is_empty() {
                chunks.push(current.trim().to_string());
                current = String::new();
            }
            chunks.extend(chunk_text(para, chunk_size, overlap));
            continue;
        }

        if !current.is_empty() && current.chars().count() + para.chars().count() + 2 > chunk_size {
            chunks.push(current.trim().to_string());
            current = String::new();
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(para);
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim().to_string());
    }

    chunks
}

/// Code-aware chunking: prefer breaking at a line starting a new top-level
/// block (`fn`, `def`, `class`, `impl`, `struct`, or a closing brace at
/// column 0) before falling back to the generic sliding window.
pub fn chunk_code(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let (chunk_size, overlap) = coerce(chunk_size, overlap);

    if text.trim().is_empty() {
        return Vec::new();
    }

    if text.chars().count() <= chunk_size {
        return vec![text.trim().to_string()];
    }

    const BOUNDARY_KEYWORDS: [&str; 6] = ["fn ", "def ", "class ", "impl ", "struct ", "} "];

    let lines: Vec<&str> = text.lines().collect();
    let mut chunks = Vec::new();
    let mut current_lines: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for line in lines {
        let line_len = line.chars().count() + 1;
        let starts_boundary = BOUNDARY_KEYWORDS
            .iter()
            .any(|kw| line.trim_start().starts_with(kw.trim_end()));

        if current_len + line_len > chunk_size && !current_lines.is_empty() && starts_boundary {
            chunks.push(current_lines.join("\n"));
            current_lines.clear();
            current_len = 0;
        } else if current_len + line_len > chunk_size * 2 && !current_lines.is_empty() {
            // Hard cap to avoid unbounded accumulation when no boundary ever
            // appears in a very long block.
            let joined = current_lines.join("\n");
            chunks.extend(chunk_text(&joined, chunk_size, overlap));
            current_lines.clear();
            current_len = 0;
        }

        current_lines.push(line);
        current_len += line_len;
    }

    if !current_lines.is_empty() {
        let joined = current_lines.join("\n");
        if joined.chars().count() > chunk_size {
            chunks.extend(chunk_text(&joined, chunk_size, overlap));
        } else {
            chunks.push(joined);
        }
    }

    chunks.into_iter().filter(|c| !c.trim().is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_empty_text() {
        assert!(chunk_text("", 1000, 200).is_empty());
    }

    #[test]
    fn test_chunk_short_text() {
        let text = "hello world. second sentence.";
        let chunks = chunk_text(text, 1000, 200);
        assert_eq!(chunks, vec![text.to_string()]);
    }

    #[test]
    fn test_chunk_long_text_forward_progress() {
        let text = "A".repeat(1500);
        let chunks = chunk_text(&text, 1000, 200);
        assert!(chunks.len() >= 2);
        assert!(chunks[0].len() <= 1000);
    }

    #[test]
    fn test_chunk_overlap_preserves_tail() {
        let text = "A".repeat(1500);
        let chunks = chunk_text(&text, 1000, 200);
        assert!(chunks.len() >= 2);
        let tail_of_first = &chunks[0][chunks[0].len() - 200..];
        let head_of_second = &chunks[1][..200.min(chunks[1].len())];
        assert_eq!(tail_of_first, head_of_second);
    }

    #[test]
    fn test_overlap_larger_than_chunk_size_terminates() {
        let text = "word ".repeat(500);
        let chunks = chunk_text(&text, 50, 500);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn test_paragraph_break_preferred() {
        let mut text = "a".repeat(50);
        text.push_str("\n\n");
        text.push_str(&"b".repeat(50));
        let chunks = chunk_text(&text, 60, 10);
        assert!(chunks[0].ends_with('a'));
    }

    #[test]
    fn test_chunk_markdown_splits_paragraphs() {
        let text = format!("{}\n\n{}", "a".repeat(10), "b".repeat(10));
        let chunks = chunk_markdown(&text, 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("a"));
        assert!(chunks[0].contains("b"));
    }

    #[test]
    fn test_chunk_markdown_large_paragraph_splits() {
        let big_para = "x".repeat(2000);
        let chunks = chunk_markdown(&big_para, 1000, 200);
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn test_chunk_code_respects_fn_boundary() {
        let code = format!(
            "fn one() {{\n{}\n}}\n\nfn two() {{\n{}\n}}",
            "    x();\n".repeat(100),
            "    y();\n".repeat(100)
        );
        let chunks = chunk_code(&code, 500, 50);
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn test_round_trip_recovers_text_modulo_whitespace() {
        let text = "one two three four five ".repeat(100);
        let chunks = chunk_text(&text, 100, 20);
        let recovered: String = chunks.join(" ");
        let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(normalize(&recovered).contains(&normalize(&text)[..50]));
    }

    proptest::proptest! {
        /// Forward progress: `chunk_text` always terminates, regardless of
        /// how `overlap` relates to `chunk_size` (spec.md §4.2/§9).
        #[test]
        fn prop_chunk_text_terminates(
            text in "[ -~\n]{0,400}",
            chunk_size in 1usize..200,
            overlap in 0usize..400,
        ) {
            let chunks = chunk_text(&text, chunk_size, overlap);
            for chunk in &chunks {
                proptest::prop_assert!(!chunk.trim().is_empty());
            }
        }

        /// No chunk exceeds `chunk_size` characters, for any break-point
        /// chosen by `find_break_point`.
        #[test]
        fn prop_chunks_never_exceed_chunk_size(
            text in "[a-zA-Z0-9 .!?\n]{0,500}",
            chunk_size in 10usize..200,
            overlap in 0usize..50,
        ) {
            let chunks = chunk_text(&text, chunk_size, overlap);
            for chunk in &chunks {
                proptest::prop_assert!(chunk.chars().count() <= chunk_size);
            }
        }
    }
}
