//! Fixed-size overlapping character windows over document text.

use crate::config::ChunkingConfig;

/// Split `text` into overlapping windows of `chunk_size` characters.
///
/// Windows advance by `chunk_size - overlap`. Each window is trimmed and kept
/// only if longer than `min_chunk_chars` and not opening with a skipped prefix
/// (page headers, chapter titles, figure and table captions).
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = config.chunk_size.saturating_sub(config.overlap).max(1);
    let prefixes: Vec<String> = config
        .skip_prefixes
        .iter()
        .map(|p| p.to_lowercase())
        .collect();

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + config.chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let window = window.trim();

        if window.chars().count() > config.min_chunk_chars && !has_prefix(window, &prefixes) {
            chunks.push(window.to_string());
        }
        start += step;
    }

    tracing::debug!(
        chars = chars.len(),
        chunks = chunks.len(),
        "Chunked document"
    );
    chunks
}

fn has_prefix(window: &str, prefixes: &[String]) -> bool {
    let lowered = window.to_lowercase();
    prefixes.iter().any(|p| lowered.starts_with(p.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk_size: usize, overlap: usize, min_chunk_chars: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size,
            overlap,
            min_chunk_chars,
            ..ChunkingConfig::default()
        }
    }

    #[test]
    fn test_windows_overlap() {
        let text: String = ('a'..='z').collect();
        let chunks = chunk_text(&text, &config(10, 4, 0));
        assert_eq!(chunks[0], "abcdefghij");
        assert_eq!(chunks[1], "ghijklmnop");
        assert_eq!(chunks[2], "mnopqrstuv");
        assert_eq!(chunks.last().unwrap(), "yz");
    }

    #[test]
    fn test_short_windows_are_dropped() {
        let text = "x".repeat(200);
        let chunks = chunk_text(&text, &ChunkingConfig::default());
        // Windows start at 0 and 140; the second holds only 60 characters.
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 180);
    }

    #[test]
    fn test_skip_prefixes_case_insensitive() {
        let cfg = config(30, 0, 5);
        let text = format!(
            "{:<30}{:<30}",
            "Figure 3: revenue by year",
            "Revenue grew in every region"
        );
        let chunks = chunk_text(&text, &cfg);
        assert_eq!(chunks, vec!["Revenue grew in every region".to_string()]);
    }

    #[test]
    fn test_multibyte_text() {
        let text = "é".repeat(25);
        let chunks = chunk_text(&text, &config(10, 0, 0));
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].chars().count(), 5);
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", &ChunkingConfig::default()).is_empty());
    }
}
