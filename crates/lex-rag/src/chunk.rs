//! Word-boundary text chunking for ingestion.

/// Split `text` into chunks of at most `size` characters, each starting
/// roughly `overlap` characters before the end of the previous one.
///
/// Chunks break on whitespace. A single word longer than `size` becomes its
/// own chunk. Every step advances by at least one word.
#[must_use]
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let size = size.max(1);
    let overlap = overlap.min(size / 2);

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < words.len() {
        let mut end = start;
        let mut len = 0;
        while end < words.len() {
            let extra = words[end].chars().count() + usize::from(end > start);
            if end > start && len + extra > size {
                break;
            }
            len += extra;
            end += 1;
        }
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }

        // Walk back from `end` while the tail stays within `overlap`.
        let mut next = end;
        let mut tail = 0;
        while next > start + 1 {
            let extra = words[next - 1].chars().count() + 1;
            if tail + extra > overlap {
                break;
            }
            tail += extra;
            next -= 1;
        }
        start = next;
    }
    chunks
}
