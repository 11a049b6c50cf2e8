use tracing::warn;

use crate::tokenizer::count_tokens;

/// Splits page markup into overlapping chunks sized in tokens.
///
/// Markup is first cut at `>` boundaries (the closing of a tag), so chunks
/// start and end at tag edges rather than mid-attribute. Pieces are then
/// merged greedily up to `chunk_size` tokens, and each chunk starts with the
/// trailing pieces of its predecessor up to `overlap` tokens.
#[derive(Debug, Clone)]
pub struct HtmlChunker {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl HtmlChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self { chunk_size, overlap }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_with(text, count_tokens)
    }

    /// Split with an explicit length function (tests use cheap counters).
    pub fn split_with(&self, text: &str, measure: impl Fn(&str) -> usize) -> Vec<String> {
        let pieces = split_at_tag_ends(text);
        let sizes: Vec<usize> = pieces.iter().map(|p| measure(p)).collect();

        let mut chunks: Vec<String> = Vec::new();
        // current window of piece indices forming the chunk under construction
        let mut window: Vec<usize> = Vec::new();
        let mut total = 0usize;

        for (i, &size) in sizes.iter().enumerate() {
            if size > self.chunk_size {
                warn!(piece_tokens = size, chunk_size = self.chunk_size, "Markup piece exceeds chunk size");
            }
            if total + size > self.chunk_size && !window.is_empty() {
                chunks.push(window.iter().map(|&j| pieces[j]).collect());
                // retain a tail of the window as overlap for the next chunk
                while total > self.overlap
                    || (total + size > self.chunk_size && total > 0)
                {
                    let dropped = window.remove(0);
                    total -= sizes[dropped];
                }
            }
            window.push(i);
            total += size;
        }

        if !window.is_empty() {
            chunks.push(window.iter().map(|&j| pieces[j]).collect());
        }
        chunks
    }
}

/// Cut text after every `>`, keeping the delimiter with the piece before it.
fn split_at_tag_ends(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        if ch == '>' {
            pieces.push(&text[start..=i]);
            start = i + 1;
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}
