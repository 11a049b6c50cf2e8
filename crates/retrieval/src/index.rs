use autobrowse_core::{Error, Result};
use autobrowse_providers::Embedder;
use tracing::info;

/// An embedding per chunk, rebuilt wholesale whenever the page snapshot
/// changes. Never updated in place.
#[derive(Debug)]
pub struct ChunkIndex {
    entries: Vec<ChunkEntry>,
}

#[derive(Debug)]
struct ChunkEntry {
    text: String,
    vector: Vec<f32>,
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl ChunkIndex {
    pub async fn build(embedder: &dyn Embedder, chunks: Vec<String>) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::Retrieval("No chunks to index".to_string()));
        }
        let vectors = embedder.embed(&chunks).await?;
        info!(chunks = chunks.len(), "Chunk index built");
        Ok(Self {
            entries: chunks
                .into_iter()
                .zip(vectors)
                .map(|(text, vector)| ChunkEntry { text, vector })
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `k` best-matching chunk texts for the query, best first.
    pub async fn top_k(&self, embedder: &dyn Embedder, query: &str, k: usize) -> Result<Vec<&str>> {
        let query_vector = embedder
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Retrieval("Empty embedding for query".to_string()))?;

        let mut scored: Vec<(f32, &str)> = self
            .entries
            .iter()
            .map(|entry| (cosine(&entry.vector, &query_vector), entry.text.as_str()))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().take(k).map(|(_, text)| text).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Deterministic embedding: letter-frequency vector. Close enough for
    /// cosine ranking in tests without a network round-trip.
    pub(crate) struct LetterFreqEmbedder;

    #[async_trait]
    impl Embedder for LetterFreqEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.chars().filter(|c| c.is_ascii_alphabetic()) {
                        v[(c.to_ascii_lowercase() as u8 - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    #[test]
    fn test_cosine_basics() {
        assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_top_1_picks_the_matching_chunk() {
        let index = ChunkIndex::build(
            &LetterFreqEmbedder,
            vec![
                "<div>pricing table</div>".to_string(),
                "<button id=\"login\">login</button>".to_string(),
            ],
        )
        .await
        .unwrap();

        let best = index
            .top_k(&LetterFreqEmbedder, "login button", 1)
            .await
            .unwrap();
        assert_eq!(best.len(), 1);
        assert!(best[0].contains("login"));
    }

    #[tokio::test]
    async fn test_empty_chunks_rejected() {
        let err = ChunkIndex::build(&LetterFreqEmbedder, vec![]).await.unwrap_err();
        assert!(matches!(err, Error::Retrieval(_)));
    }
}
