//! Hash-based embedding used for the optional semantic blend.
//!
//! This is the same hash-bag construction as the teacher's own
//! `SimpleEmbedder` (`voice-agent/backend/crates/rag/src/embeddings.rs`) —
//! there, it is explicitly the "for testing (no model required)" fallback the
//! real `Embedder` delegates to when its `onnx` feature is off; the
//! teacher's production path runs actual ONNX/BERT inference via `ort` +
//! `tokenizers` over a downloaded model and tokenizer file, and its
//! `Cargo.toml` carries `candle-core`/`candle-nn`/`candle-transformers`/
//! `safetensors`/`hf-hub`/`qdrant-client` for that concern. None of that
//! stack is wired up here: this corpus has no model/tokenizer artifact to
//! load and no vector database to query, so a real embedder has nothing to
//! run against. Keeping the teacher's test fixture as the production path
//! is a deliberate scope simplification, not an independent design — see
//! `DESIGN.md`'s `crates/corpus` entry for the tradeoff this accepts
//! (no real semantic recall, only a cheap stand-in signal blended with
//! fuzzy matching per §4.7).

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub dim: usize,
    pub normalize: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dim: 128, normalize: true }
    }
}

pub struct SimpleEmbedder {
    config: EmbeddingConfig,
}

impl SimpleEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.config.dim];
        for (i, c) in text.to_lowercase().chars().enumerate() {
            let idx = (c as usize + i) % self.config.dim;
            embedding[idx] += 1.0;
        }

        if self.config.normalize {
            let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                for v in &mut embedding {
                    *v /= norm;
                }
            }
        }

        embedding
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_unit_normalized() {
        let embedder = SimpleEmbedder::new(EmbeddingConfig::default());
        let embedding = embedder.embed("joyful");
        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn identical_text_has_similarity_one() {
        let embedder = SimpleEmbedder::new(EmbeddingConfig::default());
        let a = embedder.embed("joyful");
        let b = embedder.embed("joyful");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);
    }

    #[test]
    fn unrelated_text_has_lower_similarity() {
        let embedder = SimpleEmbedder::new(EmbeddingConfig::default());
        let joy = embedder.embed("joyful");
        let xen = embedder.embed("xenophobia");
        assert!(cosine_similarity(&joy, &xen) < 0.9);
    }
}
