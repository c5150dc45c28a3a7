use std::hash::{Hash, Hasher};

use siphasher::sip::SipHasher13;

use super::{
    DocumentEmbedding, EmbedderConfig, EmbeddingError, EmbeddingProvider,
    features::{DocumentFeatures, document_features},
};

/// 固定 seed（決定論的 hash のため）
/// ⚠️ この値を変更すると全 embedding が変わる → version() を上げること
const HASH_SEED_K0: u64 = 0x0123_4567_89ab_cdef;
const HASH_SEED_K1: u64 = 0xfedc_ba98_7654_3210;

/// Feature Hashing による決定論的な文書埋め込み
///
/// - 学習不要（固定ハッシュ関数）
/// - unigram + bigram の内容語特徴量
/// - SipHash13 + 固定 seed で Rust バージョン間の安定性を保証
/// - sign hashing で衝突の偏りを打ち消し、L2 正規化する
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    config: EmbedderConfig,
}

impl HashEmbedder {
    pub fn new(config: EmbedderConfig) -> Self {
        let mut cfg = config;
        cfg.dimension = cfg.dimension.max(1);
        Self { config: cfg }
    }

    fn hash_feature(&self, feature: &str) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        feature.hash(&mut hasher);
        hasher.finish()
    }

    fn features_to_vector(&self, doc: &DocumentFeatures) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.config.dimension];

        for wf in &doc.features {
            let idx = (self.hash_feature(&wf.feature) % self.config.dimension as u64) as usize;
            // Sign hashing: 偶数ハッシュ → +weight, 奇数ハッシュ → -weight
            let sign = if self.hash_feature(&format!("{}_sign", wf.feature)) % 2 == 0 {
                1.0
            } else {
                -1.0
            };
            vector[idx] += sign * wf.weight;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl EmbeddingProvider for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn version(&self) -> &str {
        // 特徴量設計やハッシュ関数が変わったらバージョンを上げる
        "v1"
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn embed(&self, text: &str) -> Result<DocumentEmbedding, EmbeddingError> {
        let doc = document_features(text);

        if doc.token_count < self.config.min_tokens {
            return Ok(DocumentEmbedding {
                vector: vec![0.0; self.config.dimension],
                low_confidence: true,
                token_count: doc.token_count,
                provider: self.info(),
            });
        }

        let vector = self.features_to_vector(&doc);
        let low_confidence = vector.iter().all(|v| *v == 0.0);

        Ok(DocumentEmbedding {
            vector,
            low_confidence,
            token_count: doc.token_count,
            provider: self.info(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::similarity::rescaled_similarity;

    fn embedder() -> HashEmbedder {
        HashEmbedder::new(EmbedderConfig::default())
    }

    #[test]
    fn produces_normalized_vectors_of_configured_dimension() {
        let emb = embedder()
            .embed("Backend engineer with Python, PostgreSQL and Kubernetes experience")
            .unwrap();

        assert_eq!(emb.dimension(), 300);
        assert!(!emb.low_confidence);
        let norm: f32 = emb.vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!(
            (norm - 1.0).abs() < 1e-5,
            "L2 norm should be 1.0, got {}",
            norm
        );
    }

    #[test]
    fn short_text_is_low_confidence_zero_vector() {
        let emb = embedder().embed("Python developer").unwrap();

        assert!(emb.low_confidence);
        assert_eq!(emb.token_count, 2);
        assert!(emb.vector.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn empty_text_does_not_fail() {
        let emb = embedder().embed("").unwrap();
        assert!(emb.low_confidence);
        assert_eq!(emb.token_count, 0);
    }

    #[test]
    fn embedding_is_deterministic() {
        let text = "Data scientist building machine learning models for fraud detection";
        assert_eq!(embedder().embed(text).unwrap(), embedder().embed(text).unwrap());
    }

    #[test]
    fn similar_texts_score_higher_than_unrelated_texts() {
        let e = embedder();
        let job = e
            .embed("Looking for a backend engineer to build Python microservices on AWS with PostgreSQL")
            .unwrap();
        let similar = e
            .embed("Backend engineer who built Python microservices running on AWS and PostgreSQL")
            .unwrap();
        let unrelated = e
            .embed("Pastry chef specializing in French desserts, wedding cakes and chocolate sculptures")
            .unwrap();

        let similar_score = rescaled_similarity(&job.vector, &similar.vector);
        let unrelated_score = rescaled_similarity(&job.vector, &unrelated.vector);

        assert!(
            similar_score > unrelated_score,
            "Similar resume should score higher: {} vs {}",
            similar_score,
            unrelated_score
        );
    }

    #[test]
    fn records_provider_identity() {
        let emb = embedder().embed("one two three four five six").unwrap();
        assert_eq!(emb.provider.name, "hash");
        assert_eq!(emb.provider.version, "v1");
    }
}
