use crate::normalize::{content_tokens, stem};

const UNIGRAM_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.5;

/// 重み付き特徴量
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedFeature {
    pub feature: String,
    pub weight: f32,
}

impl WeightedFeature {
    pub fn new(feature: impl Into<String>, weight: f32) -> Self {
        Self {
            feature: feature.into(),
            weight,
        }
    }
}

/// 文書の特徴量列と、その元になった内容語数
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFeatures {
    pub features: Vec<WeightedFeature>,
    pub token_count: usize,
}

/// 特徴量形式
/// - u:<stem>          (unigram)
/// - b:<stem>_<stem>   (隣接 bigram)
///
/// ストップワードは除去してから語幹化する。
pub fn document_features(text: &str) -> DocumentFeatures {
    let stems: Vec<String> = content_tokens(text).iter().map(|t| stem(t)).collect();

    let mut features = Vec::with_capacity(stems.len() * 2);
    for token in &stems {
        features.push(WeightedFeature::new(format!("u:{token}"), UNIGRAM_WEIGHT));
    }
    for pair in stems.windows(2) {
        features.push(WeightedFeature::new(
            format!("b:{}_{}", pair[0], pair[1]),
            BIGRAM_WEIGHT,
        ));
    }

    DocumentFeatures {
        features,
        token_count: stems.len(),
    }
}
