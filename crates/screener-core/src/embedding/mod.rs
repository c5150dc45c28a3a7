pub mod features;
pub mod hash_embedder;
pub mod similarity;

use serde::Serialize;
use tracing::{debug, warn};

pub use hash_embedder::HashEmbedder;
pub use similarity::{cosine_similarity, rescaled_similarity};

/// 埋め込みを生成したプロバイダ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub version: String,
}

/// 文書1件分の埋め込み。テキストごとに毎回計算し、キャッシュしない。
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEmbedding {
    pub vector: Vec<f32>,
    /// テキストが短すぎる/空のため信頼できない（ゼロベクトル）
    pub low_confidence: bool,
    pub token_count: usize,
    pub provider: ProviderInfo,
}

impl DocumentEmbedding {
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding provider {provider} is unavailable: {reason}")]
    Unavailable { provider: String, reason: String },
    #[error("embedding provider {provider} produced {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        provider: String,
        expected: usize,
        actual: usize,
    },
    #[error("no embedding providers configured")]
    NoProviders,
    #[error("all embedding providers failed: {}", .0.join("; "))]
    AllFailed(Vec<String>),
}

/// 埋め込みプロバイダの抽象インターフェース
///
/// 起動時に一度だけ構築し、以後は `Arc` で共有する。
/// `embed` は `&self` のみを取り、外部ロックなしで並行に呼べること。
pub trait EmbeddingProvider: Send + Sync {
    /// 実装名（"hash", "disabled", "chain"）
    fn name(&self) -> &str;

    /// バージョン情報（特徴量設計・ハッシュ関数の世代）
    fn version(&self) -> &str;

    fn dimension(&self) -> usize;

    /// 最小トークン数に満たないテキストは失敗ではなく low_confidence のゼロベクトルを返す
    fn embed(&self, text: &str) -> Result<DocumentEmbedding, EmbeddingError>;

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name().to_string(),
            version: self.version().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmbedderConfig {
    pub dimension: usize,
    /// これ未満の内容語数は low_confidence
    pub min_tokens: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            dimension: 300,
            min_tokens: 5,
        }
    }
}

/// 常に利用不可を返すプロバイダ（意味類似度を無効化してスキルのみで採点する）
#[derive(Debug, Clone, Copy)]
pub struct DisabledEmbedder {
    dimension: usize,
}

impl DisabledEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl EmbeddingProvider for DisabledEmbedder {
    fn name(&self) -> &str {
        "disabled"
    }

    fn version(&self) -> &str {
        "v0"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, _text: &str) -> Result<DocumentEmbedding, EmbeddingError> {
        Err(EmbeddingError::Unavailable {
            provider: self.name().to_string(),
            reason: "semantic similarity disabled by configuration".into(),
        })
    }
}

/// 順序付きプロバイダ列。先頭から試し、最初に成功したものを採用する。
pub struct EmbeddingChain {
    providers: Vec<Box<dyn EmbeddingProvider>>,
    version: String,
}

impl EmbeddingChain {
    pub fn new(providers: Vec<Box<dyn EmbeddingProvider>>) -> Result<Self, EmbeddingError> {
        if providers.is_empty() {
            return Err(EmbeddingError::NoProviders);
        }
        let version = providers
            .iter()
            .map(|p| format!("{}:{}", p.name(), p.version()))
            .collect::<Vec<_>>()
            .join(">");
        Ok(Self { providers, version })
    }
}

impl std::fmt::Debug for EmbeddingChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingChain")
            .field("version", &self.version)
            .finish()
    }
}

impl EmbeddingProvider for EmbeddingChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn dimension(&self) -> usize {
        self.providers[0].dimension()
    }

    fn embed(&self, text: &str) -> Result<DocumentEmbedding, EmbeddingError> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.embed(text) {
                Ok(embedding) if embedding.dimension() != provider.dimension() => {
                    let err = EmbeddingError::DimensionMismatch {
                        provider: provider.name().to_string(),
                        expected: provider.dimension(),
                        actual: embedding.dimension(),
                    };
                    warn!(provider = provider.name(), error = %err, "embedding rejected; trying next");
                    failures.push(err.to_string());
                }
                Ok(embedding) => {
                    debug!(
                        provider = provider.name(),
                        attempts = failures.len() + 1,
                        "embedding produced"
                    );
                    return Ok(embedding);
                }
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "embedding provider failed; trying next");
                    failures.push(err.to_string());
                }
            }
        }
        Err(EmbeddingError::AllFailed(failures))
    }
}

/// 名前からプロバイダを構築する。カンマ区切りならその順で `EmbeddingChain` を組む。
/// 未知の名前は hash にフォールバックする。
pub fn create_embedder(name: &str, config: EmbedderConfig) -> Box<dyn EmbeddingProvider> {
    let names: Vec<&str> = name
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();

    if names.len() > 1 {
        let providers = names.iter().map(|n| build_single(n, config)).collect();
        if let Ok(chain) = EmbeddingChain::new(providers) {
            return Box::new(chain);
        }
    }

    build_single(names.first().copied().unwrap_or("hash"), config)
}

fn build_single(name: &str, config: EmbedderConfig) -> Box<dyn EmbeddingProvider> {
    match name {
        "hash" => Box::new(HashEmbedder::new(config)),
        "disabled" | "none" => Box::new(DisabledEmbedder::new(config.dimension)),
        other => {
            warn!(embedder = other, "unknown embedder; falling back to hash");
            Box::new(HashEmbedder::new(config))
        }
    }
}
