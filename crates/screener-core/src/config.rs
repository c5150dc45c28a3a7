//! 採点・パイプライン・バッチの設定値
//!
//! 起動時に `from_env()`（`SCREENER_*`）で読み込み、`validate()` を通してから共有する。
//! 以後は不変。

use std::str::FromStr;

use serde::Serialize;

use crate::scoring::weights::{DEFAULT_PREFERRED_WEIGHT, DEFAULT_WEIGHTS, ScoringWeights};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("scoring weights must sum to 1.0 (got {sum})")]
    WeightsSum { sum: f64 },
    #[error("{name} weight must be a finite value >= 0 (got {value})")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("preferred skill weight must be in (0, 1] (got {0})")]
    InvalidPreferredWeight(f64),
    #[error(
        "recommendation thresholds must satisfy 0 <= weak < good < strong <= 1 (got strong={strong}, good={good}, weak={weak})"
    )]
    Thresholds { strong: f64, good: f64, weak: f64 },
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

/// 推奨ランクの下限（下限値ちょうどは上位ランク）
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecommendationThresholds {
    pub strong: f64,
    pub good: f64,
    pub weak: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            strong: 0.75,
            good: 0.55,
            weak: 0.35,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningConfig {
    pub weights: ScoringWeights,
    pub preferred_weight: f64,
    pub thresholds: RecommendationThresholds,
    /// 埋め込みを信頼する最小内容語数
    pub min_tokens: usize,
    pub embedding_dimension: usize,
    pub embedding_timeout_ms: u64,
    /// ナラティブで名前を挙げる不足スキルの上限
    pub max_missing_in_narrative: usize,
    /// 受け付ける本文の最大文字数
    pub max_text_chars: usize,
    /// 同時に走らせる埋め込み計算（ブロッキングスレッド）の上限。タイムアウト後も計算終了まで枠を占有する。
    pub max_embedding_tasks: usize,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
            preferred_weight: DEFAULT_PREFERRED_WEIGHT,
            thresholds: RecommendationThresholds::default(),
            min_tokens: 5,
            embedding_dimension: 300,
            embedding_timeout_ms: 2_000,
            max_missing_in_narrative: 3,
            max_text_chars: 50_000,
            max_embedding_tasks: 8,
        }
    }
}

impl ScreeningConfig {
    /// 環境変数から読み込む。未設定・パース不能な値はデフォルトのまま。
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            weights: ScoringWeights {
                skill: env_or("SCREENER_SKILL_WEIGHT", defaults.weights.skill),
                semantic: env_or("SCREENER_SEMANTIC_WEIGHT", defaults.weights.semantic),
            },
            preferred_weight: env_or("SCREENER_PREFERRED_WEIGHT", defaults.preferred_weight),
            thresholds: RecommendationThresholds {
                strong: env_or("SCREENER_THRESHOLD_STRONG", defaults.thresholds.strong),
                good: env_or("SCREENER_THRESHOLD_GOOD", defaults.thresholds.good),
                weak: env_or("SCREENER_THRESHOLD_WEAK", defaults.thresholds.weak),
            },
            min_tokens: env_or("SCREENER_MIN_TOKENS", defaults.min_tokens),
            embedding_dimension: env_or("SCREENER_EMBEDDING_DIMENSION", defaults.embedding_dimension),
            embedding_timeout_ms: env_or(
                "SCREENER_EMBEDDING_TIMEOUT_MS",
                defaults.embedding_timeout_ms,
            ),
            max_missing_in_narrative: env_or(
                "SCREENER_MAX_MISSING_IN_NARRATIVE",
                defaults.max_missing_in_narrative,
            ),
            max_text_chars: env_or("SCREENER_MAX_TEXT_CHARS", defaults.max_text_chars),
            max_embedding_tasks: env_or(
                "SCREENER_MAX_EMBEDDING_TASKS",
                defaults.max_embedding_tasks,
            ),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_scoring()?;
        if self.embedding_dimension == 0 {
            return Err(ConfigError::Zero {
                name: "embedding_dimension",
            });
        }
        if self.embedding_timeout_ms == 0 {
            return Err(ConfigError::Zero {
                name: "embedding_timeout_ms",
            });
        }
        if self.max_text_chars == 0 {
            return Err(ConfigError::Zero {
                name: "max_text_chars",
            });
        }
        if self.max_missing_in_narrative == 0 {
            return Err(ConfigError::Zero {
                name: "max_missing_in_narrative",
            });
        }
        if self.max_embedding_tasks == 0 {
            return Err(ConfigError::Zero {
                name: "max_embedding_tasks",
            });
        }
        Ok(())
    }

    /// 採点に関わる値（重み・歓迎重み・閾値）だけを検証する
    pub fn validate_scoring(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("skill", self.weights.skill),
            ("semantic", self.weights.semantic),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { name, value });
            }
        }
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightsSum { sum });
        }

        let pw = self.preferred_weight;
        if !pw.is_finite() || pw <= 0.0 || pw > 1.0 {
            return Err(ConfigError::InvalidPreferredWeight(pw));
        }

        let RecommendationThresholds { strong, good, weak } = self.thresholds;
        let ordered = 0.0 <= weak && weak < good && good < strong && strong <= 1.0;
        if !ordered {
            return Err(ConfigError::Thresholds { strong, good, weak });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchConfig {
    pub max_concurrency: usize,
    pub max_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            max_batch_size: 50,
        }
    }
}

impl BatchConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrency: env_or("SCREENER_BATCH_CONCURRENCY", defaults.max_concurrency),
            max_batch_size: env_or("SCREENER_BATCH_MAX_SIZE", defaults.max_batch_size),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Zero {
                name: "max_concurrency",
            });
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::Zero {
                name: "max_batch_size",
            });
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
