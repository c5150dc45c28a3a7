//! スキル一致度と意味類似度を重み付きで合成する採点
//!
//! どちらかのシグナルが使えない場合は残りの重みを 1.0 に正規化し、
//! どのシグナルを落としたかを `ScoreBreakdown` に残す。

pub mod weights;

use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use tracing::debug;

use crate::config::{ConfigError, RecommendationThresholds, ScreeningConfig};
use crate::embedding::{DocumentEmbedding, rescaled_similarity};
use crate::extraction::SkillSet;
use weights::{NO_WEIGHTS, SEMANTIC_ONLY_WEIGHTS, SKILL_ONLY_WEIGHTS, ScoringWeights};

/// シグナルが使えない理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UnavailableReason {
    /// 求人に必須・歓迎スキルが1つもない
    NoJobSkills,
    /// どちらかの本文が短すぎて埋め込みが信頼できない
    LowConfidenceEmbedding,
    EmbeddingUnavailable,
    EmbeddingTimeout,
    /// 履歴書と求人で埋め込みのプロバイダ/次元が異なる
    ProviderMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SignalScore {
    Available { value: f64 },
    Unavailable { reason: UnavailableReason },
}

impl SignalScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            SignalScore::Available { value } => Some(*value),
            SignalScore::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.value().is_some()
    }

    pub fn unavailable_reason(&self) -> Option<UnavailableReason> {
        match self {
            SignalScore::Available { .. } => None,
            SignalScore::Unavailable { reason } => Some(*reason),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Recommendation {
    StrongMatch,
    GoodMatch,
    WeakMatch,
    NoMatch,
}

impl Recommendation {
    /// 閾値は下限を含む（0.75 ちょうどは strong-match）。NaN は no-match。
    pub fn from_score(score: f64, thresholds: &RecommendationThresholds) -> Self {
        if score >= thresholds.strong {
            Recommendation::StrongMatch
        } else if score >= thresholds.good {
            Recommendation::GoodMatch
        } else if score >= thresholds.weak {
            Recommendation::WeakMatch
        } else {
            Recommendation::NoMatch
        }
    }

    /// 上位ほど大きい序数（単調性の確認用）
    pub fn rank(&self) -> u8 {
        match self {
            Recommendation::StrongMatch => 3,
            Recommendation::GoodMatch => 2,
            Recommendation::WeakMatch => 1,
            Recommendation::NoMatch => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Recommendation::StrongMatch => "strong match",
            Recommendation::GoodMatch => "good match",
            Recommendation::WeakMatch => "weak match",
            Recommendation::NoMatch => "no match",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DroppedSignal {
    None,
    Skill,
    Semantic,
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub skill_score: SignalScore,
    pub semantic_score: SignalScore,
    pub overall_score: f64,
    /// 実際に適用した重み（落としたシグナルがあれば正規化後）
    pub weights_used: ScoringWeights,
    pub dropped_signal: DroppedSignal,
    pub recommendation: Recommendation,
}

/// 採点に渡す埋め込みの組
#[derive(Debug, Clone, Copy)]
pub enum EmbeddingPair<'a> {
    Available {
        resume: &'a DocumentEmbedding,
        job: &'a DocumentEmbedding,
    },
    Unavailable(UnavailableReason),
}

#[derive(Debug, Clone, Copy)]
pub struct ScoringInputs<'a> {
    pub resume_skills: &'a SkillSet,
    pub required_skills: &'a SkillSet,
    pub preferred_skills: &'a SkillSet,
    pub embeddings: EmbeddingPair<'a>,
}

/// 重み付き合成スコアの計算器（状態を持たない）
#[derive(Debug, Default, Clone, Copy)]
pub struct SimilarityScorer;

impl SimilarityScorer {
    pub fn score(
        &self,
        inputs: ScoringInputs<'_>,
        config: &ScreeningConfig,
    ) -> Result<ScoreBreakdown, ConfigError> {
        config.validate_scoring()?;

        let skill_score = skill_coverage(
            inputs.resume_skills,
            inputs.required_skills,
            inputs.preferred_skills,
            config.preferred_weight,
        );
        let semantic_score = semantic_similarity(inputs.embeddings);

        let (overall, weights_used, dropped_signal) =
            match (skill_score.value(), semantic_score.value()) {
                (Some(skill), Some(semantic)) => (
                    config.weights.skill * skill + config.weights.semantic * semantic,
                    config.weights,
                    DroppedSignal::None,
                ),
                (Some(skill), None) => (skill, SKILL_ONLY_WEIGHTS, DroppedSignal::Semantic),
                (None, Some(semantic)) => (semantic, SEMANTIC_ONLY_WEIGHTS, DroppedSignal::Skill),
                (None, None) => (0.0, NO_WEIGHTS, DroppedSignal::Both),
            };

        let overall_score = if overall.is_finite() {
            overall.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let recommendation = Recommendation::from_score(overall_score, &config.thresholds);

        debug!(
            skill = ?skill_score.value(),
            semantic = ?semantic_score.value(),
            overall = overall_score,
            dropped = dropped_signal.as_ref(),
            recommendation = recommendation.as_ref(),
            "match scored"
        );

        Ok(ScoreBreakdown {
            skill_score,
            semantic_score,
            overall_score,
            weights_used,
            dropped_signal,
            recommendation,
        })
    }
}

/// 必須一致 1.0、歓迎一致 `preferred_weight` の加重被覆率
fn skill_coverage(
    resume: &SkillSet,
    required: &SkillSet,
    preferred: &SkillSet,
    preferred_weight: f64,
) -> SignalScore {
    if required.is_empty() && preferred.is_empty() {
        return SignalScore::Unavailable {
            reason: UnavailableReason::NoJobSkills,
        };
    }

    let matched_required = required.names().filter(|n| resume.contains(n)).count();
    let matched_preferred = preferred.names().filter(|n| resume.contains(n)).count();

    let achieved = matched_required as f64 + preferred_weight * matched_preferred as f64;
    let achievable = required.len() as f64 + preferred_weight * preferred.len() as f64;

    SignalScore::Available {
        value: (achieved / achievable).clamp(0.0, 1.0),
    }
}

fn semantic_similarity(embeddings: EmbeddingPair<'_>) -> SignalScore {
    let (resume, job) = match embeddings {
        EmbeddingPair::Available { resume, job } => (resume, job),
        EmbeddingPair::Unavailable(reason) => return SignalScore::Unavailable { reason },
    };

    if resume.low_confidence || job.low_confidence {
        return SignalScore::Unavailable {
            reason: UnavailableReason::LowConfidenceEmbedding,
        };
    }
    if resume.provider != job.provider || resume.dimension() != job.dimension() {
        return SignalScore::Unavailable {
            reason: UnavailableReason::ProviderMismatch,
        };
    }

    SignalScore::Available {
        value: rescaled_similarity(&resume.vector, &job.vector).clamp(0.0, 1.0),
    }
}
