use serde::Deserialize;

use crate::batch::{BatchJob, BatchResume};
use crate::comparison::ComparisonJob;
use crate::learning::{Difficulty, LearningTarget};
use crate::pipeline::ScreeningRequest;

/// 履歴書 × 求人 1組の採点リクエスト
#[derive(Debug, Clone, Deserialize)]
pub struct ScreenRequest {
    pub resume_text: String,
    pub job_text: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub required_skills: Option<Vec<String>>,
    #[serde(default)]
    pub preferred_skills: Option<Vec<String>>,
    /// true ならトレース・ギャップ分析などの詳細も返す
    #[serde(default)]
    pub include_details: bool,
}

impl From<ScreenRequest> for ScreeningRequest {
    fn from(value: ScreenRequest) -> Self {
        Self {
            resume_text: value.resume_text,
            job_text: value.job_text,
            job_title: value.job_title,
            required_skills: value.required_skills,
            preferred_skills: value.preferred_skills,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkillsRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRequest {
    pub job: BatchJob,
    pub resumes: Vec<BatchResume>,
}

/// 1通の履歴書を 2〜5 件の求人と比較する
#[derive(Debug, Clone, Deserialize)]
pub struct CompareRequest {
    #[serde(default)]
    pub resume_id: Option<String>,
    pub resume_text: String,
    pub jobs: Vec<ComparisonJob>,
}

/// 学習プラン。不足スキルを直接渡すか、`screening` の採点結果の不足スキルから作る。
#[derive(Debug, Clone, Deserialize)]
pub struct LearningPlanRequest {
    #[serde(default)]
    pub missing_skills: Vec<LearningTarget>,
    #[serde(default)]
    pub screening: Option<ScreenRequest>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub max_skills: Option<usize>,
}
