use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::batch::{BatchItem, BatchItemOutcome, BatchReport, BatchSummary};
use crate::comparison::{BestMatch, ComparisonOutcome, JobComparison, RankedJob};
use crate::embedding::ProviderInfo;
use crate::explain::{MissingSkill, SkillGapAnalysis};
use crate::extraction::{SkillRecord, SkillSet};
use crate::improvement::ImprovementReport;
use crate::keywords::KeywordAnalysis;
use crate::pipeline::{MatchResult, PipelineStage, ScreeningOutcome};
use crate::scoring::{Recommendation, ScoreBreakdown};
use crate::taxonomy::SkillCategory;

/// 一致スキル（外部公開用）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedSkillDto {
    pub skill_name: String,
    pub category: SkillCategory,
    pub confidence: f64,
}

impl From<&SkillRecord> for MatchedSkillDto {
    fn from(value: &SkillRecord) -> Self {
        Self {
            skill_name: value.skill_name.clone(),
            category: value.category,
            confidence: value.confidence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingSkillDto {
    pub skill_name: String,
    pub category: SkillCategory,
}

impl From<&MissingSkill> for MissingSkillDto {
    fn from(value: &MissingSkill) -> Self {
        Self {
            skill_name: value.skill_name.clone(),
            category: value.category,
        }
    }
}

/// 採点結果レスポンス
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResponse {
    /// 総合スコア（0.0〜1.0）
    pub overall_score: f64,
    pub recommendation: Recommendation,
    pub matched_skills: Vec<MatchedSkillDto>,
    /// 重要度の高い順
    pub missing_skills: Vec<MissingSkillDto>,
    pub explanation: String,
    pub taxonomy_version: String,
    pub score_breakdown: ScoreBreakdown,
}

impl From<&MatchResult> for MatchResponse {
    fn from(value: &MatchResult) -> Self {
        Self {
            overall_score: value.overall_score,
            recommendation: value.recommendation,
            matched_skills: value.matched_skills.iter().map(MatchedSkillDto::from).collect(),
            missing_skills: value.missing_skills.iter().map(MissingSkillDto::from).collect(),
            explanation: value.explanation.clone(),
            taxonomy_version: value.taxonomy_version.clone(),
            score_breakdown: value.score_breakdown.clone(),
        }
    }
}

/// 監査用の詳細（`include_details` 指定時のみ）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningDetails {
    pub trace: Vec<PipelineStage>,
    pub embedding_provider: Option<ProviderInfo>,
    pub resume_skills: Vec<SkillRecord>,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub missing_preferred: Vec<MissingSkillDto>,
    pub gap_analysis: SkillGapAnalysis,
    pub unrecognized_skills: Vec<String>,
    pub keyword_analysis: KeywordAnalysis,
    pub improvements: ImprovementReport,
}

impl From<&ScreeningOutcome> for ScreeningDetails {
    fn from(value: &ScreeningOutcome) -> Self {
        Self {
            trace: value.trace.clone(),
            embedding_provider: value.embedding_provider.clone(),
            resume_skills: value.resume_skills.iter().cloned().collect(),
            required_skills: value.job_skills.required.names().map(str::to_string).collect(),
            preferred_skills: value.job_skills.preferred.names().map(str::to_string).collect(),
            missing_preferred: value.missing_preferred.iter().map(MissingSkillDto::from).collect(),
            gap_analysis: value.gap_analysis.clone(),
            unrecognized_skills: value.unrecognized_skills.clone(),
            keyword_analysis: value.keyword_analysis.clone(),
            improvements: value.improvements.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenResponse {
    #[serde(flatten)]
    pub result: MatchResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ScreeningDetails>,
    pub run_id: String,
    pub screened_at: DateTime<Utc>,
}

impl ScreenResponse {
    pub fn from_outcome(
        outcome: &ScreeningOutcome,
        include_details: bool,
        run_id: &str,
        screened_at: DateTime<Utc>,
    ) -> Self {
        Self {
            result: MatchResponse::from(&outcome.result),
            job_title: outcome.job_title.clone(),
            details: include_details.then(|| ScreeningDetails::from(outcome)),
            run_id: run_id.to_string(),
            screened_at,
        }
    }
}

/// `/api/skills` のレスポンス
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillsResponse {
    pub taxonomy_version: String,
    pub skills: Vec<SkillRecord>,
}

impl From<&SkillSet> for SkillsResponse {
    fn from(value: &SkillSet) -> Self {
        Self {
            taxonomy_version: value.taxonomy_version().to_string(),
            skills: value.iter().cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemResponse {
    pub resume_id: String,
    /// "completed" / "failed" / "cancelled"
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&BatchItem> for BatchItemResponse {
    fn from(value: &BatchItem) -> Self {
        let (status, result, error) = match &value.outcome {
            BatchItemOutcome::Completed(outcome) => {
                ("completed", Some(MatchResponse::from(&outcome.result)), None)
            }
            BatchItemOutcome::Failed { error, .. } => ("failed", None, Some(error.clone())),
            BatchItemOutcome::Cancelled => ("cancelled", None, None),
        };
        Self {
            resume_id: value.resume_id.clone(),
            status,
            result,
            error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResponse {
    pub batch_id: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: BatchSummary,
    pub items: Vec<BatchItemResponse>,
}

impl From<&BatchReport> for BatchResponse {
    fn from(value: &BatchReport) -> Self {
        Self {
            batch_id: value.batch_id.clone(),
            run_id: value.run_id.clone(),
            started_at: value.started_at,
            finished_at: value.finished_at,
            summary: value.summary.clone(),
            items: value.items.iter().map(BatchItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparedJobResponse {
    pub rank: usize,
    pub job_id: String,
    pub job_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_company: Option<String>,
    /// "completed" / "failed"
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&RankedJob> for ComparedJobResponse {
    fn from(value: &RankedJob) -> Self {
        let (status, result, error) = match &value.outcome {
            ComparisonOutcome::Completed(outcome) => {
                ("completed", Some(MatchResponse::from(&outcome.result)), None)
            }
            ComparisonOutcome::Failed { error, .. } => ("failed", None, Some(error.clone())),
        };
        Self {
            rank: value.rank,
            job_id: value.job_id.clone(),
            job_title: value.job_title.clone(),
            job_company: value.job_company.clone(),
            status,
            result,
            error,
        }
    }
}

/// `/api/compare` のレスポンス（スコア降順）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResponse {
    pub comparison_id: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_id: Option<String>,
    pub compared_at: DateTime<Utc>,
    pub num_jobs_compared: usize,
    pub best_match: Option<BestMatch>,
    pub results: Vec<ComparedJobResponse>,
}

impl From<&JobComparison> for ComparisonResponse {
    fn from(value: &JobComparison) -> Self {
        Self {
            comparison_id: value.comparison_id.clone(),
            run_id: value.run_id.clone(),
            resume_id: value.resume_id.clone(),
            compared_at: value.compared_at,
            num_jobs_compared: value.num_jobs_compared,
            best_match: value.best_match.clone(),
            results: value.results.iter().map(ComparedJobResponse::from).collect(),
        }
    }
}
