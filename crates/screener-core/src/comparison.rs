//! 1通の履歴書を複数（2〜5件）の求人と突き合わせて比較する
//!
//! 求人ごとに通常のパイプラインを順に実行し、総合スコアの降順で並べる。
//! 並べるのは同じ候補者にとっての求人であって、候補者同士の順位付けはしない。

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::pipeline::{ScreeningError, ScreeningOutcome, ScreeningPipeline, ScreeningRequest};
use crate::run_id;

pub const MIN_COMPARE_JOBS: usize = 2;
pub const MAX_COMPARE_JOBS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonJob {
    /// 省略時は ULID を割り当てる
    #[serde(default)]
    pub job_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub company: Option<String>,
    pub job_text: String,
    #[serde(default)]
    pub required_skills: Option<Vec<String>>,
    #[serde(default)]
    pub preferred_skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComparisonError {
    #[error("at least {min} jobs are required for a comparison (got {got})")]
    TooFewJobs { min: usize, got: usize },
    #[error("at most {max} jobs can be compared at once (got {got})")]
    TooManyJobs { max: usize, got: usize },
    #[error("job #{index} is missing a title")]
    MissingTitle { index: usize },
    #[error("duplicate job_id: {0}")]
    DuplicateJobId(String),
    #[error(transparent)]
    Resume(#[from] ScreeningError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Completed(Box<ScreeningOutcome>),
    Failed { error: String, validation: bool },
}

impl ComparisonOutcome {
    fn score(&self) -> Option<f64> {
        match self {
            ComparisonOutcome::Completed(outcome) => Some(outcome.result.overall_score),
            ComparisonOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedJob {
    /// 1 始まり。失敗した求人は成功した求人の後ろに入力順で並ぶ。
    pub rank: usize,
    pub job_id: String,
    pub job_title: String,
    pub job_company: Option<String>,
    #[serde(flatten)]
    pub outcome: ComparisonOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestMatch {
    pub job_id: String,
    pub job_title: String,
    pub overall_score: f64,
    /// 2位とのスコア差（2位が採点できなかった場合は None）
    pub advantage_over_second: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobComparison {
    pub comparison_id: String,
    pub run_id: String,
    pub resume_id: Option<String>,
    pub compared_at: DateTime<Utc>,
    pub num_jobs_compared: usize,
    pub best_match: Option<BestMatch>,
    pub results: Vec<RankedJob>,
}

fn check_jobs(jobs: &[ComparisonJob]) -> Result<Vec<String>, ComparisonError> {
    if jobs.len() < MIN_COMPARE_JOBS {
        return Err(ComparisonError::TooFewJobs {
            min: MIN_COMPARE_JOBS,
            got: jobs.len(),
        });
    }
    if jobs.len() > MAX_COMPARE_JOBS {
        return Err(ComparisonError::TooManyJobs {
            max: MAX_COMPARE_JOBS,
            got: jobs.len(),
        });
    }

    let mut seen = HashSet::with_capacity(jobs.len());
    let mut ids = Vec::with_capacity(jobs.len());
    for (index, job) in jobs.iter().enumerate() {
        if job.title.trim().is_empty() {
            return Err(ComparisonError::MissingTitle { index });
        }
        let id = job
            .job_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(run_id::generate);
        if !seen.insert(id.clone()) {
            return Err(ComparisonError::DuplicateJobId(id));
        }
        ids.push(id);
    }
    Ok(ids)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

impl ScreeningPipeline {
    /// 履歴書の検証に失敗したら全体をエラーにし、個々の求人の失敗は結果に残す。
    pub async fn compare_jobs(
        &self,
        resume_id: Option<String>,
        resume_text: &str,
        jobs: Vec<ComparisonJob>,
    ) -> Result<JobComparison, ComparisonError> {
        let ids = check_jobs(&jobs)?;
        self.validate_text("resume_text", resume_text)?;

        let comparison_id = run_id::generate();
        info!(comparison_id = %comparison_id, jobs = jobs.len(), "job comparison started");

        let mut ranked = Vec::with_capacity(jobs.len());
        for (job_id, job) in ids.into_iter().zip(jobs) {
            let request = ScreeningRequest {
                resume_text: resume_text.to_string(),
                job_text: job.job_text,
                job_title: Some(job.title.clone()),
                required_skills: job.required_skills,
                preferred_skills: job.preferred_skills,
            };
            let outcome = match self.screen(request).await {
                Ok(outcome) => ComparisonOutcome::Completed(Box::new(outcome)),
                Err(err) => {
                    warn!(comparison_id = %comparison_id, job_id = %job_id, error = %err, "job screening failed");
                    ComparisonOutcome::Failed {
                        validation: err.is_validation(),
                        error: err.to_string(),
                    }
                }
            };
            ranked.push(RankedJob {
                rank: 0,
                job_id,
                job_title: job.title,
                job_company: job.company,
                outcome,
            });
        }

        // 安定ソート: 同点は入力順、失敗は末尾
        ranked.sort_by(|a, b| match (a.outcome.score(), b.outcome.score()) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        for (i, job) in ranked.iter_mut().enumerate() {
            job.rank = i + 1;
        }

        let best_match = ranked.first().and_then(|best| {
            let score = best.outcome.score()?;
            Some(BestMatch {
                job_id: best.job_id.clone(),
                job_title: best.job_title.clone(),
                overall_score: score,
                advantage_over_second: ranked
                    .get(1)
                    .and_then(|second| second.outcome.score())
                    .map(|second| round4(score - second)),
            })
        });

        info!(
            comparison_id = %comparison_id,
            best_job_id = best_match.as_ref().map(|b| b.job_id.as_str()).unwrap_or("none"),
            "job comparison finished"
        );

        Ok(JobComparison {
            comparison_id,
            run_id: run_id::get().to_string(),
            resume_id,
            compared_at: Utc::now(),
            num_jobs_compared: ranked.len(),
            best_match,
            results: ranked,
        })
    }
}
