//! 1つの求人に対する複数履歴書の並列スクリーニング
//!
//! 履歴書ごとに独立したパイプラインを `JoinSet` 上で実行し、同時実行数は
//! `Semaphore` で制限する。キャンセルは `watch` チャネルで受け取り、
//! 未着手の履歴書だけを `Cancelled` にする（実行中のものは完走させる）。
//! 結果は完了順ではなく入力順に、履歴書 ID で並べ直して返す。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::{BatchConfig, ConfigError};
use crate::pipeline::{ScreeningOutcome, ScreeningPipeline, ScreeningRequest};
use crate::run_id;
use crate::scoring::Recommendation;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchJob {
    pub job_text: String,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub required_skills: Option<Vec<String>>,
    #[serde(default)]
    pub preferred_skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResume {
    /// 省略時は ULID を割り当てる
    #[serde(default)]
    pub resume_id: Option<String>,
    pub resume_text: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatchError {
    #[error("batch must contain at least one resume")]
    Empty,
    #[error("batch of {size} resumes exceeds the maximum of {max}")]
    TooLarge { size: usize, max: usize },
    #[error("duplicate resume_id: {0}")]
    DuplicateResumeId(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchItemOutcome {
    Completed(Box<ScreeningOutcome>),
    Failed { error: String, validation: bool },
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    pub resume_id: String,
    #[serde(flatten)]
    pub outcome: BatchItemOutcome,
}

/// 件数の集計（順位付けはしない）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub strong_match: usize,
    pub good_match: usize,
    pub weak_match: usize,
    pub no_match: usize,
}

impl BatchSummary {
    fn from_items(items: &[BatchItem]) -> Self {
        let mut summary = Self {
            total: items.len(),
            ..Default::default()
        };
        for item in items {
            match &item.outcome {
                BatchItemOutcome::Completed(outcome) => {
                    summary.completed += 1;
                    match outcome.result.recommendation {
                        Recommendation::StrongMatch => summary.strong_match += 1,
                        Recommendation::GoodMatch => summary.good_match += 1,
                        Recommendation::WeakMatch => summary.weak_match += 1,
                        Recommendation::NoMatch => summary.no_match += 1,
                    }
                }
                BatchItemOutcome::Failed { .. } => summary.failed += 1,
                BatchItemOutcome::Cancelled => summary.cancelled += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub batch_id: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub items: Vec<BatchItem>,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone)]
pub struct BatchScreener {
    pipeline: ScreeningPipeline,
    config: BatchConfig,
}

impl BatchScreener {
    pub fn new(pipeline: ScreeningPipeline, config: BatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { pipeline, config })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub async fn screen_batch(
        &self,
        job: BatchJob,
        resumes: Vec<BatchResume>,
        cancel: watch::Receiver<bool>,
    ) -> Result<BatchReport, BatchError> {
        if resumes.is_empty() {
            return Err(BatchError::Empty);
        }
        if resumes.len() > self.config.max_batch_size {
            return Err(BatchError::TooLarge {
                size: resumes.len(),
                max: self.config.max_batch_size,
            });
        }
        let ids = assign_resume_ids(&resumes)?;

        let batch_id = run_id::generate();
        let started_at = Utc::now();
        info!(
            batch_id = %batch_id,
            resumes = resumes.len(),
            max_concurrency = self.config.max_concurrency,
            "batch screening started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();
        for (resume_id, resume) in ids.iter().cloned().zip(resumes) {
            let request = ScreeningRequest {
                resume_text: resume.resume_text,
                job_text: job.job_text.clone(),
                job_title: job.job_title.clone(),
                required_skills: job.required_skills.clone(),
                preferred_skills: job.preferred_skills.clone(),
            };
            tasks.spawn(screen_one(
                self.pipeline.clone(),
                Arc::clone(&semaphore),
                cancel.clone(),
                resume_id,
                request,
            ));
        }

        let mut outcomes = HashMap::with_capacity(ids.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((resume_id, outcome)) => {
                    outcomes.insert(resume_id, outcome);
                }
                Err(err) => warn!(batch_id = %batch_id, error = %err, "batch task aborted"),
            }
        }

        let items: Vec<BatchItem> = ids
            .into_iter()
            .map(|resume_id| {
                let outcome = outcomes.remove(&resume_id).unwrap_or_else(|| BatchItemOutcome::Failed {
                    error: "screening task aborted".into(),
                    validation: false,
                });
                BatchItem { resume_id, outcome }
            })
            .collect();
        let summary = BatchSummary::from_items(&items);
        let finished_at = Utc::now();

        info!(
            batch_id = %batch_id,
            total = summary.total,
            completed = summary.completed,
            failed = summary.failed,
            cancelled = summary.cancelled,
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "batch screening finished"
        );

        Ok(BatchReport {
            batch_id,
            run_id: run_id::get().to_string(),
            started_at,
            finished_at,
            items,
            summary,
        })
    }
}

fn assign_resume_ids(resumes: &[BatchResume]) -> Result<Vec<String>, BatchError> {
    let mut seen = HashSet::with_capacity(resumes.len());
    let mut ids = Vec::with_capacity(resumes.len());
    for resume in resumes {
        let id = resume
            .resume_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(run_id::generate);
        if !seen.insert(id.clone()) {
            return Err(BatchError::DuplicateResumeId(id));
        }
        ids.push(id);
    }
    Ok(ids)
}

async fn screen_one(
    pipeline: ScreeningPipeline,
    semaphore: Arc<Semaphore>,
    mut cancel: watch::Receiver<bool>,
    resume_id: String,
    request: ScreeningRequest,
) -> (String, BatchItemOutcome) {
    let permit = tokio::select! {
        biased;
        _ = cancelled(&mut cancel) => None,
        permit = semaphore.acquire_owned() => permit.ok(),
    };
    let Some(_permit) = permit else {
        debug!(resume_id = %resume_id, "resume cancelled before start");
        return (resume_id, BatchItemOutcome::Cancelled);
    };
    if *cancel.borrow() {
        debug!(resume_id = %resume_id, "resume cancelled before start");
        return (resume_id, BatchItemOutcome::Cancelled);
    }

    let outcome = match pipeline.screen(request).await {
        Ok(outcome) => BatchItemOutcome::Completed(Box::new(outcome)),
        Err(err) => {
            warn!(resume_id = %resume_id, error = %err, "resume screening failed");
            BatchItemOutcome::Failed {
                validation: err.is_validation(),
                error: err.to_string(),
            }
        }
    };
    (resume_id, outcome)
}

/// キャンセルされるまで待つ。送信側が閉じたら永久に待つ。
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    let result = cancel.wait_for(|flag| *flag).await.map(|_| ());
    if result.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::embedding::{DocumentEmbedding, EmbedderConfig, EmbeddingError, EmbeddingProvider, HashEmbedder};
    use crate::pipeline::tests::{hash_pipeline, pipeline_with};

    const JOB: &str = "Requirements:\n- Python\n- SQL\nNice to have:\n- Docker\n";

    fn job() -> BatchJob {
        BatchJob {
            job_text: JOB.into(),
            ..Default::default()
        }
    }

    fn resume(id: Option<&str>, text: &str) -> BatchResume {
        BatchResume {
            resume_id: id.map(str::to_string),
            resume_text: text.into(),
        }
    }

    fn screener(pipeline: ScreeningPipeline, max_concurrency: usize) -> BatchScreener {
        BatchScreener::new(
            pipeline,
            BatchConfig {
                max_concurrency,
                max_batch_size: 5,
            },
        )
        .unwrap()
    }

    struct SlowEmbedder;

    impl EmbeddingProvider for SlowEmbedder {
        fn name(&self) -> &str {
            "slow"
        }
        fn version(&self) -> &str {
            "t"
        }
        fn dimension(&self) -> usize {
            300
        }
        fn embed(&self, text: &str) -> Result<DocumentEmbedding, EmbeddingError> {
            std::thread::sleep(Duration::from_millis(150));
            HashEmbedder::new(EmbedderConfig::default()).embed(text)
        }
    }

    #[tokio::test]
    async fn results_follow_input_order_with_summary() {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let resumes = vec![
            resume(Some("c-3"), "Data engineer writing Python and SQL pipelines, deploying with Docker."),
            resume(Some("a-1"), ""),
            resume(None, "Pastry chef crafting French desserts and wedding cakes for boutique hotels."),
        ];

        let report = screener(hash_pipeline(), 2)
            .screen_batch(job(), resumes, cancel_rx)
            .await
            .unwrap();

        let ids: Vec<_> = report.items.iter().map(|i| i.resume_id.as_str()).collect();
        assert_eq!(&ids[..2], &["c-3", "a-1"]);
        assert_eq!(ids[2].len(), 26);

        match &report.items[0].outcome {
            BatchItemOutcome::Completed(outcome) => {
                assert!(outcome.result.missing_skills.is_empty());
                assert_eq!(outcome.result.recommendation, Recommendation::StrongMatch);
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert!(matches!(
            report.items[1].outcome,
            BatchItemOutcome::Failed { validation: true, .. }
        ));
        assert_eq!(
            report.summary,
            BatchSummary {
                total: 3,
                completed: 2,
                failed: 1,
                cancelled: 0,
                strong_match: 1,
                good_match: 0,
                weak_match: 0,
                no_match: 1,
            }
        );
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn rejects_empty_oversized_and_duplicate_batches() {
        let screener = screener(hash_pipeline(), 2);
        let (_tx, rx) = watch::channel(false);

        let err = screener.screen_batch(job(), vec![], rx.clone()).await.unwrap_err();
        assert_eq!(err, BatchError::Empty);

        let many = (0..6).map(|i| resume(Some(format!("r{i}").as_str()), "Python")).collect();
        let err = screener.screen_batch(job(), many, rx.clone()).await.unwrap_err();
        assert_eq!(err, BatchError::TooLarge { size: 6, max: 5 });

        let dupes = vec![resume(Some("x"), "Python"), resume(Some(" x "), "SQL")];
        let err = screener.screen_batch(job(), dupes, rx).await.unwrap_err();
        assert_eq!(err, BatchError::DuplicateResumeId("x".into()));
    }

    #[tokio::test]
    async fn cancellation_before_start_cancels_everything() {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        cancel_tx.send(true).unwrap();

        let report = screener(hash_pipeline(), 2)
            .screen_batch(
                job(),
                vec![resume(Some("a"), "Python"), resume(Some("b"), "SQL")],
                cancel_rx,
            )
            .await
            .unwrap();

        assert_eq!(report.summary.cancelled, 2);
        assert!(report.items.iter().all(|i| i.outcome == BatchItemOutcome::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_keeps_in_flight_results() {
        let screener = screener(pipeline_with(Arc::new(SlowEmbedder)), 1);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = cancel_tx.send(true);
        });

        let resumes = vec![
            resume(Some("first"), "Python and SQL developer with years of analytics work."),
            resume(Some("second"), "Docker and Python engineer building internal tooling."),
            resume(Some("third"), "SQL analyst producing weekly dashboards for finance."),
        ];
        let report = screener.screen_batch(job(), resumes, cancel_rx).await.unwrap();

        assert_eq!(report.summary.completed, 1);
        assert_eq!(report.summary.cancelled, 2);
        let ids: Vec<_> = report.items.iter().map(|i| i.resume_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn item_serializes_with_status_tag() {
        let item = BatchItem {
            resume_id: "r1".into(),
            outcome: BatchItemOutcome::Failed {
                error: "invalid resume_text: must not be empty".into(),
                validation: true,
            },
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["resume_id"], "r1");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["validation"], true);

        let cancelled = BatchItem {
            resume_id: "r2".into(),
            outcome: BatchItemOutcome::Cancelled,
        };
        assert_eq!(
            serde_json::to_value(&cancelled).unwrap(),
            serde_json::json!({"resume_id": "r2", "status": "cancelled"})
        );
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = BatchScreener::new(
            hash_pipeline(),
            BatchConfig {
                max_concurrency: 0,
                max_batch_size: 5,
            },
        )
        .unwrap_err();
        assert_eq!(err, ConfigError::Zero { name: "max_concurrency" });
    }
}
