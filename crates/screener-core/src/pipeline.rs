//! 履歴書 × 求人 1組のスクリーニングパイプライン
//!
//! `Received → SkillsExtracted → Vectorized → Scored → Explained → Completed`
//! 埋め込みが失敗・タイムアウトした場合は `Degraded` を経由してスキルのみで採点する。
//! 各ステージは前段の出力と共有設定（タクソノミー・埋め込み器・設定値）だけから決まる。

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, ScreeningConfig};
use crate::embedding::{DocumentEmbedding, EmbeddingError, EmbeddingProvider, ProviderInfo};
use crate::explain::{MatchExplainer, MissingSkill, SkillGapAnalysis, gap_analysis};
use crate::extraction::{JobSkills, SkillExtractor, SkillRecord, SkillSet, extract_job_skills};
use crate::improvement::{ImprovementInputs, ImprovementReport, suggest_improvements};
use crate::keywords::{KeywordAnalysis, analyze_keywords};
use crate::normalize::tokenize;
use crate::scoring::{
    EmbeddingPair, Recommendation, ScoreBreakdown, ScoringInputs, SimilarityScorer,
    UnavailableReason,
};
use crate::taxonomy::SkillTaxonomy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreeningRequest {
    pub resume_text: String,
    pub job_text: String,
    #[serde(default)]
    pub job_title: Option<String>,
    /// 指定時は求人本文からの抽出の代わりに使う
    #[serde(default)]
    pub required_skills: Option<Vec<String>>,
    #[serde(default)]
    pub preferred_skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PipelineStage {
    Received,
    SkillsExtracted,
    Vectorized,
    Degraded,
    Scored,
    Explained,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScreeningError {
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },
    #[error("screening failed at stage {}: {message}", .stage.as_ref())]
    Stage {
        stage: PipelineStage,
        message: String,
    },
}

impl ScreeningError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ScreeningError::Validation { .. })
    }

    /// 失敗した時点のステージ（入力検証の失敗は `Received`）
    pub fn stage(&self) -> PipelineStage {
        match self {
            ScreeningError::Validation { .. } => PipelineStage::Received,
            ScreeningError::Stage { stage, .. } => *stage,
        }
    }
}

/// 1組分の採点結果（同じ入力・設定なら直列化結果まで一致する）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub overall_score: f64,
    pub recommendation: Recommendation,
    pub matched_skills: Vec<SkillRecord>,
    pub missing_skills: Vec<MissingSkill>,
    pub explanation: String,
    pub taxonomy_version: String,
    pub score_breakdown: ScoreBreakdown,
}

/// `MatchResult` と監査用の付帯情報
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningOutcome {
    pub result: MatchResult,
    pub trace: Vec<PipelineStage>,
    /// 意味類似度に使った埋め込みのプロバイダ（劣化時は None）
    pub embedding_provider: Option<ProviderInfo>,
    pub resume_skills: SkillSet,
    pub job_skills: JobSkills,
    pub missing_preferred: Vec<MissingSkill>,
    pub gap_analysis: SkillGapAnalysis,
    /// 明示指定されたがタクソノミーにないスキル名
    pub unrecognized_skills: Vec<String>,
    pub job_title: Option<String>,
    /// タクソノミー外の語の重なりと不足キーワード
    pub keyword_analysis: KeywordAnalysis,
    pub improvements: ImprovementReport,
}

enum Vectorization {
    Ready {
        resume: DocumentEmbedding,
        job: DocumentEmbedding,
    },
    Degraded(UnavailableReason),
}

/// タクソノミー・埋め込み器・設定を `Arc` で共有するパイプライン（clone は安価）
#[derive(Clone)]
pub struct ScreeningPipeline {
    taxonomy: Arc<SkillTaxonomy>,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: Arc<SkillExtractor>,
    config: Arc<ScreeningConfig>,
    scorer: SimilarityScorer,
    explainer: MatchExplainer,
    /// タイムアウトで見放した埋め込み計算もこの枠を持ち続ける
    embedding_slots: Arc<Semaphore>,
}

impl std::fmt::Debug for ScreeningPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScreeningPipeline")
            .field("taxonomy_version", &self.taxonomy.version())
            .field("embedder", &self.embedder.name())
            .field("config", &self.config)
            .finish()
    }
}

impl ScreeningPipeline {
    pub fn new(
        taxonomy: Arc<SkillTaxonomy>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: ScreeningConfig,
    ) -> Result<Self, ConfigError> {
        Self::with_extractor(taxonomy, embedder, SkillExtractor::default(), config)
    }

    pub fn with_extractor(
        taxonomy: Arc<SkillTaxonomy>,
        embedder: Arc<dyn EmbeddingProvider>,
        extractor: SkillExtractor,
        config: ScreeningConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let explainer = MatchExplainer::new(config.max_missing_in_narrative);
        let embedding_slots = Arc::new(Semaphore::new(config.max_embedding_tasks));
        Ok(Self {
            taxonomy,
            embedder,
            extractor: Arc::new(extractor),
            config: Arc::new(config),
            scorer: SimilarityScorer,
            explainer,
            embedding_slots,
        })
    }

    pub fn taxonomy(&self) -> &SkillTaxonomy {
        &self.taxonomy
    }

    pub fn embedder(&self) -> &dyn EmbeddingProvider {
        self.embedder.as_ref()
    }

    pub fn config(&self) -> &ScreeningConfig {
        &self.config
    }

    /// 単一テキストのスキル抽出
    pub fn extract_skills(&self, text: &str) -> SkillSet {
        self.extractor.extract(text, &self.taxonomy)
    }

    pub fn validate_text(&self, field: &'static str, text: &str) -> Result<(), ScreeningError> {
        if text.trim().is_empty() {
            return Err(ScreeningError::Validation {
                field,
                message: "must not be empty".into(),
            });
        }
        let chars = text.chars().count();
        if chars > self.config.max_text_chars {
            return Err(ScreeningError::Validation {
                field,
                message: format!(
                    "length {chars} exceeds the maximum of {} characters",
                    self.config.max_text_chars
                ),
            });
        }
        if tokenize(text).is_empty() {
            return Err(ScreeningError::Validation {
                field,
                message: "contains no extractable text".into(),
            });
        }
        Ok(())
    }

    pub fn validate_request(&self, request: &ScreeningRequest) -> Result<(), ScreeningError> {
        self.validate_text("resume_text", &request.resume_text)?;
        self.validate_text("job_text", &request.job_text)
    }

    /// 求人スキル（明示指定があればそれを解決、なければ本文から抽出）
    pub fn job_skills(&self, request: &ScreeningRequest) -> (JobSkills, Vec<String>) {
        if request.required_skills.is_none() && request.preferred_skills.is_none() {
            let skills = extract_job_skills(&request.job_text, &self.taxonomy, &self.extractor);
            return (skills, Vec::new());
        }
        JobSkills::from_names(
            request.required_skills.as_deref().unwrap_or_default(),
            request.preferred_skills.as_deref().unwrap_or_default(),
            &self.taxonomy,
        )
    }

    pub async fn screen(&self, request: ScreeningRequest) -> Result<ScreeningOutcome, ScreeningError> {
        let mut trace = vec![PipelineStage::Received];
        if let Err(err) = self.validate_request(&request) {
            trace.push(PipelineStage::Failed);
            warn!(error = %err, trace = ?trace, "screening rejected");
            return Err(err);
        }

        let resume_skills = self.extract_skills(&request.resume_text);
        let (job_skills, unrecognized_skills) = self.job_skills(&request);
        trace.push(PipelineStage::SkillsExtracted);
        debug!(
            resume_skills = resume_skills.len(),
            required = job_skills.required.len(),
            preferred = job_skills.preferred.len(),
            unrecognized = unrecognized_skills.len(),
            "skills extracted"
        );

        let vectorization = match self.vectorize(&request.resume_text, &request.job_text).await {
            Ok(v) => v,
            Err(err) => {
                trace.push(PipelineStage::Failed);
                error!(error = %err, trace = ?trace, "screening failed");
                return Err(err);
            }
        };
        let (embeddings, embedding_provider) = match &vectorization {
            Vectorization::Ready { resume, job } => {
                trace.push(PipelineStage::Vectorized);
                (
                    EmbeddingPair::Available { resume, job },
                    Some(resume.provider.clone()),
                )
            }
            Vectorization::Degraded(reason) => {
                trace.push(PipelineStage::Degraded);
                (EmbeddingPair::Unavailable(*reason), None)
            }
        };

        let breakdown = self
            .scorer
            .score(
                ScoringInputs {
                    resume_skills: &resume_skills,
                    required_skills: &job_skills.required,
                    preferred_skills: &job_skills.preferred,
                    embeddings,
                },
                &self.config,
            )
            .map_err(|err| {
                trace.push(PipelineStage::Failed);
                error!(error = %err, trace = ?trace, "scoring configuration rejected");
                ScreeningError::Stage {
                    stage: PipelineStage::Scored,
                    message: err.to_string(),
                }
            })?;
        trace.push(PipelineStage::Scored);

        let mut explanation = self.explainer.explain(
            &breakdown,
            &resume_skills,
            &job_skills.required,
            &job_skills.preferred,
            &self.taxonomy,
        );
        let keyword_analysis = analyze_keywords(&request.resume_text, &request.job_text);
        if let Some(sentence) = self.explainer.keyword_sentence(&keyword_analysis) {
            explanation.narrative.push(' ');
            explanation.narrative.push_str(&sentence);
        }
        let improvements = suggest_improvements(&ImprovementInputs {
            resume_text: &request.resume_text,
            matched_skills: &explanation.matched_skills,
            missing_required: &explanation.missing_skills,
            missing_preferred: &explanation.missing_preferred,
            keywords: &keyword_analysis,
            recommendation: breakdown.recommendation,
        });
        trace.push(PipelineStage::Explained);
        debug!(
            missing_keywords = keyword_analysis.missing_keywords.len(),
            keyword_overlap = keyword_analysis.overlap_ratio,
            suggestions = improvements.suggestions.len(),
            "explanation built"
        );

        let gaps = gap_analysis(&resume_skills, &job_skills.required, &job_skills.preferred);

        let result = MatchResult {
            overall_score: breakdown.overall_score,
            recommendation: breakdown.recommendation,
            matched_skills: explanation.matched_skills,
            missing_skills: explanation.missing_skills,
            explanation: explanation.narrative,
            taxonomy_version: self.taxonomy.version().to_string(),
            score_breakdown: breakdown,
        };
        trace.push(PipelineStage::Completed);

        info!(
            overall_score = result.overall_score,
            recommendation = result.recommendation.as_ref(),
            dropped_signal = result.score_breakdown.dropped_signal.as_ref(),
            matched = result.matched_skills.len(),
            missing = result.missing_skills.len(),
            taxonomy_version = %result.taxonomy_version,
            "screening completed"
        );

        Ok(ScreeningOutcome {
            result,
            trace,
            embedding_provider,
            resume_skills,
            job_skills,
            missing_preferred: explanation.missing_preferred,
            gap_analysis: gaps,
            unrecognized_skills,
            job_title: request.job_title,
            keyword_analysis,
            improvements,
        })
    }

    /// 埋め込みはブロッキングスレッドで計算し、タイムアウトで打ち切る。
    /// 失敗・タイムアウトは劣化扱い、タスク自体の異常終了（panic）はステージ失敗。
    ///
    /// 打ち切った計算はスレッド上で走り続けるため、`max_embedding_tasks` 個の枠で
    /// 同時実行数を抑える。枠が期限内に空かなければタイムアウトと同じく劣化させる。
    async fn vectorize(&self, resume_text: &str, job_text: &str) -> Result<Vectorization, ScreeningError> {
        let deadline = tokio::time::Instant::now()
            + Duration::from_millis(self.config.embedding_timeout_ms);

        let slot = Arc::clone(&self.embedding_slots).acquire_owned();
        let permit = match tokio::time::timeout_at(deadline, slot).await {
            Err(_) => {
                warn!(
                    timeout_ms = self.config.embedding_timeout_ms,
                    max_embedding_tasks = self.config.max_embedding_tasks,
                    embedder = self.embedder.name(),
                    "no embedding slot freed before the deadline; scoring on skills only"
                );
                return Ok(Vectorization::Degraded(UnavailableReason::EmbeddingTimeout));
            }
            Ok(Err(closed)) => {
                return Err(ScreeningError::Stage {
                    stage: PipelineStage::Vectorized,
                    message: format!("embedding slots unavailable: {closed}"),
                });
            }
            Ok(Ok(permit)) => permit,
        };

        let embedder = Arc::clone(&self.embedder);
        let resume_text = resume_text.to_string();
        let job_text = job_text.to_string();

        let task = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let resume = embedder.embed(&resume_text)?;
            let job = embedder.embed(&job_text)?;
            Ok::<_, EmbeddingError>((resume, job))
        });

        match tokio::time::timeout_at(deadline, task).await {
            Err(_) => {
                warn!(
                    timeout_ms = self.config.embedding_timeout_ms,
                    embedder = self.embedder.name(),
                    "embedding timed out; scoring on skills only"
                );
                Ok(Vectorization::Degraded(UnavailableReason::EmbeddingTimeout))
            }
            Ok(Err(join_err)) => Err(ScreeningError::Stage {
                stage: PipelineStage::Vectorized,
                message: format!("embedding task failed: {join_err}"),
            }),
            Ok(Ok(Err(err))) => {
                warn!(
                    error = %err,
                    embedder = self.embedder.name(),
                    "embedding unavailable; scoring on skills only"
                );
                Ok(Vectorization::Degraded(UnavailableReason::EmbeddingUnavailable))
            }
            Ok(Ok(Ok((resume, job)))) => Ok(Vectorization::Ready { resume, job }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embedding::{DisabledEmbedder, EmbedderConfig, HashEmbedder};
    use crate::scoring::DroppedSignal;

    pub(crate) fn pipeline_with(embedder: Arc<dyn EmbeddingProvider>) -> ScreeningPipeline {
        ScreeningPipeline::new(
            Arc::new(SkillTaxonomy::builtin().unwrap()),
            embedder,
            ScreeningConfig::default(),
        )
        .unwrap()
    }

    pub(crate) fn hash_pipeline() -> ScreeningPipeline {
        pipeline_with(Arc::new(HashEmbedder::new(EmbedderConfig::default())))
    }

    fn request(resume: &str, job: &str) -> ScreeningRequest {
        ScreeningRequest {
            resume_text: resume.into(),
            job_text: job.into(),
            ..Default::default()
        }
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
            std::thread::sleep(Duration::from_millis(300));
            HashEmbedder::new(EmbedderConfig::default()).embed(text)
        }
    }

    /// 呼び出し回数を数える低速な埋め込み器
    #[derive(Default)]
    struct CountingSlowEmbedder {
        calls: std::sync::atomic::AtomicUsize,
    }

    impl EmbeddingProvider for CountingSlowEmbedder {
        fn name(&self) -> &str {
            "counting-slow"
        }
        fn version(&self) -> &str {
            "t"
        }
        fn dimension(&self) -> usize {
            300
        }
        fn embed(&self, text: &str) -> Result<DocumentEmbedding, EmbeddingError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            HashEmbedder::new(EmbedderConfig::default()).embed(text)
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;
        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    struct PanickingEmbedder;

    impl EmbeddingProvider for PanickingEmbedder {
        fn name(&self) -> &str {
            "panicking"
        }
        fn version(&self) -> &str {
            "t"
        }
        fn dimension(&self) -> usize {
            300
        }
        fn embed(&self, _text: &str) -> Result<DocumentEmbedding, EmbeddingError> {
            panic!("model weights corrupted");
        }
    }

    const RESUME: &str = "Software engineer with five years of Python and React experience building web products.";
    const JOB: &str = "We are hiring an engineer. Requirements: Python, React and SQL for our analytics web platform.";

    #[tokio::test]
    async fn explanation_lists_job_terms_and_suggestions() {
        let outcome = hash_pipeline().screen(request(RESUME, JOB)).await.unwrap();

        assert_eq!(
            outcome.keyword_analysis.missing_keywords,
            vec!["hiring", "requirements", "analytics", "platform"]
        );
        assert!(outcome.keyword_analysis.shared_keywords.contains(&"python".to_string()));
        assert!(
            outcome
                .result
                .explanation
                .ends_with("Job terms not found in the resume: hiring, requirements, analytics and 1 more."),
            "{}",
            outcome.result.explanation
        );

        let first = &outcome.improvements.suggestions[0];
        assert_eq!(first.title, "Add critical skills: SQL");
        assert!(
            outcome
                .improvements
                .suggestions
                .iter()
                .any(|s| s.title.starts_with("Use the job's wording: hiring"))
        );
    }

    #[tokio::test]
    async fn completes_with_full_trace() {
        let outcome = hash_pipeline().screen(request(RESUME, JOB)).await.unwrap();

        assert_eq!(
            outcome.trace,
            vec![
                PipelineStage::Received,
                PipelineStage::SkillsExtracted,
                PipelineStage::Vectorized,
                PipelineStage::Scored,
                PipelineStage::Explained,
                PipelineStage::Completed,
            ]
        );
        let matched: Vec<_> = outcome.result.matched_skills.iter().map(|r| r.skill_name.as_str()).collect();
        assert_eq!(matched, vec!["Python", "React"]);
        let missing: Vec<_> = outcome.result.missing_skills.iter().map(|m| m.skill_name.as_str()).collect();
        assert_eq!(missing, vec!["SQL"]);
        assert_eq!(outcome.embedding_provider.unwrap().name, "hash");
        assert!((0.0..=1.0).contains(&outcome.result.overall_score));
    }

    #[tokio::test]
    async fn disabled_embedder_degrades_to_skill_only() {
        let pipeline = pipeline_with(Arc::new(DisabledEmbedder::new(300)));

        let outcome = pipeline.screen(request(RESUME, JOB)).await.unwrap();

        let breakdown = &outcome.result.score_breakdown;
        assert!(outcome.trace.contains(&PipelineStage::Degraded));
        assert!(!outcome.trace.contains(&PipelineStage::Vectorized));
        assert_eq!(breakdown.dropped_signal, DroppedSignal::Semantic);
        assert_eq!(
            breakdown.semantic_score.unavailable_reason(),
            Some(UnavailableReason::EmbeddingUnavailable)
        );
        assert_eq!(Some(outcome.result.overall_score), breakdown.skill_score.value());
        assert!((outcome.result.overall_score - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(outcome.result.recommendation, Recommendation::GoodMatch);
        assert!(outcome.embedding_provider.is_none());
    }

    #[tokio::test]
    async fn slow_embedder_times_out_and_degrades() {
        let pipeline = ScreeningPipeline::new(
            Arc::new(SkillTaxonomy::builtin().unwrap()),
            Arc::new(SlowEmbedder),
            ScreeningConfig {
                embedding_timeout_ms: 20,
                ..Default::default()
            },
        )
        .unwrap();

        let outcome = pipeline.screen(request(RESUME, JOB)).await.unwrap();

        assert_eq!(
            outcome.result.score_breakdown.semantic_score.unavailable_reason(),
            Some(UnavailableReason::EmbeddingTimeout)
        );
        assert!(outcome.result.explanation.contains("timed out"));
    }

    #[tokio::test]
    async fn abandoned_embeddings_hold_their_slot_until_finished() {
        let embedder = Arc::new(CountingSlowEmbedder::default());
        let pipeline = ScreeningPipeline::new(
            Arc::new(SkillTaxonomy::builtin().unwrap()),
            embedder.clone(),
            ScreeningConfig {
                embedding_timeout_ms: 20,
                max_embedding_tasks: 1,
                ..Default::default()
            },
        )
        .unwrap();

        let first = pipeline.screen(request(RESUME, JOB)).await.unwrap();
        let second = pipeline.screen(request(RESUME, JOB)).await.unwrap();

        for outcome in [&first, &second] {
            assert_eq!(
                outcome.result.score_breakdown.semantic_score.unavailable_reason(),
                Some(UnavailableReason::EmbeddingTimeout)
            );
        }
        // 2件目は枠が空かず、新たな計算を始めていない
        assert_eq!(embedder.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_embedder_is_a_stage_failure() {
        let pipeline = pipeline_with(Arc::new(PanickingEmbedder));

        let err = pipeline.screen(request(RESUME, JOB)).await.unwrap_err();

        assert!(!err.is_validation());
        assert!(matches!(
            err,
            ScreeningError::Stage {
                stage: PipelineStage::Vectorized,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn empty_or_oversized_text_fails_validation() {
        let pipeline = hash_pipeline();

        let err = pipeline.screen(request(RESUME, "   \n")).await.unwrap_err();
        assert_eq!(
            err,
            ScreeningError::Validation {
                field: "job_text",
                message: "must not be empty".into()
            }
        );

        let err = pipeline.screen(request("", JOB)).await.unwrap_err();
        assert!(matches!(err, ScreeningError::Validation { field: "resume_text", .. }));

        let huge = "python ".repeat(10_000);
        let err = pipeline.screen(request(&huge, JOB)).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn symbol_only_text_fails_validation_instead_of_scoring_zero() {
        let pipeline = hash_pipeline();

        let err = pipeline
            .screen(request("---- **** !!!! ////", JOB))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ScreeningError::Validation {
                field: "resume_text",
                message: "contains no extractable text".into()
            }
        );
        assert!(pipeline.validate_text("job_text", "C++ / C#").is_ok());
    }

    #[tokio::test]
    async fn rejected_input_is_logged_with_failed_stage() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let err = hash_pipeline().screen(request(RESUME, "")).await.unwrap_err();

        assert_eq!(err.stage(), PipelineStage::Received);
        let output = logs.contents();
        assert!(output.contains("screening rejected"), "{output}");
        assert!(output.contains("[Received, Failed]"), "{output}");
        assert!(output.contains("invalid job_text"), "{output}");
    }

    #[tokio::test]
    async fn identical_inputs_serialize_identically() {
        let pipeline = hash_pipeline();

        let a = pipeline.screen(request(RESUME, JOB)).await.unwrap();
        let b = pipeline.screen(request(RESUME, JOB)).await.unwrap();

        assert_eq!(
            serde_json::to_string(&a.result).unwrap(),
            serde_json::to_string(&b.result).unwrap()
        );
    }

    #[tokio::test]
    async fn unrelated_documents_are_no_match() {
        let outcome = hash_pipeline()
            .screen(request(
                "Pastry chef specializing in French desserts, wedding cakes and chocolate sculptures for boutique hotels.",
                JOB,
            ))
            .await
            .unwrap();

        assert!(outcome.result.matched_skills.is_empty());
        assert_eq!(outcome.result.recommendation, Recommendation::NoMatch);
    }

    #[tokio::test]
    async fn explicit_skill_lists_override_job_text() {
        let outcome = hash_pipeline()
            .screen(ScreeningRequest {
                required_skills: Some(vec!["python".into(), "Underwater Welding".into()]),
                preferred_skills: Some(vec!["Docker".into()]),
                ..request(RESUME, JOB)
            })
            .await
            .unwrap();

        let required: Vec<_> = outcome.job_skills.required.names().collect();
        assert_eq!(required, vec!["Python"]);
        assert_eq!(outcome.unrecognized_skills, vec!["Underwater Welding".to_string()]);
        assert!(outcome.result.missing_skills.is_empty());
        assert_eq!(outcome.missing_preferred[0].skill_name, "Docker");
    }

    #[tokio::test]
    async fn job_without_skills_uses_semantic_only() {
        let outcome = hash_pipeline()
            .screen(request(
                RESUME,
                "We are looking for a motivated engineer to join our growing web products team.",
            ))
            .await
            .unwrap();

        let breakdown = &outcome.result.score_breakdown;
        assert_eq!(breakdown.dropped_signal, DroppedSignal::Skill);
        assert_eq!(
            breakdown.skill_score.unavailable_reason(),
            Some(UnavailableReason::NoJobSkills)
        );
        assert_eq!(Some(breakdown.overall_score), breakdown.semantic_score.value());
    }
}
