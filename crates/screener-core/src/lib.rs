//! 履歴書と求人票のスキル一致度・意味類似度による適合判定
//!
//! タクソノミーと埋め込みプロバイダは起動時に一度だけ構築し、
//! `ScreeningPipeline` に注入して全リクエストで共有する。

pub mod api;
pub mod batch;
pub mod comparison;
pub mod config;
pub mod embedding;
pub mod explain;
pub mod extraction;
pub mod improvement;
pub mod keywords;
pub mod learning;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod run_id;
pub mod scoring;
pub mod taxonomy;

pub use batch::{BatchError, BatchJob, BatchReport, BatchResume, BatchScreener};
pub use comparison::{ComparisonError, ComparisonJob, JobComparison};
pub use config::{BatchConfig, ConfigError, ScreeningConfig};
pub use embedding::{EmbedderConfig, EmbeddingError, EmbeddingProvider, create_embedder};
pub use explain::{MatchExplainer, SkillGapAnalysis, gap_analysis};
pub use extraction::{JobSkills, SkillExtractor, SkillRecord, SkillSet};
pub use improvement::{ImprovementReport, ImprovementSuggestion};
pub use keywords::{KeywordAnalysis, analyze_keywords, compare_keyword_overlap, extract_keywords};
pub use learning::{LearningCatalog, LearningCatalogError, LearningOptions, LearningPlan, build_learning_plan};
pub use pipeline::{
    MatchResult, PipelineStage, ScreeningError, ScreeningOutcome, ScreeningPipeline,
    ScreeningRequest,
};
pub use scoring::{Recommendation, ScoreBreakdown, SimilarityScorer};
pub use taxonomy::{SkillTaxonomy, TaxonomyError};
