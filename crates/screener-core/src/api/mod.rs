//! HTTP API 向けのリクエスト/レスポンス DTO

pub mod screen_request;
pub mod screen_response;

pub use screen_request::{
    BatchRequest, CompareRequest, LearningPlanRequest, ScreenRequest, SkillsRequest,
};
pub use screen_response::{
    BatchItemResponse, BatchResponse, ComparedJobResponse, ComparisonResponse, MatchResponse,
    MatchedSkillDto, MissingSkillDto, ScreenResponse, ScreeningDetails, SkillsResponse,
};
