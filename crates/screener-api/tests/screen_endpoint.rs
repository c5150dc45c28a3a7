use axum::{Router, body::Body, http::Request, http::StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const API_KEY: &str = "test-key";

fn app() -> Router {
    screener_api::create_router(screener_api::test_state(API_KEY))
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .header("x-api-key", API_KEY)
                .header("x-request-id", "req-test")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn screen_returns_match_result() {
    let (status, body) = post_json(
        app(),
        "/api/screen",
        json!({
            "resume_text": "Backend engineer with six years of Python and React, shipping customer facing web products.",
            "job_text": "Requirements:\n- Python\n- React\n- SQL\n",
            "job_title": "Full-stack Engineer",
            "include_details": true
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let matched: Vec<&str> = body["matched_skills"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["skill_name"].as_str().unwrap())
        .collect();
    assert_eq!(matched, vec!["Python", "React"]);
    assert_eq!(body["missing_skills"], json!([{"skill_name": "SQL", "category": "technical"}]));
    assert_eq!(body["job_title"], "Full-stack Engineer");
    assert!(body["explanation"].as_str().unwrap().contains("SQL"));
    assert_eq!(body["details"]["trace"][0], "received");
    assert_eq!(body["details"]["gap_analysis"]["required_missing"], json!(["SQL"]));
    let score = body["overall_score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score));
}

#[tokio::test]
async fn empty_job_text_is_a_validation_error() {
    let (status, body) = post_json(
        app(),
        "/api/screen",
        json!({"resume_text": "Python developer", "job_text": "  "}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert_eq!(body["request_id"], "req-test");
}

#[tokio::test]
async fn skills_endpoint_extracts_canonical_names() {
    let (status, body) = post_json(
        app(),
        "/api/skills",
        json!({"text": "Shipped k8s clusters on amazon web services with python3."}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["skills"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["skill_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["AWS", "Kubernetes", "Python"]);
    assert!(body["taxonomy_version"].is_string());
}

#[tokio::test]
async fn batch_keeps_input_order() {
    let (status, body) = post_json(
        app(),
        "/api/batch",
        json!({
            "job": {"job_text": "Must have: Python and SQL.\nDocker is a plus."},
            "resumes": [
                {"resume_id": "r-2", "resume_text": "SQL analyst building finance dashboards every week."},
                {"resume_id": "r-1", "resume_text": ""},
                {"resume_id": "r-3", "resume_text": "Python and SQL engineer running Docker in production."}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    let ids: Vec<&str> = items.iter().map(|i| i["resume_id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["r-2", "r-1", "r-3"]);
    assert_eq!(items[1]["status"], "failed");
    assert_eq!(items[2]["status"], "completed");
    assert_eq!(body["summary"]["total"], 3);
    assert_eq!(body["summary"]["failed"], 1);
    assert_eq!(body["batch_id"].as_str().unwrap().len(), 26);
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let (status, body) = post_json(
        app(),
        "/api/batch",
        json!({"job": {"job_text": "Python"}, "resumes": []}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn screen_details_include_keyword_gaps_and_suggestions() {
    let (status, body) = post_json(
        app(),
        "/api/screen",
        json!({
            "resume_text": "Backend engineer with six years of Python and React, shipping customer facing web products.",
            "job_text": "Requirements:\n- Python\n- React\n- SQL\n",
            "include_details": true
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let keywords = &body["details"]["keyword_analysis"];
    assert_eq!(keywords["missing_keywords"], json!(["requirements"]));
    assert!(keywords["overlap_ratio"].as_f64().unwrap() > 0.0);
    assert!(
        body["explanation"]
            .as_str()
            .unwrap()
            .ends_with("Job terms not found in the resume: requirements.")
    );
    let suggestions = body["details"]["improvements"]["suggestions"].as_array().unwrap();
    assert_eq!(suggestions[0]["category"], "missing_critical_skills");
    assert_eq!(suggestions[0]["priority"], "high");
    assert_eq!(suggestions[0]["title"], "Add critical skills: SQL");
}

#[tokio::test]
async fn symbol_only_resume_is_a_validation_error() {
    let (status, body) = post_json(
        app(),
        "/api/screen",
        json!({"resume_text": "---- **** !!!! ////", "job_text": "Requirements:\n- Python\n"}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    assert_eq!(body["message"], "invalid resume_text: contains no extractable text");
}

#[tokio::test]
async fn compare_ranks_jobs_for_one_resume() {
    let (status, body) = post_json(
        app(),
        "/api/compare",
        json!({
            "resume_id": "cand-7",
            "resume_text": "Backend engineer with Python, SQL and Docker experience running data services.",
            "jobs": [
                {"job_id": "fe", "title": "Frontend Engineer", "company": "Acme", "job_text": "Requirements:\n- React\n- TypeScript\n- Figma\n"},
                {"job_id": "be", "title": "Backend Engineer", "job_text": "Requirements:\n- Python\n- SQL\n- Docker\n"},
                {"job_id": "bad", "title": "Blank Posting", "job_text": " "}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r["job_id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["be", "fe", "bad"]);
    assert_eq!(results[0]["rank"], 1);
    assert_eq!(results[0]["status"], "completed");
    assert_eq!(results[1]["job_company"], "Acme");
    assert_eq!(results[2]["status"], "failed");
    assert_eq!(body["best_match"]["job_id"], "be");
    assert!(body["best_match"]["advantage_over_second"].as_f64().unwrap() >= 0.0);
    assert_eq!(body["resume_id"], "cand-7");
    assert_eq!(body["num_jobs_compared"], 3);
}

#[tokio::test]
async fn compare_needs_at_least_two_jobs() {
    let (status, body) = post_json(
        app(),
        "/api/compare",
        json!({
            "resume_text": "Python engineer",
            "jobs": [{"title": "Only One", "job_text": "Python"}]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
    assert!(body["message"].as_str().unwrap().contains("at least 2 jobs"));
}

#[tokio::test]
async fn learning_plan_from_missing_skills_uses_search_links_without_a_catalog() {
    let (status, body) = post_json(
        app(),
        "/api/learning-plan",
        json!({
            "missing_skills": [
                {"skill_name": "Docker", "priority": "preferred"},
                {"skill_name": "Machine Learning"}
            ]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let skills = body["skills"].as_array().unwrap();
    assert_eq!(skills[0]["skill_name"], "Machine Learning");
    assert_eq!(skills[0]["priority"], "critical");
    let course = &skills[0]["recommended_courses"][0];
    assert_eq!(course["is_fallback"], true);
    assert_eq!(
        course["url"],
        "https://www.youtube.com/results?search_query=Machine%20Learning+tutorial"
    );
    assert_eq!(body["total_skills_to_learn"], 2);
    assert_eq!(body["milestones"][1]["month"], 2);
}

#[tokio::test]
async fn learning_plan_from_screening_targets_the_gaps() {
    let (status, body) = post_json(
        app(),
        "/api/learning-plan",
        json!({
            "screening": {
                "resume_text": "Backend engineer with six years of Python, shipping web products.",
                "job_text": "Requirements:\n- Python\n- SQL\nNice to have:\n- Docker\n"
            },
            "max_skills": 5
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let skills: Vec<(&str, &str)> = body["skills"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| (s["skill_name"].as_str().unwrap(), s["priority"].as_str().unwrap()))
        .collect();
    assert_eq!(skills, vec![("SQL", "critical"), ("Docker", "preferred")]);
}

#[tokio::test]
async fn learning_plan_requires_skills_or_screening() {
    let (status, body) = post_json(app(), "/api/learning-plan", json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");

    let (status, _) = post_json(
        app(),
        "/api/learning-plan",
        json!({"missing_skills": [{"skill_name": "SQL"}], "max_skills": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
