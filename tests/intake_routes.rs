//! Integration tests for the lead intake endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use playbook_funnel::error::LeadError;
use playbook_funnel::leads::{
    IntakeRouteState, LeadIntake, LeadRepository, LogNotifier, MemoryLeadRepository,
    SubmissionRecord, intake_routes,
};

/// Repository whose every write fails.
struct DownRepo;

#[async_trait]
impl LeadRepository for DownRepo {
    async fn insert_submission(&self, _record: &SubmissionRecord) -> Result<(), LeadError> {
        Err(LeadError::Save("connection refused".into()))
    }
    async fn mark_email_sent(&self, _id: Uuid) -> Result<(), LeadError> {
        Err(LeadError::Save("connection refused".into()))
    }
    async fn record_event(
        &self,
        _name: &str,
        _data: Value,
        _page_url: &str,
    ) -> Result<(), LeadError> {
        Err(LeadError::Event("connection refused".into()))
    }
}

fn app(repo: Arc<dyn LeadRepository>) -> Router {
    let intake = Arc::new(LeadIntake::new(repo, Arc::new(LogNotifier)));
    intake_routes(IntakeRouteState { intake })
}

fn submit_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/playbook-submit")
        .header("Content-Type", "application/json")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .header("user-agent", "integration-test")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn lead() -> Value {
    json!({
        "companyName": "Acme Inc",
        "websiteUrl": "acme.com",
        "ttmRevenue": "$1-5M",
        "currentGrowthRate": "20-50%",
        "targetGrowthRate": "50-75%",
        "biggestChallenge": "Long sales cycles",
        "contactEmail": "a@b.com"
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let resp = app(MemoryLeadRepository::new())
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(response_json(resp).await["status"], "ok");
}

#[tokio::test]
async fn submission_is_saved_and_acknowledged() {
    let repo = MemoryLeadRepository::new();
    let resp = app(repo.clone()).oneshot(submit_request(lead())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = response_json(resp).await;
    assert_eq!(body["success"], true);
    assert!(body["message"].as_str().is_some());

    let saved = repo.submissions().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(body["id"], saved[0].id.to_string());
    assert_eq!(saved[0].website_url, "https://acme.com");
    assert_eq!(saved[0].ip_address, "203.0.113.7");
    assert_eq!(saved[0].user_agent, "integration-test");
    assert!(saved[0].email_sent);

    let events = repo.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "playbook_submission");
}

#[tokio::test]
async fn save_failure_returns_500() {
    let resp = app(Arc::new(DownRepo))
        .oneshot(submit_request(lead()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = response_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"],
        "Failed to process submission. Please try again."
    );
    assert!(body.get("id").is_none());
}

#[tokio::test]
async fn http_submitter_posts_to_intake() {
    use playbook_funnel::leads::{HttpSubmitter, LeadSubmission, Submitter};

    let repo = MemoryLeadRepository::new();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(repo.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    let submission: LeadSubmission = serde_json::from_value(lead()).unwrap();
    let submitter = HttpSubmitter::new(format!("http://{addr}/api/playbook-submit"));
    let response = submitter.submit(&submission).await.unwrap();

    assert!(response.success);
    let saved = repo.submissions().await;
    assert_eq!(response.id, Some(saved[0].id.to_string()));
    assert_eq!(saved[0].contact_email, "a@b.com");
}

#[tokio::test]
async fn http_submitter_reports_non_json_errors_as_rejected() {
    use playbook_funnel::error::SubmissionError;
    use playbook_funnel::leads::{HttpSubmitter, LeadSubmission, Submitter};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(MemoryLeadRepository::new());
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    let submission: LeadSubmission = serde_json::from_value(lead()).unwrap();
    let submitter = HttpSubmitter::new(format!("http://{addr}/api/missing"));
    let err = submitter.submit(&submission).await.unwrap_err();
    assert!(matches!(err, SubmissionError::Rejected(_)));
}

#[tokio::test]
async fn malformed_bodies_get_json_failure() {
    let repo = MemoryLeadRepository::new();
    let mut missing_email = lead();
    missing_email.as_object_mut().unwrap().remove("contactEmail");
    let mut numeric_answer = lead();
    numeric_answer["ttmRevenue"] = json!(5);

    let bodies = [
        Body::from("not json"),
        Body::from(missing_email.to_string()),
        Body::from(numeric_answer.to_string()),
    ];
    for body in bodies {
        let req = Request::builder()
            .method("POST")
            .uri("/api/playbook-submit")
            .header("Content-Type", "application/json")
            .body(body)
            .unwrap();
        let resp = app(repo.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = response_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(
            body["error"],
            "Failed to process submission. Please try again."
        );
    }
    assert!(repo.submissions().await.is_empty());
}
