use backfill_engine::config::GitlabConfig;
use backfill_engine::gitlab::{ActivitySource, FetchError, GitlabClient};
use chrono::NaiveDate;
use mockito::{Matcher, Server};

const EVENTS_PATH: &str = "/api/v4/users/42/events";
const TOKEN: &str = "glpat-integration";

fn config(server: &Server) -> GitlabConfig {
    GitlabConfig {
        api_url: format!("{}/api/v4", server.url()),
        user_id: "42".into(),
        token: TOKEN.into(),
        timeout_secs: 5,
        max_retries: 2,
        retry_backoff_ms: 0,
    }
}

fn page_query(page: u32) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("page".into(), page.to_string()),
        Matcher::UrlEncoded("per_page".into(), "100".into()),
        Matcher::UrlEncoded("sort".into(), "asc".into()),
    ])
}

fn push_event(created_at: &str, commits: u64) -> String {
    format!(
        r#"{{"action_name":"pushed to","created_at":"{created_at}","push_data":{{"commit_count":{commits}}}}}"#
    )
}

#[tokio::test]
async fn pages_sequentially_until_first_empty_page() {
    let mut server = Server::new_async().await;

    let page1 = server
        .mock("GET", EVENTS_PATH)
        .match_query(page_query(1))
        .match_header("private-token", TOKEN)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            "[{},{}]",
            push_event("2024-01-01T09:00:00Z", 1),
            push_event("2024-01-01T10:00:00Z", 3)
        ))
        .expect(1)
        .create_async()
        .await;
    let page2 = server
        .mock("GET", EVENTS_PATH)
        .match_query(page_query(2))
        .match_header("private-token", TOKEN)
        .with_status(200)
        .with_body(format!("[{}]", push_event("2024-01-02T09:00:00Z", 1)))
        .expect(1)
        .create_async()
        .await;
    let page3 = server
        .mock("GET", EVENTS_PATH)
        .match_query(page_query(3))
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;
    let page4 = server
        .mock("GET", EVENTS_PATH)
        .match_query(page_query(4))
        .with_status(200)
        .with_body(format!("[{}]", push_event("2024-01-03T09:00:00Z", 1)))
        .expect(0)
        .create_async()
        .await;

    let client = GitlabClient::new(&config(&server)).expect("client should build");
    let events = client.fetch_all(None).await.expect("fetch should succeed");

    // Filtering is the pipeline's job; the client returns every event.
    assert_eq!(events.len(), 3);
    assert_eq!(events[2].created_at.to_rfc3339(), "2024-01-02T09:00:00+00:00");

    page1.assert_async().await;
    page2.assert_async().await;
    page3.assert_async().await;
    page4.assert_async().await;
}

#[tokio::test]
async fn bounded_fetch_sends_after_date() {
    let mut server = Server::new_async().await;
    let after = NaiveDate::from_ymd_opt(2024, 1, 8).expect("valid date");

    let bounded = server
        .mock("GET", EVENTS_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("after".into(), "2024-01-08".into()),
        ]))
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let client = GitlabClient::new(&config(&server)).expect("client should build");
    let events = client.fetch_events(Some(after)).await.expect("fetch should succeed");

    assert!(events.is_empty());
    bounded.assert_async().await;
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let mut server = Server::new_async().await;
    let denied = server
        .mock("GET", EVENTS_PATH)
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"message":"401 Unauthorized"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = GitlabClient::new(&config(&server)).expect("client should build");
    let error = client.fetch_all(None).await.expect_err("401 should fail");

    assert!(matches!(error, FetchError::Unauthorized { status: 401 }));
    denied.assert_async().await;
}

#[tokio::test]
async fn server_errors_are_retried_then_surfaced() {
    let mut server = Server::new_async().await;
    let unavailable = server
        .mock("GET", EVENTS_PATH)
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("maintenance")
        .expect(3)
        .create_async()
        .await;

    let client = GitlabClient::new(&config(&server)).expect("client should build");
    let error = client.fetch_all(None).await.expect_err("503 should fail");

    match error {
        FetchError::Status { page, status, body } => {
            assert_eq!(page, 1);
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    unavailable.assert_async().await;
}

#[tokio::test]
async fn rate_limited_page_recovers_and_paging_continues() {
    let mut server = Server::new_async().await;
    let mut cfg = config(&server);
    cfg.retry_backoff_ms = 500;

    let limited = server
        .mock("GET", EVENTS_PATH)
        .match_query(page_query(1))
        .with_status(429)
        .with_body("slow down")
        .expect(1)
        .create_async()
        .await;
    let page2 = server
        .mock("GET", EVENTS_PATH)
        .match_query(page_query(2))
        .with_status(200)
        .with_body(format!("[{}]", push_event("2024-01-02T09:00:00Z", 1)))
        .expect(1)
        .create_async()
        .await;
    let page3 = server
        .mock("GET", EVENTS_PATH)
        .match_query(page_query(3))
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let client = GitlabClient::new(&cfg).expect("client should build");

    // Swap the 429 for a healthy page while the client is backing off.
    let recover = async {
        while !limited.matched_async().await {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        limited.remove_async().await;
        server
            .mock("GET", EVENTS_PATH)
            .match_query(page_query(1))
            .with_status(200)
            .with_body(format!("[{}]", push_event("2024-01-01T09:00:00Z", 1)))
            .expect(1)
            .create_async()
            .await
    };
    let (events, page1) = tokio::join!(client.fetch_all(None), recover);

    let events = events.expect("fetch should recover after 429");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].created_at.to_rfc3339(), "2024-01-01T09:00:00+00:00");
    assert_eq!(events[1].created_at.to_rfc3339(), "2024-01-02T09:00:00+00:00");

    page1.assert_async().await;
    page2.assert_async().await;
    page3.assert_async().await;
}

#[tokio::test]
async fn non_list_body_fails_loudly() {
    let mut server = Server::new_async().await;
    let object = server
        .mock("GET", EVENTS_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"message":"404 User Not Found"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = GitlabClient::new(&config(&server)).expect("client should build");
    let error = client.fetch_all(None).await.expect_err("object body should fail");

    assert!(matches!(error, FetchError::MalformedResponse { page: 1, .. }));
    object.assert_async().await;
}

#[tokio::test]
async fn not_found_is_a_status_error() {
    let mut server = Server::new_async().await;
    let missing = server
        .mock("GET", EVENTS_PATH)
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"message":"404 User Not Found"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = GitlabClient::new(&config(&server)).expect("client should build");
    let error = client.fetch_all(None).await.expect_err("404 should fail");

    assert!(matches!(error, FetchError::Status { status: 404, .. }));
    assert!(!error.is_transient());
    missing.assert_async().await;
}
