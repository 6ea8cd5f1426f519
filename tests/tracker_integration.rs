//! End-to-end tests against a dummy tracker
//!
//! A minimal axum server stands in for Redmine: `POST /issues.json` records
//! the ticket and answers 201 "OK", every other path answers 404.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use redmine_ticket_sink::config::{OutputConfig, RedmineConfig, Settings};
use redmine_ticket_sink::output::{FailurePolicy, LogEntry, OutputError, RedmineOutput};
use redmine_ticket_sink::server::{create_app, AppState};
use redmine_ticket_sink::ticket::{Record, TicketSubmitter};

#[derive(Debug, Clone)]
struct ReceivedTicket {
    api_key: Option<String>,
    content_type: Option<String>,
    body: Value,
}

type Tickets = Arc<Mutex<Vec<ReceivedTicket>>>;

struct DummyRedmine {
    addr: SocketAddr,
    tickets: Tickets,
}

impl DummyRedmine {
    async fn boot() -> Self {
        let tickets: Tickets = Arc::new(Mutex::new(Vec::new()));

        let app = Router::new()
            .route("/issues.json", post(create_issue))
            .fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") })
            .with_state(tickets.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, tickets }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn tickets(&self) -> Vec<ReceivedTicket> {
        self.tickets.lock().unwrap().clone()
    }
}

async fn create_issue(
    State(tickets): State<Tickets>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, &'static str) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    tickets.lock().unwrap().push(ReceivedTicket {
        api_key: header("x-redmine-api-key"),
        content_type: header("content-type"),
        body: serde_json::from_str(&body).unwrap(),
    });

    (StatusCode::CREATED, "OK")
}

fn config_default(url: String) -> RedmineConfig {
    RedmineConfig {
        url: Some(url),
        api_key: Some("test-api-key".to_string()),
        tag_key: "test".to_string(),
        project_id: Some("1".to_string()),
        tracker_id: Some(2),
        priority_id: Some(3),
        category_id: Some(4),
        subject: "awesome".to_string(),
        description: "this is description %{d1} - %{d2} - %{d3}".to_string(),
        ..RedmineConfig::default()
    }
}

fn config_to_format(url: String) -> RedmineConfig {
    RedmineConfig {
        url: Some(url),
        api_key: Some("test-api-key".to_string()),
        project_id: Some("1".to_string()),
        tracker_id: Some(2),
        priority_id: Some(3),
        subject: "%{tag}: awesome %{name}, %{age}, %{message}, unknown:%{unknown}".to_string(),
        description:
            "%{tag}: this is description %{name}, %{age}, %{message}, unknown:%{unknown}"
                .to_string(),
        ..RedmineConfig::default()
    }
}

fn output(config: &RedmineConfig, on_failure: FailurePolicy) -> RedmineOutput {
    let submitter = TicketSubmitter::new(config).unwrap();
    RedmineOutput::new(config, on_failure, submitter)
}

fn john() -> Record {
    match json!({
        "name": "John",
        "age": 25,
        "message": "this is message!"
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_feed() {
    let redmine = DummyRedmine::boot().await;
    let out = output(&config_to_format(redmine.url()), FailurePolicy::Abort);

    let report = out.write(&[LogEntry::new("test", john())]).await.unwrap();
    assert_eq!(report.created, 1);

    let tickets = redmine.tickets();
    assert_eq!(tickets.len(), 1);

    let ticket = &tickets[0];
    assert_eq!(ticket.api_key.as_deref(), Some("test-api-key"));
    assert_eq!(ticket.content_type.as_deref(), Some("application/json"));

    let issue = &ticket.body["issue"];
    assert_eq!(issue["project_id"], "1");
    assert_eq!(issue["tracker_id"], 2);
    assert_eq!(issue["priority_id"], 3);
    assert_eq!(
        issue["subject"],
        "test: awesome John, 25, this is message!, unknown:"
    );
    assert_eq!(
        issue["description"],
        "test: this is description John, 25, this is message!, unknown:"
    );
}

#[tokio::test]
async fn test_feed_with_empty_record() {
    let redmine = DummyRedmine::boot().await;
    let out = output(&config_default(redmine.url()), FailurePolicy::Abort);

    out.write(&[LogEntry::new("app", Record::new())]).await.unwrap();

    let tickets = redmine.tickets();
    let issue = tickets[0].body["issue"].as_object().unwrap().clone();
    assert_eq!(issue["project_id"], "1");
    assert_eq!(issue["tracker_id"], 2);
    assert_eq!(issue["priority_id"], 3);
    assert_eq!(issue["category_id"], 4);
    assert_eq!(issue["subject"], "awesome");
    assert_eq!(issue["description"], "this is description  -  - ");
    assert!(!issue.contains_key("custom_fields"));
}

#[tokio::test]
async fn test_submit_returns_response_body() {
    let redmine = DummyRedmine::boot().await;
    let submitter = TicketSubmitter::new(&config_default(redmine.url())).unwrap();

    let payload = submitter
        .build_payload("subject", "description", &Record::new())
        .unwrap();
    let body = submitter.submit(&payload).await.unwrap();

    assert_eq!(body, "OK");
    assert_eq!(redmine.tickets().len(), 1);
}

#[tokio::test]
async fn test_not_found_is_rejected_with_status_and_body() {
    let redmine = DummyRedmine::boot().await;
    let config = config_default(format!("{}/missing", redmine.url()));
    let out = output(&config, FailurePolicy::Abort);

    let err = out
        .write(&[LogEntry::new("test", john()), LogEntry::new("test", john())])
        .await
        .unwrap_err();

    let OutputError::Submission {
        index,
        created,
        source,
    } = err;
    assert_eq!(index, 0);
    assert_eq!(created, 0);
    assert_eq!(source.kind(), "rejected");
    assert_eq!(source.status(), Some(404));
    assert_eq!(source.response_body(), Some("Not Found"));
    assert_eq!(source.url, format!("{}/missing/issues.json", redmine.url()));
    assert_eq!(source.subject, "awesome");

    assert!(redmine.tickets().is_empty());
}

#[tokio::test]
async fn test_connection_refused_is_transport_failure() {
    let config = config_default(format!("http://127.0.0.1:{}", unused_port()));
    let out = output(&config, FailurePolicy::Abort);

    let err = out
        .write_entry(&LogEntry::new("test", john()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "transport");
    assert_eq!(err.status(), None);
    assert_eq!(err.description, "this is description  -  - ");
}

#[tokio::test]
async fn test_concurrent_batches() {
    let redmine = DummyRedmine::boot().await;
    let out = Arc::new(output(&config_to_format(redmine.url()), FailurePolicy::Abort));

    let batches: Vec<Vec<LogEntry>> = (0..4)
        .map(|b| {
            (0..5)
                .map(|i| LogEntry::new(format!("batch{b}"), {
                    let mut record = john();
                    record.insert("name".to_string(), json!(format!("n{i}")));
                    record
                }))
                .collect()
        })
        .collect();

    let results = futures::future::join_all(batches.iter().map(|batch| {
        let out = out.clone();
        async move { out.write(batch).await }
    }))
    .await;

    for result in results {
        assert_eq!(result.unwrap().created, 5);
    }
    assert_eq!(redmine.tickets().len(), 20);
    assert_eq!(out.stats().snapshot().created, 20);
}

fn app_for(redmine_config: RedmineConfig, on_failure: FailurePolicy) -> Router {
    let settings = Settings {
        server: Default::default(),
        redmine: redmine_config,
        output: OutputConfig { on_failure },
        otel: Default::default(),
    };
    create_app(AppState::new(settings).unwrap())
}

async fn post_batch(app: Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/batches")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_api_batch_creates_tickets() {
    let redmine = DummyRedmine::boot().await;
    let app = app_for(config_to_format(redmine.url()), FailurePolicy::Abort);

    let (status, body) = post_batch(
        app,
        json!({"entries": [
            {"tag": "test", "time": "2024-01-01T00:00:00Z", "record": {"name": "John", "age": 25, "message": "hi"}},
            {"tag": "other", "record": {}}
        ]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 2);
    assert_eq!(body["failed"], json!([]));

    let tickets = redmine.tickets();
    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[0].body["issue"]["subject"], "test: awesome John, 25, hi, unknown:");
    assert_eq!(tickets[1].body["issue"]["subject"], "other: awesome , , , unknown:");
}

#[tokio::test]
async fn test_api_batch_accepts_epoch_time() {
    let redmine = DummyRedmine::boot().await;
    let app = app_for(config_to_format(redmine.url()), FailurePolicy::Abort);

    let (status, body) = post_batch(
        app,
        json!({"entries": [
            {"tag": "app", "time": 1700000000, "record": {}},
            {"tag": "app", "time": 1700000000.25, "record": {"name": "Jane"}}
        ]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 2);

    let tickets = redmine.tickets();
    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[0].body["issue"]["subject"], "app: awesome , , , unknown:");
    assert_eq!(tickets[1].body["issue"]["subject"], "app: awesome Jane, , , unknown:");
}

#[tokio::test]
async fn test_api_batch_failure_is_bad_gateway() {
    let redmine = DummyRedmine::boot().await;
    let config = config_default(format!("{}/missing", redmine.url()));
    let app = app_for(config, FailurePolicy::Abort);

    let (status, body) = post_batch(
        app,
        json!({"entries": [{"tag": "test", "record": {}}]}),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "TICKET_SUBMISSION_FAILED");
    assert_eq!(body["error"]["failed_index"], 0);
    assert_eq!(body["error"]["created"], 0);
}

#[tokio::test]
async fn test_api_batch_continue_reports_failures() {
    let redmine = DummyRedmine::boot().await;
    let config = RedmineConfig {
        priority_id_key: Some("prio".to_string()),
        ..config_default(redmine.url())
    };
    let app = app_for(config, FailurePolicy::Continue);

    let (status, body) = post_batch(
        app,
        json!({"entries": [
            {"tag": "a", "record": {"prio": "urgent"}},
            {"tag": "b", "record": {"prio": "7"}}
        ]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 1);
    assert_eq!(body["failed"][0]["index"], 0);
    assert_eq!(body["failed"][0]["kind"], "coercion");

    let tickets = redmine.tickets();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0].body["issue"]["priority_id"], 7);
}

#[tokio::test]
async fn test_health_endpoint() {
    let redmine = DummyRedmine::boot().await;
    let app = app_for(config_default(redmine.url()), FailurePolicy::Abort);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(
        body["tracker"]["issues_url"],
        format!("{}/issues.json", redmine.url())
    );
    assert_eq!(body["tracker"]["tls"], false);
}
