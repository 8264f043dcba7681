//! Cloud print provider interface
//!
//! `CloudPrintApi` is the capability the gateway needs from the provider:
//! submit a job, list printers and list job history. `HttpCloudPrintApi`
//! talks to the real interface; `crate::OfflineCloudPrint` stands in for it
//! when no provider is reachable.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;
use crate::file::PrintFile;
use crate::ticket::PrintTicket;

/// Boxed future returned by API calls.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// A printer registered to the account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Printer {
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

/// One entry of the account's job history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobStatus {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Operations the gateway needs from the cloud print provider.
///
/// Uses `Pin<Box<dyn Future>>` return types so implementations can sit
/// behind `Arc<dyn CloudPrintApi>`.
pub trait CloudPrintApi: Send + Sync {
    /// Submit a document and return the provider's job id.
    fn submit<'a>(
        &'a self,
        token: &'a str,
        printer_id: &'a str,
        file: &'a PrintFile,
        ticket: &'a PrintTicket,
    ) -> ApiFuture<'a, String>;

    /// Printers registered to the account.
    fn search<'a>(&'a self, token: &'a str) -> ApiFuture<'a, Vec<Printer>>;

    /// The account's job history.
    fn jobs<'a>(&'a self, token: &'a str) -> ApiFuture<'a, Vec<JobStatus>>;
}

#[derive(Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    job: Option<SubmittedJob>,
}

#[derive(Deserialize)]
struct SubmittedJob {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    printers: Option<Vec<Printer>>,
}

#[derive(Deserialize)]
struct JobsResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    jobs: Option<Vec<JobStatus>>,
}

/// Cloud print interface over HTTPS with a bearer token.
pub struct HttpCloudPrintApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpCloudPrintApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("building HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            http,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        token: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        debug!(endpoint, "Calling cloud print");
        let response = self
            .http
            .post(self.url(endpoint))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("{endpoint} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(ApiError::Rejected(format!(
                "{endpoint} returned {status}: {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(format!("reading {endpoint} response: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Malformed(format!("invalid {endpoint} response: {e}")))
    }
}

fn rejected(endpoint: &str, message: Option<String>) -> ApiError {
    ApiError::Rejected(format!(
        "{endpoint} unsuccessful: {}",
        message.unwrap_or_else(|| "no message".into())
    ))
}

impl CloudPrintApi for HttpCloudPrintApi {
    fn submit<'a>(
        &'a self,
        token: &'a str,
        printer_id: &'a str,
        file: &'a PrintFile,
        ticket: &'a PrintTicket,
    ) -> ApiFuture<'a, String> {
        Box::pin(async move {
            let content = Part::bytes(file.content().to_vec())
                .file_name(file.file_name().to_owned())
                .mime_str(file.content_type())
                .map_err(|e| ApiError::Transport(format!("building upload: {e}")))?;
            let form = Form::new()
                .text("printerid", printer_id.to_owned())
                .text("title", file.file_name().to_owned())
                .text("ticket", ticket.to_string())
                .part("content", content);

            let response: SubmitResponse = self.call("submit", token, form).await?;
            if !response.success {
                return Err(rejected("submit", response.message));
            }
            response
                .job
                .and_then(|job| job.id)
                .ok_or_else(|| ApiError::Malformed("submit response has no job id".into()))
        })
    }

    fn search<'a>(&'a self, token: &'a str) -> ApiFuture<'a, Vec<Printer>> {
        Box::pin(async move {
            let response: SearchResponse = self.call("search", token, Form::new()).await?;
            if !response.success {
                return Err(rejected("search", response.message));
            }
            response
                .printers
                .ok_or_else(|| ApiError::Malformed("search response has no printer list".into()))
        })
    }

    fn jobs<'a>(&'a self, token: &'a str) -> ApiFuture<'a, Vec<JobStatus>> {
        Box::pin(async move {
            let response: JobsResponse = self.call("jobs", token, Form::new()).await?;
            if !response.success {
                return Err(rejected("jobs", response.message));
            }
            response
                .jobs
                .ok_or_else(|| ApiError::Malformed("jobs response has no job list".into()))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::extract::{Multipart, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;
    use crate::ticket::{PrintOptions, build_ticket};

    #[derive(Default)]
    struct Recorded {
        authorization: Option<String>,
        fields: HashMap<String, String>,
        file_name: Option<String>,
        content: Vec<u8>,
    }

    struct MockProvider {
        submit_reply: Value,
        search_reply: Value,
        jobs_reply: Value,
        recorded: Mutex<Recorded>,
    }

    async fn submit(
        State(mock): State<Arc<MockProvider>>,
        headers: HeaderMap,
        mut multipart: Multipart,
    ) -> Json<Value> {
        let mut recorded = Recorded {
            authorization: headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
            ..Recorded::default()
        };
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_owned();
            if name == "content" {
                recorded.file_name = field.file_name().map(str::to_owned);
                recorded.content = field.bytes().await.unwrap().to_vec();
            } else {
                recorded.fields.insert(name, field.text().await.unwrap());
            }
        }
        *mock.recorded.lock().unwrap() = recorded;
        Json(mock.submit_reply.clone())
    }

    async fn search(State(mock): State<Arc<MockProvider>>) -> Json<Value> {
        Json(mock.search_reply.clone())
    }

    async fn jobs(State(mock): State<Arc<MockProvider>>) -> Response {
        if mock.jobs_reply.is_null() {
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
        Json(mock.jobs_reply.clone()).into_response()
    }

    async fn spawn(
        submit_reply: Value,
        jobs_reply: Value,
    ) -> (HttpCloudPrintApi, Arc<MockProvider>) {
        let search_reply = json!({
            "success": true,
            "printers": [{"id": "other"}, {"id": "campus", "displayName": "Campus"}]
        });
        spawn_mock(MockProvider {
            submit_reply,
            search_reply,
            jobs_reply,
            recorded: Mutex::new(Recorded::default()),
        })
        .await
    }

    async fn spawn_mock(mock: MockProvider) -> (HttpCloudPrintApi, Arc<MockProvider>) {
        let mock = Arc::new(mock);
        let app = Router::new()
            .route("/cloudprint/submit", post(submit))
            .route("/cloudprint/search", post(search))
            .route("/cloudprint/jobs", post(jobs))
            .with_state(mock.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let api =
            HttpCloudPrintApi::new(&format!("http://{addr}/cloudprint/"), Duration::from_secs(5))
                .unwrap();
        (api, mock)
    }

    #[tokio::test]
    async fn submit_sends_multipart_with_bearer_token() {
        let (api, mock) =
            spawn(json!({"success": true, "job": {"id": "job-9"}}), json!(null)).await;
        let file = PrintFile::new("essay.pdf", b"%PDF-1.4".to_vec());
        let ticket = build_ticket(&PrintOptions::default());

        let job_id = api.submit("at_123", "campus", &file, &ticket).await.unwrap();

        assert_eq!(job_id, "job-9");
        let recorded = mock.recorded.lock().unwrap();
        assert_eq!(recorded.authorization.as_deref(), Some("Bearer at_123"));
        assert_eq!(recorded.fields["printerid"], "campus");
        assert_eq!(recorded.fields["title"], "essay.pdf");
        assert_eq!(recorded.fields["ticket"], ticket.to_string());
        assert_eq!(recorded.file_name.as_deref(), Some("essay.pdf"));
        assert_eq!(recorded.content, b"%PDF-1.4");
    }

    #[tokio::test]
    async fn unsuccessful_submit_is_rejected() {
        let (api, _mock) =
            spawn(json!({"success": false, "message": "Printer offline"}), json!(null)).await;
        let file = PrintFile::new("a.txt", b"x".to_vec());

        let err = api
            .submit("t", "campus", &file, &build_ticket(&PrintOptions::default()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Rejected(ref msg) if msg.contains("Printer offline")));
    }

    #[tokio::test]
    async fn submit_without_job_id_is_malformed() {
        let (api, _mock) = spawn(json!({"success": true, "job": {}}), json!(null)).await;
        let file = PrintFile::new("a.txt", b"x".to_vec());

        let err = api
            .submit("t", "campus", &file, &build_ticket(&PrintOptions::default()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Malformed(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn search_lists_printers() {
        let (api, _mock) = spawn(json!(null), json!(null)).await;

        let printers = api.search("t").await.unwrap();

        let ids: Vec<_> = printers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["other", "campus"]);
        assert_eq!(printers[1].display_name.as_deref(), Some("Campus"));
    }

    #[tokio::test]
    async fn search_without_printer_list_is_malformed() {
        let (api, _mock) = spawn_mock(MockProvider {
            submit_reply: json!(null),
            search_reply: json!({"success": true}),
            jobs_reply: json!(null),
            recorded: Mutex::new(Recorded::default()),
        })
        .await;

        let err = api.search("t").await.unwrap_err();

        assert!(matches!(err, ApiError::Malformed(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn jobs_without_status_parse() {
        let reply = json!({"success": true, "jobs": [{"id": "a", "status": "DONE"}, {"id": "b"}]});
        let (api, _mock) = spawn(json!(null), reply).await;

        let jobs = api.jobs("t").await.unwrap();

        assert_eq!(jobs[0].status.as_deref(), Some("DONE"));
        assert_eq!(jobs[1].status, None);
    }

    #[tokio::test]
    async fn job_entry_without_id_is_malformed() {
        let reply = json!({"success": true, "jobs": [{"status": "DONE"}]});
        let (api, _mock) = spawn(json!(null), reply).await;

        let err = api.jobs("t").await.unwrap_err();

        assert!(matches!(err, ApiError::Malformed(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn jobs_server_error_is_rejected() {
        let (api, _mock) = spawn(json!(null), json!(null)).await;

        let err = api.jobs("t").await.unwrap_err();

        assert!(matches!(err, ApiError::Rejected(_)), "got {err:?}");
    }
}
