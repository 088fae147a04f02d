//! `reqwest` implementation of [`Backend`].

use reqwest::{Method, RequestBuilder, StatusCode, header};
use serde::de::{DeserializeOwned, IgnoredAny};
use taskdeck_proto::auth::{AuthPayload, Credentials, Registration, User};
use taskdeck_proto::envelope::{ApiEnvelope, ErrorBody, FALLBACK_ERROR_MESSAGE};
use taskdeck_proto::filter::FilterSet;
use taskdeck_proto::task::{Task, TaskDraft, TaskId, TaskPage, TaskPatch};
use url::Url;

use super::{ApiError, Backend};

/// Talks JSON over HTTP to a task server rooted at a base URL.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    /// A backend for `base` (e.g. `http://localhost:8000/api`).
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Network`] if `base` cannot have paths appended
    /// or the HTTP client cannot be built.
    pub fn new(base: Url) -> Result<Self, ApiError> {
        if base.cannot_be_a_base() {
            return Err(ApiError::Network(format!("{base} cannot be used as a base URL")));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("taskdeck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Network(format!("{} cannot be used as a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str], token: Option<&str>) -> Result<RequestBuilder, ApiError> {
        let builder = self
            .client
            .request(method, self.endpoint(segments)?)
            .header(header::ACCEPT, "application/json");
        Ok(match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Sends `request` and unwraps the `{success, data, message}` envelope.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<Option<T>, ApiError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;
        tracing::debug!(status = status.as_u16(), bytes = body.len(), "response received");

        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        let envelope: ApiEnvelope<T> =
            serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        if !envelope.success {
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string()),
            });
        }
        Ok(envelope.data)
    }

    async fn send_data<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        self.send(request)
            .await?
            .ok_or_else(|| ApiError::Decode("response carried no data".into()))
    }
}

fn transport_error(error: reqwest::Error) -> ApiError {
    if error.is_timeout() {
        ApiError::Timeout
    } else if error.is_decode() {
        ApiError::Decode(error.to_string())
    } else {
        ApiError::Network(error.to_string())
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> ApiError {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    let message = parsed
        .message
        .filter(|m| !m.trim().is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());
    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized { message },
        StatusCode::NOT_FOUND => ApiError::NotFound { message },
        StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation {
            message,
            errors: parsed.errors,
        },
        other => ApiError::Server {
            status: other.as_u16(),
            message,
        },
    }
}

impl Backend for HttpBackend {
    async fn register(&self, registration: &Registration) -> Result<AuthPayload, ApiError> {
        let request = self.request(Method::POST, &["register"], None)?.json(registration);
        self.send_data(request).await
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthPayload, ApiError> {
        let request = self.request(Method::POST, &["login"], None)?.json(credentials);
        self.send_data(request).await
    }

    async fn logout(&self, token: Option<&str>) -> Result<(), ApiError> {
        let request = self.request(Method::POST, &["logout"], token)?;
        self.send::<IgnoredAny>(request).await.map(drop)
    }

    async fn profile(&self, token: Option<&str>) -> Result<User, ApiError> {
        let request = self.request(Method::GET, &["user"], token)?;
        self.send_data(request).await
    }

    async fn list_tasks(&self, token: Option<&str>, filters: &FilterSet) -> Result<TaskPage, ApiError> {
        let request = self
            .request(Method::GET, &["tasks"], token)?
            .query(&filters.to_query());
        self.send_data(request).await
    }

    async fn get_task(&self, token: Option<&str>, id: &TaskId) -> Result<Task, ApiError> {
        let request = self.request(Method::GET, &["tasks", id.as_str()], token)?;
        self.send_data(request).await
    }

    async fn create_task(&self, token: Option<&str>, draft: &TaskDraft) -> Result<Task, ApiError> {
        let request = self.request(Method::POST, &["tasks"], token)?.json(draft);
        self.send_data(request).await
    }

    async fn update_task(
        &self,
        token: Option<&str>,
        id: &TaskId,
        patch: &TaskPatch,
    ) -> Result<Task, ApiError> {
        let request = self
            .request(Method::PUT, &["tasks", id.as_str()], token)?
            .json(patch);
        self.send_data(request).await
    }

    async fn delete_task(&self, token: Option<&str>, id: &TaskId) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &["tasks", id.as_str()], token)?;
        self.send::<IgnoredAny>(request).await.map(drop)
    }
}
