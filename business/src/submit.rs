//! Sending entity forms to the API and fetching entity records back.

use campus_uploads::{ObjectUrlStore, UploadSession};
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::BusinessConfig;
use crate::entity::EntityKind;
use crate::hydrate::{HydrateError, session_from_entity};
use crate::http::{Client, HttpError, RequestBuilder, Response};
use crate::multipart::SubmissionForm;

#[derive(Debug, Error)]
pub enum SubmitError {
    /// The API answered with a non-2xx status. `message` is the server's
    /// own wording, shown to the user as-is.
    #[error("{message}")]
    SubmissionFailed { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] HttpError),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Hydration(#[from] HydrateError),
}

impl SubmitError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SubmissionFailed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Extracts the server's error wording, falling back to the raw body.
fn extract_error_message(response: &Response) -> String {
    let from_json = response
        .json::<ErrorBody>()
        .ok()
        .and_then(|body| body.message.or(body.error))
        .filter(|message| !message.trim().is_empty());
    if let Some(message) = from_json {
        return message;
    }

    match response.text() {
        Ok(text) if !text.trim().is_empty() => text.trim().to_owned(),
        _ => format!("request failed with status {}", response.status),
    }
}

/// Client for the entity endpoints under `{api}/{collection}`.
#[derive(Debug, Clone, Default)]
pub struct Submitter {
    config: BusinessConfig,
}

impl Submitter {
    pub fn new(config: BusinessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BusinessConfig {
        &self.config
    }

    /// `POST {api}/{collection}`
    pub async fn create(
        &self,
        kind: EntityKind,
        form: SubmissionForm,
    ) -> Result<Value, SubmitError> {
        let url = kind.profile().collection_path(&self.config.api_url());
        let request = self.build_request(Client::post(url)).multipart(form.into_parts());
        self.dispatch(kind, request).await
    }

    /// `PUT {api}/{collection}/{id}`
    pub async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        form: SubmissionForm,
    ) -> Result<Value, SubmitError> {
        let url = kind.profile().item_path(&self.config.api_url(), id);
        let request = self.build_request(Client::put(url)).multipart(form.into_parts());
        self.dispatch(kind, request).await
    }

    /// `GET {api}/{collection}/{id}`
    pub async fn fetch(&self, kind: EntityKind, id: &str) -> Result<Value, SubmitError> {
        let url = kind.profile().item_path(&self.config.api_url(), id);
        let request = self
            .build_request(Client::get(url))
            .header("Accept", "application/json");
        self.dispatch(kind, request).await
    }

    /// Fetches an entity and opens an edit session over its stored files.
    pub async fn fetch_session(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<(Value, UploadSession<ObjectUrlStore>), SubmitError> {
        let entity = self.fetch(kind, id).await?;
        let session = session_from_entity(&entity, &kind.profile())?;
        Ok((entity, session))
    }

    fn build_request(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer(self.config.api_token())
    }

    async fn dispatch(
        &self,
        kind: EntityKind,
        request: RequestBuilder,
    ) -> Result<Value, SubmitError> {
        let method = request.method();
        let url = request.url().to_owned();

        let response = request.send().await.inspect_err(|e| {
            warn!(
                target: "campus_business::submit",
                "transport_error entity={kind} method={method} url={url} error={e}"
            );
        })?;

        if !response.is_success() {
            let message = extract_error_message(&response);
            warn!(
                target: "campus_business::submit",
                "rejected entity={kind} method={method} url={url} status={} message={message}",
                response.status
            );
            return Err(SubmitError::SubmissionFailed {
                status: response.status,
                message,
            });
        }

        info!(
            target: "campus_business::submit",
            "ok entity={kind} method={method} url={url} status={}",
            response.status
        );

        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        Ok(response.json()?)
    }
}
