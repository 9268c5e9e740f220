//! Platform-abstracted HTTP client with Send-safe futures.
//!
//! On WASM, `reqwest::Response` is not `Send` because it wraps JS types.
//! To keep submission futures `Send` on every target:
//! - On **native**: use reqwest directly
//! - On **WASM**: run the request on the JS thread with
//!   `wasm_bindgen_futures::spawn_local` and hand the result back through a
//!   `flume` channel
//!
//! Request bodies are plain bytes or a multipart form description that is
//! turned into a `reqwest::multipart::Form` only when the request is sent.

use std::collections::HashMap;

/// HTTP method for requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// Value of one multipart field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

/// One named multipart field. Names may repeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File {
                file_name: file_name.into(),
                mime_type: mime_type.into(),
                bytes: bytes.into(),
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            FormValue::Text(text) => Some(text),
            FormValue::File { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Body {
    Bytes(Vec<u8>),
    Multipart(Vec<FormPart>),
}

/// A simplified HTTP response that contains only Send-safe data.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers (lowercased keys)
    pub headers: HashMap<String, String>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

impl Response {
    /// Returns true if the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    /// Attempt to parse the body as UTF-8 text.
    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.clone())
    }

    /// Attempt to deserialize the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// HTTP client error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub message: String,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP error: {}", self.message)
    }
}

impl std::error::Error for HttpError {}

/// Result type for HTTP operations.
pub type HttpResult<T> = Result<T, HttpError>;

/// A builder for constructing HTTP requests.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    url: String,
    headers: HashMap<String, String>,
    body: Option<Body>,
}

impl RequestBuilder {
    /// Create a new request builder.
    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Add a header to the request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds `Authorization: Bearer` when a token is present.
    pub fn bearer(self, token: Option<&str>) -> Self {
        match token {
            Some(token) => self.header("Authorization", format!("Bearer {token}")),
            None => self,
        }
    }

    /// Set the request body as raw bytes.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(Body::Bytes(body.into()));
        self
    }

    /// Set the request body as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Result<Self, serde_json::Error> {
        let json_bytes = serde_json::to_vec(value)?;
        self.body = Some(Body::Bytes(json_bytes));
        self.headers
            .insert("content-type".to_owned(), "application/json".to_owned());
        Ok(self)
    }

    /// Set the request body as `multipart/form-data`.
    ///
    /// The boundary and content type header are chosen when sending.
    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = Some(Body::Multipart(parts));
        self
    }

    /// Send the request and return a Send-safe future.
    pub async fn send(self) -> HttpResult<Response> {
        #[cfg(not(target_arch = "wasm32"))]
        {
            execute(self.method, self.url, self.headers, self.body).await
        }

        #[cfg(target_arch = "wasm32")]
        {
            self.send_wasm().await
        }
    }

    #[cfg(target_arch = "wasm32")]
    async fn send_wasm(self) -> HttpResult<Response> {
        // flume channels are Send-safe, so this future is Send
        let (tx, rx) = flume::bounded::<HttpResult<Response>>(1);

        let Self {
            method,
            url,
            headers,
            body,
        } = self;

        // This closure is NOT Send, but spawn_local doesn't require Send
        wasm_bindgen_futures::spawn_local(async move {
            let result = execute(method, url, headers, body).await;
            let _ = tx.send_async(result).await;
        });

        rx.recv_async()
            .await
            .map_err(|_| HttpError::new("Request cancelled"))?
    }
}

async fn execute(
    method: Method,
    url: String,
    headers: HashMap<String, String>,
    body: Option<Body>,
) -> HttpResult<Response> {
    let client = reqwest::Client::new();

    let mut request = match method {
        Method::Get => client.get(&url),
        Method::Post => client.post(&url),
        Method::Put => client.put(&url),
    };

    for (name, value) in &headers {
        request = request.header(name, value);
    }

    request = match body {
        Some(Body::Bytes(bytes)) => request.body(bytes),
        Some(Body::Multipart(parts)) => request.multipart(into_form(parts)?),
        None => request,
    };

    log::debug!(target: "campus_business::http", "request method={method} url={url}");

    let response = request
        .send()
        .await
        .map_err(|e| HttpError::new(e.to_string()))?;

    // Extract status and headers before consuming the response
    let status = response.status().as_u16();
    let mut response_headers = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(v) = value.to_str() {
            response_headers.insert(name.as_str().to_lowercase(), v.to_owned());
        }
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| HttpError::new(e.to_string()))?
        .to_vec();

    log::debug!(
        target: "campus_business::http",
        "response method={method} url={url} status={status} bytes={}",
        body.len()
    );

    Ok(Response {
        status,
        headers: response_headers,
        body,
    })
}

fn into_form(parts: Vec<FormPart>) -> HttpResult<reqwest::multipart::Form> {
    let mut form = reqwest::multipart::Form::new();
    for part in parts {
        form = match part.value {
            FormValue::Text(text) => form.text(part.name, text),
            FormValue::File {
                file_name,
                mime_type,
                bytes,
            } => {
                let file_part = reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&mime_type)
                    .map_err(|e| HttpError::new(format!("invalid mime type {mime_type}: {e}")))?;
                form.part(part.name, file_part)
            }
        };
    }
    Ok(form)
}

/// HTTP client with Send-safe futures on all platforms.
///
/// # Example
///
/// ```ignore
/// use campus_business::http::Client;
///
/// async fn fetch_activity() {
///     let response = Client::get("https://campus.example.edu/api/activities/7")
///         .header("Accept", "application/json")
///         .send()
///         .await
///         .unwrap();
///
///     if response.is_success() {
///         let activity: serde_json::Value = response.json().unwrap();
///     }
/// }
/// ```
pub struct Client;

impl Client {
    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::Get, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::Post, url)
    }

    /// Create a PUT request.
    pub fn put(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(Method::Put, url)
    }
}
