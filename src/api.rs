use crate::config::REQUEST_TIMEOUT_SECS;
use crate::error::RequestError;
use crate::models::{LoginRequest, LoginResponse, NewTodo, SignupRequest, Todo, TodoTextUpdate};
use crate::token_store::TokenStore;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// One outgoing call, before authorization and dispatch.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> ApiRequest {
        ApiRequest {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn json(mut self, body: Option<Value>) -> ApiRequest {
        self.body = body;
        self
    }

    #[cfg(test)]
    pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> ApiRequest {
        self.headers.insert(name, value);
        self
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(self) -> Result<T, RequestError> {
        Ok(serde_json::from_value(self.body)?)
    }
}

/// Attaches the stored session token as a bearer credential.
///
/// Without a stored token the request goes out unauthenticated. An
/// `Authorization` header set on the request itself is left as is.
pub fn authorize(mut request: ApiRequest, store: &dyn TokenStore) -> ApiRequest {
    if request.headers.contains_key(AUTHORIZATION) {
        return request;
    }
    if let Some(token) = store.get() {
        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                tracing::warn!(path = %request.path, "stored token is not a valid header value");
            }
        }
    }
    request
}

pub struct HttpClient {
    client: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
}

impl HttpClient {
    pub fn new(base_url: &str, store: Arc<dyn TokenStore>) -> Result<HttpClient, RequestError> {
        HttpClient::with_timeout(base_url, store, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(
        base_url: &str,
        store: Arc<dyn TokenStore>,
        timeout: Duration,
    ) -> Result<HttpClient, RequestError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(HttpClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RequestError> {
        let request = authorize(request, self.store.as_ref());
        self.dispatch(request).await
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse, RequestError> {
        self.send(ApiRequest::new(Method::GET, path)).await
    }

    pub async fn post(&self, path: &str, body: Option<Value>) -> Result<ApiResponse, RequestError> {
        self.send(ApiRequest::new(Method::POST, path).json(body)).await
    }

    pub async fn put(&self, path: &str, body: Option<Value>) -> Result<ApiResponse, RequestError> {
        self.send(ApiRequest::new(Method::PUT, path).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiResponse, RequestError> {
        self.send(ApiRequest::new(Method::DELETE, path)).await
    }

    /// Hits the API root and reports whatever status comes back.
    pub async fn probe(&self) -> Result<u16, RequestError> {
        match self.get("/").await {
            Ok(res) => Ok(res.status),
            Err(RequestError::Status { status, .. }) => Ok(status),
            Err(err) => Err(err),
        }
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, RequestError> {
        let url = format!("{}{}", self.base_url, request.path);
        let authenticated = request.bearer_token().is_some();
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let res = builder.send().await.map_err(|err| {
            tracing::warn!(method = %request.method, path = %request.path, error = %err, "request failed");
            RequestError::from(err)
        })?;

        let status = res.status();
        let text = res.text().await?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        tracing::debug!(
            method = %request.method,
            path = %request.path,
            authenticated,
            status = status.as_u16(),
            "response"
        );

        if status.is_success() {
            Ok(ApiResponse {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(RequestError::Status {
                status: status.as_u16(),
                body: Some(body),
            })
        }
    }
}

pub trait AuthApi {
    async fn signup(&self, request: &SignupRequest) -> Result<(), RequestError>;
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, RequestError>;
}

pub trait TodoApi {
    async fn list_todos(&self) -> Result<Vec<Todo>, RequestError>;
    async fn create_todo(&self, todo: &NewTodo) -> Result<Todo, RequestError>;
    async fn toggle_todo(&self, id: &str) -> Result<Todo, RequestError>;
    async fn update_todo_text(&self, id: &str, text: &str) -> Result<Todo, RequestError>;
    async fn delete_todo(&self, id: &str) -> Result<(), RequestError>;
}

/// Everything the app needs from the backend.
pub trait ApiClient: AuthApi + TodoApi {
    fn base_url(&self) -> &str;
    async fn probe(&self) -> Result<u16, RequestError>;
}

impl ApiClient for HttpClient {
    fn base_url(&self) -> &str {
        HttpClient::base_url(self)
    }

    async fn probe(&self) -> Result<u16, RequestError> {
        HttpClient::probe(self).await
    }
}

impl AuthApi for HttpClient {
    async fn signup(&self, request: &SignupRequest) -> Result<(), RequestError> {
        self.post("/auth/signup", Some(serde_json::to_value(request)?))
            .await
            .map(|_| ())
    }

    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, RequestError> {
        self.post("/auth/login", Some(serde_json::to_value(request)?))
            .await?
            .json()
    }
}

impl TodoApi for HttpClient {
    async fn list_todos(&self) -> Result<Vec<Todo>, RequestError> {
        self.get("/todos").await?.json()
    }

    async fn create_todo(&self, todo: &NewTodo) -> Result<Todo, RequestError> {
        self.post("/todos", Some(serde_json::to_value(todo)?))
            .await?
            .json()
    }

    async fn toggle_todo(&self, id: &str) -> Result<Todo, RequestError> {
        self.put(&format!("/todos/{}/toggle", id), Some(json!({})))
            .await?
            .json()
    }

    async fn update_todo_text(&self, id: &str, text: &str) -> Result<Todo, RequestError> {
        let body = serde_json::to_value(TodoTextUpdate { text })?;
        self.put(&format!("/todos/{}", id), Some(body))
            .await?
            .json()
    }

    async fn delete_todo(&self, id: &str) -> Result<(), RequestError> {
        self.delete(&format!("/todos/{}", id)).await.map(|_| ())
    }
}
