use async_trait::async_trait;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response, Url};
use serde::de::DeserializeOwned;

use super::ChatApi;
use super::error::ApiError;
use super::types::{
    BlockStatus, ConversationSummary, IdentityResponse, LoginRequest, Message, OutgoingMessage,
    RegisterRequest, Rows, Upload, User,
};

/// How a request carries its data.
pub enum Payload {
    None,
    Query(Vec<(&'static str, String)>),
    Json(serde_json::Value),
    Multipart(Form),
}

/// HTTP client for the Slash API.
///
/// # Example
/// ```no_run
/// use slash::api::{ApiClient, ChatApi, LoginRequest};
/// # async fn demo() {
/// let api = ApiClient::new("http://localhost:8000");
/// let request = LoginRequest {
///     identifier: "alice".to_string(),
///     password: "secret".to_string(),
/// };
/// match api.login(&request).await {
///     Ok(user) => println!("Logged in as @{}", user.username),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `host:port` of the API base, used in "cannot reach" hints.
    pub fn host(&self) -> String {
        match Url::parse(&self.base_url) {
            Ok(url) => match (url.host_str(), url.port_or_known_default()) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                (Some(host), None) => host.to_string(),
                _ => self.base_url.clone(),
            },
            Err(_) => self.base_url.clone(),
        }
    }

    /// Perform a call and return the raw response, normalizing failures.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, path);

        let mut builder = self
            .client
            .request(method.clone(), &url)
            .header(reqwest::header::ACCEPT, "application/json");
        builder = match payload {
            Payload::None => builder,
            Payload::Query(params) => builder.query(&params),
            Payload::Json(body) => builder.json(&body),
            Payload::Multipart(form) => builder.multipart(form),
        };

        let response = builder.send().await.map_err(|e| {
            warn!("{} {} failed before reaching the server: {}", method, path, e);
            ApiError::NetworkUnreachable { host: self.host() }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("{} {} returned HTTP {}: {}", method, path, status.as_u16(), body);
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        Ok(response)
    }

    /// Perform a call and decode the JSON body.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        payload: Payload,
    ) -> Result<T, ApiError> {
        let response = self.request(method, path, payload).await?;
        response.json::<T>().await.map_err(|e| {
            warn!("Could not decode response from {}: {}", path, e);
            ApiError::Decode(e.to_string())
        })
    }
}

fn file_part(upload: Upload) -> Result<Part, ApiError> {
    Part::bytes(upload.bytes)
        .file_name(upload.file_name)
        .mime_str(&upload.mime)
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))
}

fn block_form(blocker: &str, blocked: &str) -> Form {
    Form::new()
        .text("blocker", blocker.to_string())
        .text("blocked", blocked.to_string())
}

#[async_trait]
impl ChatApi for ApiClient {
    async fn register(&self, request: &RegisterRequest) -> Result<User, ApiError> {
        let body = serde_json::to_value(request).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let identity: IdentityResponse =
            self.request_json(Method::POST, "/register", Payload::Json(body)).await?;
        Ok(identity.into())
    }

    async fn login(&self, request: &LoginRequest) -> Result<User, ApiError> {
        let body = serde_json::to_value(request).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let identity: IdentityResponse =
            self.request_json(Method::POST, "/login", Payload::Json(body)).await?;
        Ok(identity.into())
    }

    async fn search_users(&self, query: &str) -> Result<Vec<User>, ApiError> {
        let params = vec![("q", query.to_string())];
        let rows: Rows<User> = self
            .request_json(Method::GET, "/users/search", Payload::Query(params))
            .await?;
        Ok(rows.into_inner())
    }

    async fn public_users(&self) -> Result<Vec<User>, ApiError> {
        let rows: Rows<User> = self
            .request_json(Method::GET, "/users/public", Payload::None)
            .await?;
        Ok(rows.into_inner())
    }

    async fn update_avatar(&self, username: &str, file: Upload) -> Result<User, ApiError> {
        let form = Form::new()
            .text("username", username.to_string())
            .part("file", file_part(file)?);
        let identity: IdentityResponse = self
            .request_json(Method::POST, "/users/avatar", Payload::Multipart(form))
            .await?;
        Ok(identity.into())
    }

    async fn conversations(
        &self,
        user: &str,
        limit: u32,
    ) -> Result<Vec<ConversationSummary>, ApiError> {
        let params = vec![("user", user.to_string()), ("limit", limit.to_string())];
        let rows: Rows<ConversationSummary> = self
            .request_json(Method::GET, "/conversations", Payload::Query(params))
            .await?;
        Ok(rows.into_inner())
    }

    async fn history(
        &self,
        user1: &str,
        user2: &str,
        limit: u32,
    ) -> Result<Vec<Message>, ApiError> {
        let params = vec![
            ("user1", user1.to_string()),
            ("user2", user2.to_string()),
            ("limit", limit.to_string()),
        ];
        let rows: Rows<Message> = self
            .request_json(Method::GET, "/messages/history", Payload::Query(params))
            .await?;
        Ok(rows.into_inner())
    }

    async fn send_message(&self, message: OutgoingMessage) -> Result<Message, ApiError> {
        let mut form = Form::new()
            .text("sender", message.sender)
            .text("receiver", message.receiver)
            .text("type", message.kind.as_str());
        if let Some(text) = message.text {
            form = form.text("text", text);
        }
        if let Some(file) = message.file {
            form = form.part("file", file_part(file)?);
        }
        self.request_json(Method::POST, "/messages/send", Payload::Multipart(form))
            .await
    }

    async fn block(&self, blocker: &str, blocked: &str) -> Result<(), ApiError> {
        self.request(Method::POST, "/block", Payload::Multipart(block_form(blocker, blocked)))
            .await
            .map(|_| ())
    }

    async fn unblock(&self, blocker: &str, blocked: &str) -> Result<(), ApiError> {
        self.request(Method::POST, "/unblock", Payload::Multipart(block_form(blocker, blocked)))
            .await
            .map(|_| ())
    }

    async fn block_status(&self, user1: &str, user2: &str) -> Result<BlockStatus, ApiError> {
        let params = vec![("user1", user1.to_string()), ("user2", user2.to_string())];
        self.request_json(Method::GET, "/block/status", Payload::Query(params))
            .await
    }

    async fn status(&self) -> Result<serde_json::Value, ApiError> {
        self.request_json(Method::GET, "/test", Payload::None).await
    }

    fn media_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return reference.to_string();
        }
        if reference.starts_with('/') {
            format!("{}{}", self.base_url, reference)
        } else {
            format!("{}/{}", self.base_url, reference)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let api = ApiClient::new("http://localhost:8000/");
        assert_eq!(api.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_host_includes_default_port() {
        assert_eq!(ApiClient::new("http://chat.example.com").host(), "chat.example.com:80");
        assert_eq!(ApiClient::new("http://10.0.0.5:8000").host(), "10.0.0.5:8000");
    }

    #[test]
    fn test_media_url_resolution() {
        let api = ApiClient::new("http://localhost:8000");
        assert_eq!(api.media_url("/media/a.png"), "http://localhost:8000/media/a.png");
        assert_eq!(api.media_url("media/a.png"), "http://localhost:8000/media/a.png");
        assert_eq!(api.media_url("https://cdn.example.com/a.png"), "https://cdn.example.com/a.png");
    }

    #[tokio::test]
    async fn test_unreachable_server_maps_to_network_error() {
        // Port 9 (discard) is closed on test machines; the connection is refused.
        let api = ApiClient::new("http://127.0.0.1:9");
        let result = api.status().await;
        assert_eq!(
            result,
            Err(ApiError::NetworkUnreachable { host: "127.0.0.1:9".to_string() })
        );
    }
}
