use async_trait::async_trait;
use futures::StreamExt;
use log::{ debug, error, info };
use reqwest::{ Client as HttpClient, RequestBuilder, Response, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ ByteStream, CatalogApi, ChatStreamRequest, CompletionApi, ConversationApi, ImageApi };
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::models::catalog::{
    Character,
    CharacterDetail,
    CharacterList,
    Conversation,
    Message,
    MessageRole,
    NewConversation,
    NewMessage,
};
use crate::models::image::{ ImageGenerationResult, ImageRequest };

/// HTTP client for both backends: the REST API that owns characters and
/// conversations, and the service that streams completions and renders images.
#[derive(Clone)]
pub struct BackendClient {
    http: HttpClient,
    rest_base: String,
    completion_base: String,
}

impl BackendClient {
    pub fn new(rest_base: &str, completion_base: &str) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            rest_base: rest_base.trim_end_matches('/').to_string(),
            completion_base: completion_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(config.django_api_url.as_str(), config.fastapi_url.as_str())
    }

    fn rest_url(&self, route: &str) -> String {
        format!("{}{}", self.rest_base, route)
    }

    fn completion_url(&self, route: &str) -> String {
        format!("{}{}", self.completion_base, route)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        route: &str,
        token: Option<&str>
    ) -> Result<T, ClientError> {
        let req = with_bearer(self.http.get(self.rest_url(route)), token);
        let resp = check_status(req.send().await?, route).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn post_json<B: serde::Serialize + ?Sized + Sync, T: serde::de::DeserializeOwned>(
        &self,
        route: &str,
        token: Option<&str>,
        body: &B
    ) -> Result<T, ClientError> {
        let req = with_bearer(self.http.post(self.rest_url(route)), token).json(body);
        let resp = check_status(req.send().await?, route).await?;
        Ok(resp.json::<T>().await?)
    }
}

fn with_bearer(req: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) if !token.is_empty() => req.header(AUTHORIZATION, format!("Bearer {}", token)),
        _ => req,
    }
}

/// Turns a non-2xx response into `ClientError::Status`, pulling a readable
/// detail out of the usual error body shapes.
async fn check_status(resp: Response, endpoint: &str) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = resp
        .json::<JsonValue>().await
        .ok()
        .and_then(|body| error_detail(&body));
    error!("{} failed with {}: {:?}", endpoint, status, detail);
    Err(ClientError::Status {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        detail,
    })
}

fn error_detail(body: &JsonValue) -> Option<String> {
    ["detail", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key))
        .map(|value| match value {
            JsonValue::String(s) => s.clone(),
            other => other.to_string(),
        })
}

#[async_trait]
impl CompletionApi for BackendClient {
    async fn stream_chat(&self, request: &ChatStreamRequest) -> Result<ByteStream, ClientError> {
        let route = "/chat/stream";
        info!(
            "Streaming chat: conversation={}, character={}, history={} turns",
            request.conversation_id,
            request.character_id,
            request.messages.len()
        );
        let resp = self.http.post(self.completion_url(route)).json(request).send().await?;
        let resp = check_status(resp, route).await?;

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut bytes = resp.bytes_stream();
            while let Some(chunk) = bytes.next().await {
                let item = chunk
                    .map(|buf| buf.to_vec())
                    .map_err(|e| ClientError::Transport(e.to_string()));
                let failed = item.is_err();
                if tx.send(item).await.is_err() {
                    debug!("Stream consumer dropped, closing completion response");
                    return;
                }
                if failed {
                    return;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

#[async_trait]
impl CatalogApi for BackendClient {
    async fn list_characters(&self, token: Option<&str>) -> Result<Vec<Character>, ClientError> {
        let list: CharacterList = self.get_json("/characters/", token).await?;
        Ok(list.into_vec())
    }

    async fn public_characters(&self) -> Result<BTreeMap<String, Vec<Character>>, ClientError> {
        self.get_json("/characters/public_characters/", None).await
    }

    async fn character(&self, id: i64) -> Result<CharacterDetail, ClientError> {
        self.get_json(&format!("/characters/{}/", id), None).await
    }
}

#[async_trait]
impl ConversationApi for BackendClient {
    async fn my_conversations(&self, token: Option<&str>) -> Result<Vec<Conversation>, ClientError> {
        self.get_json("/conversations/my_conversations/", token).await
    }

    async fn create_conversation(
        &self,
        token: Option<&str>,
        character_id: i64,
        title: Option<&str>,
        subject: Option<&str>
    ) -> Result<Conversation, ClientError> {
        let body = NewConversation { character: character_id, title, subject };
        let conversation: Conversation = self.post_json("/conversations/", token, &body).await?;
        info!("Created conversation {} for character {}", conversation.id, character_id);
        Ok(conversation)
    }

    async fn messages(&self, token: Option<&str>, conversation_id: i64) -> Result<Vec<Message>, ClientError> {
        self.get_json(&format!("/conversations/{}/messages/", conversation_id), token).await
    }

    async fn add_message(
        &self,
        token: Option<&str>,
        conversation_id: i64,
        role: MessageRole,
        content: &str
    ) -> Result<Message, ClientError> {
        let body = NewMessage { role, content };
        self.post_json(&format!("/conversations/{}/add_message/", conversation_id), token, &body).await
    }
}

#[async_trait]
impl ImageApi for BackendClient {
    async fn generate_image(&self, request: &ImageRequest) -> Result<ImageGenerationResult, ClientError> {
        let route = "/image/generate";
        info!("Generating image ({:?}, {:?})", request.size, request.quality);
        let resp = self.http.post(self.completion_url(route)).json(request).send().await?;
        let resp = check_status(resp, route).await?;
        Ok(resp.json::<ImageGenerationResult>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_routes_without_double_slashes() {
        let client = BackendClient::new("http://localhost:8000/api/v1/", "http://localhost:8080").unwrap();
        assert_eq!(client.rest_url("/characters/"), "http://localhost:8000/api/v1/characters/");
        assert_eq!(client.completion_url("/chat/stream"), "http://localhost:8080/chat/stream");
    }

    #[test]
    fn error_detail_prefers_detail_then_message_then_error() {
        assert_eq!(error_detail(&json!({"detail": "no points", "error": "x"})), Some("no points".into()));
        assert_eq!(error_detail(&json!({"message": "bad login"})), Some("bad login".into()));
        assert_eq!(error_detail(&json!({"error": {"code": 1}})), Some(r#"{"code":1}"#.into()));
        assert_eq!(error_detail(&json!({"ok": false})), None);
    }
}
