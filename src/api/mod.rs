pub mod client;

use async_trait::async_trait;
use futures::Stream;
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;
use std::pin::Pin;

use crate::error::ClientError;
use crate::models::catalog::{ Character, CharacterDetail, Conversation, Message, MessageRole };
use crate::models::chat::PriorTurn;
use crate::models::image::{ ImageGenerationResult, ImageRequest };

pub use self::client::BackendClient;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, ClientError>> + Send>>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatStreamRequest {
    pub conversation_id: i64,
    pub character_id: i64,
    pub user_message: String,
    pub user_token: String,
    pub messages: Vec<PriorTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub save_to_db: bool,
}

/// Supplies the user's bearer token. The chat core never reads ambient
/// storage for credentials.
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self { token: token.filter(|t| !t.trim().is_empty()) }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl CredentialProvider for StaticCredentials {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }
}

#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn stream_chat(&self, request: &ChatStreamRequest) -> Result<ByteStream, ClientError>;
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn list_characters(&self, token: Option<&str>) -> Result<Vec<Character>, ClientError>;

    async fn public_characters(&self) -> Result<BTreeMap<String, Vec<Character>>, ClientError>;

    async fn character(&self, id: i64) -> Result<CharacterDetail, ClientError>;

    /// Characters the caller may chat with. An unauthorized caller gets the
    /// public catalog instead.
    async fn visible_characters(&self, token: Option<&str>) -> Result<Vec<Character>, ClientError> {
        match self.list_characters(token).await {
            Err(e) if e.is_unauthorized() => {
                info!("Character list unauthorized, falling back to public characters");
                let grouped = self.public_characters().await?;
                Ok(grouped.into_values().flatten().collect())
            }
            other => other,
        }
    }
}

#[async_trait]
pub trait ConversationApi: Send + Sync {
    async fn my_conversations(&self, token: Option<&str>) -> Result<Vec<Conversation>, ClientError>;

    async fn create_conversation(
        &self,
        token: Option<&str>,
        character_id: i64,
        title: Option<&str>,
        subject: Option<&str>
    ) -> Result<Conversation, ClientError>;

    async fn messages(&self, token: Option<&str>, conversation_id: i64) -> Result<Vec<Message>, ClientError>;

    async fn add_message(
        &self,
        token: Option<&str>,
        conversation_id: i64,
        role: MessageRole,
        content: &str
    ) -> Result<Message, ClientError>;
}

#[async_trait]
pub trait ImageApi: Send + Sync {
    async fn generate_image(&self, request: &ImageRequest) -> Result<ImageGenerationResult, ClientError>;
}
