use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use serde_json::Value as JsonValue;
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub category_display: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub subject_display: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub usage_count: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExampleConversation {
    pub user: String,
    pub char: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CharacterDetail {
    #[serde(flatten)]
    pub character: Character,
    #[serde(default)]
    pub personality_traits: HashMap<String, JsonValue>,
    #[serde(default)]
    pub background_story: String,
    #[serde(default)]
    pub world_setting: String,
    #[serde(default)]
    pub teaching_style: String,
    #[serde(default)]
    pub example_conversations: Vec<ExampleConversation>,
    #[serde(default)]
    pub greeting_message: String,
    #[serde(default)]
    pub narration_style: String,
    #[serde(default)]
    pub narration_template: String,
    #[serde(default)]
    pub creativity: Option<f32>,
    #[serde(default)]
    pub context_length: Option<u32>,
}

/// `/characters/` answers either with a DRF page or a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CharacterList {
    Paginated { results: Vec<Character> },
    Plain(Vec<Character>),
}

impl CharacterList {
    pub fn into_vec(self) -> Vec<Character> {
        match self {
            CharacterList::Paginated { results } => results,
            CharacterList::Plain(list) => list,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub character: i64,
    #[serde(default)]
    pub character_name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation: i64,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub token_usage: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct NewConversation<'a> {
    pub character: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct NewMessage<'a> {
    pub role: MessageRole,
    pub content: &'a str,
}
