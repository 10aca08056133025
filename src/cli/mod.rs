use clap::Parser;

use crate::models::image::{ ImageQuality, ImageSize };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Backend Endpoints ---
    /// Base URL of the REST API that owns characters and conversations (e.g., http://localhost:8000/api/v1)
    #[arg(long, env = "DJANGO_API_URL")] // No default, resolved from --production
    pub django_api_url: Option<String>,

    /// Base URL of the streaming chat and image service (e.g., http://localhost:8080)
    #[arg(long, env = "FASTAPI_URL")]
    pub fastapi_url: Option<String>,

    /// Use the hosted production REST API when no URL is given
    #[arg(long, env = "PRODUCTION", default_value = "false")]
    pub production: bool,

    /// JWT access token of the signed-in user
    #[arg(long, env = "USER_TOKEN")]
    pub user_token: Option<String>,

    // --- Chat Args ---
    /// Character to chat with. Defaults to the first visible character.
    #[arg(short = 'c', long, env = "CHARACTER_ID")]
    pub character_id: Option<i64>,

    /// Sampling temperature sent with every message (0.0 to 2.0)
    #[arg(long, env = "CHAT_TEMPERATURE", default_value = "0.7")]
    pub temperature: f32,

    /// Maximum reply length in tokens (100 to 4000)
    #[arg(long, env = "CHAT_MAX_TOKENS", default_value = "2000")]
    pub max_tokens: u32,

    /// Optional JSON file overriding the notices shown for failed or empty replies
    #[arg(long, env = "NOTICES_PATH")]
    pub notices_path: Option<String>,

    // --- Image Args ---
    /// Generate one image from this prompt instead of opening a chat
    #[arg(long, env = "IMAGE_PROMPT")]
    pub image_prompt: Option<String>,

    /// Image size (1024x1024, 1024x1792, 1792x1024)
    #[arg(long, env = "IMAGE_SIZE", default_value = "1024x1024")]
    pub image_size: ImageSize,

    /// Image quality (standard, hd)
    #[arg(long, env = "IMAGE_QUALITY", default_value = "standard")]
    pub image_quality: ImageQuality,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,
}
