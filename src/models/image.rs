use serde::{ Serialize, Deserialize };
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageSize {
    #[serde(rename = "1024x1024")]
    Square,
    #[serde(rename = "1024x1792")]
    Portrait,
    #[serde(rename = "1792x1024")]
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    Standard,
    Hd,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseImageOptionError {
    message: String,
}

impl fmt::Display for ParseImageOptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseImageOptionError {}

impl FromStr for ImageSize {
    type Err = ParseImageOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1024x1024" | "square" => Ok(ImageSize::Square),
            "1024x1792" | "portrait" => Ok(ImageSize::Portrait),
            "1792x1024" | "landscape" => Ok(ImageSize::Landscape),
            _ =>
                Err(ParseImageOptionError {
                    message: format!("Invalid image size: '{}'", s),
                }),
        }
    }
}

impl FromStr for ImageQuality {
    type Err = ParseImageOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(ImageQuality::Standard),
            "hd" => Ok(ImageQuality::Hd),
            _ =>
                Err(ParseImageOptionError {
                    message: format!("Invalid image quality: '{}'", s),
                }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageRequest {
    pub prompt: String,
    pub size: ImageSize,
    pub quality: ImageQuality,
    pub user_token: String,
    pub save_to_db: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageGenerationResult {
    pub url: String,
    #[serde(default)]
    pub revised_prompt: String,
    #[serde(default)]
    pub model: String,
}
