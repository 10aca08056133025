use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use log::info;

#[derive(Debug)]
pub enum NoticeError {
    MissingPlaceholder(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for NoticeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoticeError::MissingPlaceholder(key) =>
                write!(f, "Notice '{}' must contain the {{error}} placeholder", key),
            NoticeError::IoError(e) => write!(f, "Notice file IO error: {}", e),
            NoticeError::JsonError(e) => write!(f, "Notice JSON parsing error: {}", e),
        }
    }
}

impl Error for NoticeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NoticeError::IoError(e) => Some(e),
            NoticeError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NoticeError {
    fn from(err: std::io::Error) -> Self {
        NoticeError::IoError(err)
    }
}

impl From<serde_json::Error> for NoticeError {
    fn from(err: serde_json::Error) -> Self {
        NoticeError::JsonError(err)
    }
}

/// User-facing annotations written into the transcript when a reply cannot be
/// shown, plus the greeting used for characters without one.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Notices {
    pub upstream_error: String,
    pub no_response: String,
    pub send_failure: String,
    pub default_greeting: String,
    #[serde(skip)]
    pub last_loaded: Option<SystemTime>,
}

impl Default for Notices {
    fn default() -> Self {
        Self {
            upstream_error: "⚠️ 오류: {error}".to_string(),
            no_response: "죄송합니다. AI 응답을 받지 못했습니다.".to_string(),
            send_failure: "죄송합니다. 메시지 전송 중 오류가 발생했습니다.".to_string(),
            default_greeting: "안녕하세요! 무엇을 도와드릴까요?".to_string(),
            last_loaded: None,
        }
    }
}

impl Notices {
    fn validate(&self) -> Result<(), NoticeError> {
        if !self.upstream_error.contains("{error}") {
            return Err(NoticeError::MissingPlaceholder("upstream_error".to_string()));
        }
        Ok(())
    }

    pub fn upstream_error(&self, error: &str) -> String {
        self.upstream_error.replace("{error}", error)
    }

    pub fn greeting_or_default<'a>(&'a self, greeting: &'a str) -> &'a str {
        if greeting.trim().is_empty() { &self.default_greeting } else { greeting }
    }
}

pub fn load_notices<P: AsRef<Path>>(path: P) -> Result<Arc<Notices>, NoticeError> {
    let file_content = fs::read_to_string(&path)?;
    let mut notices: Notices = serde_json::from_str(&file_content)?;
    notices.validate()?;
    notices.last_loaded = Some(SystemTime::now());
    info!("Loaded notices from {}", path.as_ref().display());
    Ok(Arc::new(notices))
}

pub fn reload_notices_if_changed<P: AsRef<Path>>(
    path: P,
    current: &Arc<Notices>
) -> Result<Option<Arc<Notices>>, NoticeError> {
    let modified = fs::metadata(&path)?.modified()?;
    match current.last_loaded {
        Some(last_loaded) if modified <= last_loaded => Ok(None),
        _ => {
            info!("Notices file changed, reloading...");
            load_notices(path).map(Some)
        }
    }
}
