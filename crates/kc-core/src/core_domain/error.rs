use crate::core::{AudioId, GuideId, VersionNumber};

// ---------------------------------------------------------------------------
// Sub-error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("backend base URL is not configured (set KC_API_BASE_URL or [backend] base_url)")]
    MissingBaseUrl,
    #[error("backend base URL must start with http:// or https://, got {0}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(
        "could not reach backend at {url}: {message} \
         (check the base URL and the backend's CORS/network policy)"
    )]
    Connection { url: String, message: String },
    #[error("backend returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("unexpected backend payload: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum GuideError {
    #[error("guide file is empty")]
    Empty,
    #[error("guide file has no usable questions or prompts")]
    NoUsableLines,
    #[error("guide JSON is malformed: {0}")]
    MalformedJson(String),
}

#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    #[error("No versions available for audio {audio} and guide {guide}")]
    NoVersions { audio: AudioId, guide: GuideId },
    #[error("analysis version {version} not found")]
    NotFound { version: VersionNumber },
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("artifact not ready after {attempts} attempts")]
    TimedOut { attempts: u32 },
    #[error("polling cancelled")]
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("access denied")]
    Denied,
    #[error("this action requires the admin passphrase")]
    AdminRequired,
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Guide(#[from] GuideError),
    #[error(transparent)]
    Version(#[from] VersionError),
    #[error(transparent)]
    Poll(#[from] PollError),
    #[error(transparent)]
    Access(#[from] AccessError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
