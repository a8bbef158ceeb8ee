use thiserror::Error;

#[derive(Debug, Error)]
pub enum EduCopyError {
    #[error("Please configure the API key and endpoint first")]
    ConfigMissing,

    #[error("Please select some text first")]
    NoSelection,

    #[error("API request failed: {0}")]
    InferenceFailure(String),

    #[error("Could not parse API response: {0}")]
    ResponseUnparseable(String),

    #[error("Delivery failed after {attempts} attempts: {last_error}")]
    DeliveryExhausted { attempts: u32, last_error: String },

    #[error("Selection too small ({width:.0}x{height:.0}), please select again")]
    CaptureTooSmall { width: f64, height: f64 },

    #[error("Capture failed: {0}")]
    CaptureFailure(String),

    #[error("Please place the cursor in an input field")]
    NoFocusTarget,

    #[error("Another on-page interaction is in progress")]
    Busy,

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Task cancelled")]
    Cancelled,
}

impl serde::Serialize for EduCopyError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type EduCopyResult<T> = Result<T, EduCopyError>;
