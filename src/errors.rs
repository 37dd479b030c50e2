use std::fmt;

#[derive(Debug, Clone)]
pub enum MinilinkError {
    InvalidUrl(String),
    InvalidShortcode(String),
    ShortcodeTaken(String),
    NotFound(String),
    Expired(String),
    DateParse(String),
    Serialization(String),
    StoreUnavailable(String),
    Config(String),
}

impl MinilinkError {
    /// Stable error code, used in API payloads and logs.
    pub fn code(&self) -> &'static str {
        match self {
            MinilinkError::InvalidUrl(_) => "E001",
            MinilinkError::InvalidShortcode(_) => "E002",
            MinilinkError::ShortcodeTaken(_) => "E003",
            MinilinkError::NotFound(_) => "E004",
            MinilinkError::Expired(_) => "E005",
            MinilinkError::DateParse(_) => "E006",
            MinilinkError::Serialization(_) => "E007",
            MinilinkError::StoreUnavailable(_) => "E008",
            MinilinkError::Config(_) => "E009",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            MinilinkError::InvalidUrl(_) => "Invalid URL",
            MinilinkError::InvalidShortcode(_) => "Invalid Shortcode",
            MinilinkError::ShortcodeTaken(_) => "Shortcode Taken",
            MinilinkError::NotFound(_) => "Resource Not Found",
            MinilinkError::Expired(_) => "Shortcode Expired",
            MinilinkError::DateParse(_) => "Date Parse Error",
            MinilinkError::Serialization(_) => "Serialization Error",
            MinilinkError::StoreUnavailable(_) => "Store Unavailable",
            MinilinkError::Config(_) => "Configuration Error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            MinilinkError::InvalidUrl(msg) => msg,
            MinilinkError::InvalidShortcode(msg) => msg,
            MinilinkError::ShortcodeTaken(msg) => msg,
            MinilinkError::NotFound(msg) => msg,
            MinilinkError::Expired(msg) => msg,
            MinilinkError::DateParse(msg) => msg,
            MinilinkError::Serialization(msg) => msg,
            MinilinkError::StoreUnavailable(msg) => msg,
            MinilinkError::Config(msg) => msg,
        }
    }

    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for MinilinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for MinilinkError {}

// Convenience constructors
impl MinilinkError {
    pub fn invalid_url<T: Into<String>>(msg: T) -> Self {
        MinilinkError::InvalidUrl(msg.into())
    }

    pub fn invalid_shortcode<T: Into<String>>(msg: T) -> Self {
        MinilinkError::InvalidShortcode(msg.into())
    }

    pub fn shortcode_taken<T: Into<String>>(msg: T) -> Self {
        MinilinkError::ShortcodeTaken(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        MinilinkError::NotFound(msg.into())
    }

    pub fn expired<T: Into<String>>(msg: T) -> Self {
        MinilinkError::Expired(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        MinilinkError::DateParse(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        MinilinkError::Serialization(msg.into())
    }

    pub fn store_unavailable<T: Into<String>>(msg: T) -> Self {
        MinilinkError::StoreUnavailable(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        MinilinkError::Config(msg.into())
    }
}

// From impls for the error types that cross the storage boundary
impl From<std::io::Error> for MinilinkError {
    fn from(err: std::io::Error) -> Self {
        MinilinkError::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for MinilinkError {
    fn from(err: serde_json::Error) -> Self {
        MinilinkError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for MinilinkError {
    fn from(err: chrono::ParseError) -> Self {
        MinilinkError::DateParse(err.to_string())
    }
}

impl From<rusqlite::Error> for MinilinkError {
    fn from(err: rusqlite::Error) -> Self {
        MinilinkError::StoreUnavailable(err.to_string())
    }
}

impl From<r2d2::Error> for MinilinkError {
    fn from(err: r2d2::Error) -> Self {
        MinilinkError::StoreUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MinilinkError>;
