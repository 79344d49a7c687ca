use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch of {url} failed after {attempts} attempt(s): {source}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        #[source]
        source: Box<AppError>,
    },

    #[error("Unexpected HTTP status {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Unknown provider: {provider}")]
    UnknownProvider { provider: String },

    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Invalid selector: {selector}")]
    InvalidSelector { selector: String },

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {resource}")]
    NotFound { resource: String },
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(format!("{}", err))
    }
}

impl From<lettre::error::Error> for AppError {
    fn from(err: lettre::error::Error) -> Self {
        AppError::Notification(format!("{}", err))
    }
}

impl From<lettre::transport::smtp::Error> for AppError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        AppError::Notification(format!("{}", err))
    }
}

impl From<lettre::address::AddressError> for AppError {
    fn from(err: lettre::address::AddressError) -> Self {
        AppError::Notification(format!("Invalid address: {}", err))
    }
}

impl AppError {
    /// True for errors raised while talking to the remote source.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            AppError::FetchExhausted { .. } | AppError::Http(_) | AppError::HttpStatus { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
