/// Flat error enum shared by every layer. The render path never returns it;
/// only input boundaries (JSON, config, canvas lookup, stale ticks) do.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    NetworkError(String),
    RenderingError(String),
    ValidationError(String),
    ConfigurationError(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::NetworkError(msg) => write!(f, "Network Error: {}", msg),
            AppError::RenderingError(msg) => write!(f, "Rendering Error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation Error: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration Error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationError(format!("malformed JSON: {}", err))
    }
}

pub type NetworkResult<T> = Result<T, AppError>;
pub type RenderingResult<T> = Result<T, AppError>;
pub type ValidationResult<T> = Result<T, AppError>;
