use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreeningError {
    #[error("Missing credential: {0} is not set")]
    MissingCredential(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {method} {path} failed ({}): {message}", display_status(.status))]
    Provider {
        method: String,
        path: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => "transport".to_string(),
    }
}

impl ScreeningError {
    pub fn provider(method: &str, path: &str, status: Option<u16>, message: impl Into<String>) -> Self {
        ScreeningError::Provider {
            method: method.to_string(),
            path: path.to_string(),
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by a provider error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ScreeningError::Provider { status, .. } => *status,
            _ => None,
        }
    }
}
