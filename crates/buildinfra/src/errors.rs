use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum InfraError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid orchestrator url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Orchestrator returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Orchestrator returned an empty result")]
    EmptyResult,

    #[error("Profile has not been loaded")]
    NotLoaded,
}

impl InfraError {
    /// The message shown to a user, without the transport prefix.
    pub fn user_message(&self) -> String {
        match self {
            InfraError::Api { message, .. } => message.clone(),
            InfraError::NotFound(name) => format!("Profile {} does not exist", name),
            InfraError::InvalidInput(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type InfraResult<T> = Result<T, InfraError>;

/// Rejections raised by the profile reducer. These never reach the network and
/// leave the form state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileActionError {
    #[error("Target platform {0} already exists")]
    PlatformExists(String),

    #[error("Target platform {0} does not exist")]
    PlatformNotFound(String),

    #[error("The default target platform cannot be removed or renamed")]
    DefaultPlatformRequired,

    #[error("Target platform name cannot be empty")]
    EmptyPlatformName,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_user_message() {
        let err = InfraError::Api {
            status: 409,
            message: "profile already exists".to_string(),
        };
        assert_eq!(err.user_message(), "profile already exists");
        assert_eq!(
            err.to_string(),
            "Orchestrator returned 409: profile already exists"
        );
    }

    #[test]
    fn test_not_found_user_message() {
        let err = InfraError::NotFound("small".to_string());
        assert_eq!(err.user_message(), "Profile small does not exist");
    }
}
