use std::process::ExitCode;

/// Failures of a single consultation turn.
///
/// None of these end the session; they are shown to the user and the
/// conversation carries on.
#[derive(Debug, thiserror::Error)]
pub enum ConsultError {
    #[error(
        "Please provide a more detailed pitch (at least {min_chars} characters) to start the consultation."
    )]
    Validation { min_chars: usize },

    #[error("no startup idea saved yet; pitch your idea first")]
    NoIdea,

    #[error("an idea is already saved; reset to start a new consultation")]
    IdeaLocked,

    #[error("a consultation is already in progress; wait for the reply")]
    Busy,

    #[error("Maximum retry attempts reached for rate limiting ({attempts} attempts).")]
    RateLimitExhausted { attempts: u32 },

    #[error("API call failed with status: {status} {reason}")]
    Api { status: u16, reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("API key not set: export {var}")]
    MissingApiKey { var: String },

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
}

impl ConsultError {
    /// True for failures that happened talking to the remote service.
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::RateLimitExhausted { .. }
                | Self::Api { .. }
                | Self::Transport(_)
                | Self::Decode(_)
        )
    }
}

/// Errors that cause pitchdesk to exit with a specific code.
#[derive(Debug, thiserror::Error)]
pub enum ExitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    Api(String),

    #[error("{0}")]
    Other(String),
}

impl ExitError {
    pub const fn code(&self) -> u8 {
        match self {
            ExitError::Config(_) => 2,
            ExitError::Validation(_) => 3,
            ExitError::RateLimited(_) => 4,
            ExitError::Api(_) => 5,
            ExitError::Other(_) => 1,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

impl From<ConsultError> for ExitError {
    fn from(err: ConsultError) -> Self {
        let message = err.to_string();
        match err {
            ConsultError::Validation { .. } | ConsultError::NoIdea | ConsultError::IdeaLocked => {
                Self::Validation(message)
            }
            ConsultError::MissingApiKey { .. } => Self::Config(message),
            ConsultError::RateLimitExhausted { .. } => Self::RateLimited(message),
            ConsultError::Api { .. } | ConsultError::Transport(_) | ConsultError::Decode(_) => {
                Self::Api(message)
            }
            ConsultError::Busy | ConsultError::Template(_) => Self::Other(message),
        }
    }
}
