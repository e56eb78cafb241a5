use std::error::Error;
use std::fmt;

/// Coarse classification of a failed operation.
///
/// The router only looks at the kind when deciding whether to fall back; the
/// session uses it to pick the guidance shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AuthenticationRequired,
    UsageLimitExceeded,
    Unsupported,
    Transport,
    Decode,
    Validation,
}

/// Errors produced by provider adapters, the router and the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The backend rejected the request because no valid credential was
    /// presented.
    AuthenticationRequired { provider: String, message: String },

    /// The backend accepted the credential but refused service because of a
    /// quota, rate limit or usage policy.
    UsageLimitExceeded { provider: String, message: String },

    /// The capability is not offered by this provider or model.
    Unsupported { provider: String, capability: String },

    /// Network or HTTP level failure.
    Transport {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// A response body, stream frame or file could not be decoded.
    Decode { context: String, message: String },

    /// Caller input was rejected before any request was made.
    Validation(String),
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::AuthenticationRequired { .. } => ErrorKind::AuthenticationRequired,
            ChatError::UsageLimitExceeded { .. } => ErrorKind::UsageLimitExceeded,
            ChatError::Unsupported { .. } => ErrorKind::Unsupported,
            ChatError::Transport { .. } => ErrorKind::Transport,
            ChatError::Decode { .. } => ErrorKind::Decode,
            ChatError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Whether the router may retry the request on a free-tier provider.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::AuthenticationRequired | ErrorKind::UsageLimitExceeded
        )
    }

    pub fn auth(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ChatError::AuthenticationRequired {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn usage_limit(provider: impl Into<String>, message: impl Into<String>) -> Self {
        ChatError::UsageLimitExceeded {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(provider: impl Into<String>, capability: impl Into<String>) -> Self {
        ChatError::Unsupported {
            provider: provider.into(),
            capability: capability.into(),
        }
    }

    pub fn transport(
        provider: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        ChatError::Transport {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn decode(context: impl Into<String>, message: impl Into<String>) -> Self {
        ChatError::Decode {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ChatError::Validation(message.into())
    }

    /// Wrap a `reqwest` failure that happened before a status was known.
    pub fn from_reqwest(provider: &str, err: reqwest::Error) -> Self {
        ChatError::transport(provider, err.status().map(|s| s.as_u16()), err.to_string())
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::AuthenticationRequired { provider, message } => {
                write!(f, "{provider}: authentication required: {message}")
            }
            ChatError::UsageLimitExceeded { provider, message } => {
                write!(f, "{provider}: usage limit reached: {message}")
            }
            ChatError::Unsupported {
                provider,
                capability,
            } => write!(f, "{capability} is not available with {provider}"),
            ChatError::Transport {
                provider,
                status: Some(status),
                message,
            } => write!(f, "{provider}: HTTP {status}: {message}"),
            ChatError::Transport {
                provider,
                status: None,
                message,
            } => write!(f, "{provider}: {message}"),
            ChatError::Decode { context, message } => {
                write!(f, "could not decode {context}: {message}")
            }
            ChatError::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ChatError {}
