use thiserror::Error;

/// Classifies feed fetch failures for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// Connection, DNS or TLS failure
    Transport,
    /// Operation timed out
    Timeout,
    /// Server answered with a non-success HTTP status
    Status,
    /// Response body could not be read or decoded
    Body,
}

/// Blocklist engine error types
#[derive(Error, Debug)]
pub enum BlocklistError {
    #[error("Network error: {message}")]
    Network {
        kind: NetworkErrorKind,
        message: String,
    },

    #[error("Malformed URL '{raw}': {reason}")]
    MalformedUrl { raw: String, reason: String },

    #[error("Excluded domain: {0}")]
    ExcludedDomain(String),

    #[error("Cannot parse query URL '{url}': {reason}")]
    QueryParse { url: String, reason: String },

    #[error("Invalid rule pattern: {0}")]
    InvalidPattern(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BlocklistError {
    pub(crate) fn network(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self::Network {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn malformed(raw: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedUrl {
            raw: raw.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether this error is the routine exclusion of a denylisted host.
    pub fn is_excluded(&self) -> bool {
        matches!(self, Self::ExcludedDomain(_))
    }
}

pub type Result<T> = std::result::Result<T, BlocklistError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_error_kind_is_matchable() {
        let err = BlocklistError::network(NetworkErrorKind::Timeout, "feed timed out");
        match &err {
            BlocklistError::Network { kind, .. } => {
                assert!(matches!(kind, NetworkErrorKind::Timeout));
            }
            _ => panic!("expected Network"),
        }
    }

    #[test]
    fn test_network_error_display_includes_message() {
        let err = BlocklistError::network(NetworkErrorKind::Status, "HTTP 503");
        let display = format!("{}", err);
        assert!(display.contains("HTTP 503"), "got: {}", display);
    }

    #[test]
    fn test_malformed_display_includes_raw_input() {
        let err = BlocklistError::malformed("https://", "empty host");
        let display = err.to_string();
        assert!(display.contains("https://"), "got: {}", display);
        assert!(display.contains("empty host"), "got: {}", display);
    }

    #[test]
    fn test_is_excluded() {
        assert!(BlocklistError::ExcludedDomain("vk.com".into()).is_excluded());
        assert!(!BlocklistError::malformed("x", "y").is_excluded());
    }
}
