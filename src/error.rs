//! Error types.
//!
//! Most of the crate works with `anyhow`. The one error that callers need to tell apart from the
//! rest is `TransportError`: the controller recovers from it locally, while every other error is
//! treated as a bug and propagated.

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// A failure that originated in the transport layer (network or HTTP) while talking to the ledger
/// server.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("unable to connect to the ledger server: {0}")]
    Connect(String),

    #[error("the request to the ledger server timed out")]
    Timeout,

    #[error("the ledger server responded with status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("unable to decode the ledger server response: {0}")]
    Decode(String),

    /// Raised by the in-memory remote when a failure has been scheduled for an operation.
    #[error("simulated transport failure during {0}")]
    Injected(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            TransportError::Status {
                code: status.as_u16(),
                body: String::new(),
            }
        } else {
            TransportError::Connect(e.to_string())
        }
    }
}

/// Returns the `TransportError` carried anywhere in the chain of `e`, if there is one.
pub(crate) fn transport_error(e: &Error) -> Option<&TransportError> {
    e.chain().find_map(|cause| cause.downcast_ref::<TransportError>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_transport_error_found_through_context() {
        let result = Err::<(), _>(TransportError::Timeout).context("Failed to fetch month data");
        let e = result.unwrap_err();
        assert_eq!(transport_error(&e), Some(&TransportError::Timeout));
    }

    #[test]
    fn test_other_errors_are_not_transport_errors() {
        let e = anyhow::anyhow!("Invalid month 13");
        assert!(transport_error(&e).is_none());
    }

    #[test]
    fn test_status_display() {
        let e = TransportError::Status {
            code: 500,
            body: "boom".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "the ledger server responded with status 500: boom"
        );
    }
}
