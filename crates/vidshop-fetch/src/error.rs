//! Fetch error types.

use vidshop_core::ShopError;

/// Result type for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;

/// Errors that can occur while retrieving a remote asset.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The deadline elapsed before the download finished.
    #[error("download did not finish within {seconds}s")]
    Timeout {
        /// The deadline that elapsed, in whole seconds.
        seconds: u64,
    },

    /// The asset is bigger than the caller accepts. `size_bytes` is the
    /// announced length, or the bytes received when the download was cut off.
    #[error("asset is at least {size_bytes} bytes, over the {limit_bytes} byte limit")]
    TooLarge {
        /// Known size of the asset.
        size_bytes: u64,
        /// The limit that was exceeded.
        limit_bytes: u64,
    },

    /// The reference is not a link or ID we know how to retrieve.
    #[error("unrecognized asset reference: {0}")]
    InvalidReference(String),

    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote source answered with a non-success status.
    #[error("remote source returned {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The remote source served a web page instead of the file.
    #[error("asset is not publicly shared")]
    NotShared,

    /// Writing the temporary file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The download task ended without producing a result.
    #[error("download task failed: {0}")]
    Task(String),
}

impl From<FetchError> for ShopError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout { seconds } => Self::FetchTimeout { seconds },
            FetchError::TooLarge {
                size_bytes,
                limit_bytes,
            } => Self::PayloadTooLarge {
                size_bytes,
                limit_bytes,
            },
            other => Self::FetchError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_fetch_timeout() {
        let err: ShopError = FetchError::Timeout { seconds: 120 }.into();
        assert!(matches!(err, ShopError::FetchTimeout { seconds: 120 }));
        assert_eq!(err.code(), "fetch_timeout");
    }

    #[test]
    fn too_large_maps_to_payload_too_large() {
        let err: ShopError = FetchError::TooLarge {
            size_bytes: 4096,
            limit_bytes: 1024,
        }
        .into();
        assert!(matches!(
            err,
            ShopError::PayloadTooLarge {
                size_bytes: 4096,
                limit_bytes: 1024
            }
        ));
        assert!(err.is_refunded_failure());
    }

    #[test]
    fn other_failures_map_to_fetch_error() {
        let err: ShopError = FetchError::Status { status: 403 }.into();
        assert_eq!(err.code(), "fetch_error");
        assert!(err.to_string().contains("403"));

        let err: ShopError = FetchError::NotShared.into();
        assert!(err.to_string().contains("not publicly shared"));
    }
}
