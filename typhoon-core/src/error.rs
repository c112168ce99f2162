use std::time::Duration;

use thiserror::Error;

use crate::provider::ProviderId;

/// Transport-level failures raised inside a provider.
///
/// These never leave [`crate::provider::TyphoonProvider::fetch`]; they are
/// logged and turned into an empty result for that pass.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} responded with status {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("provider '{provider}' did not answer within {after:?}")]
    Timeout { provider: ProviderId, after: Duration },
}

impl FetchError {
    /// A 404 from an archive lookup just means the storm number is unused.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FetchError::Status { status, .. } if *status == reqwest::StatusCode::NOT_FOUND
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> FetchError {
        FetchError::Status {
            url: "https://example.test/b.dat".into(),
            status: reqwest::StatusCode::from_u16(code).unwrap(),
            body: String::new(),
        }
    }

    #[test]
    fn only_404_counts_as_not_found() {
        assert!(status(404).is_not_found());
        assert!(!status(500).is_not_found());

        let timeout = FetchError::Timeout {
            provider: ProviderId::BestTrack,
            after: Duration::from_secs(1),
        };
        assert!(!timeout.is_not_found());
        assert_eq!(timeout.to_string(), "provider 'best-track' did not answer within 1s");
    }
}
