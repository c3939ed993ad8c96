use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by fragment loading.
///
/// Writing, reading and resetting the container never fail, so every variant here comes from
/// the fetch path.
#[derive(Debug, Error)]
pub enum FixtureError {
    /// The resource answered with a non-success status.
    #[error("Error in network response when fetching {filename} (status {status}).")]
    Fetch { filename: String, status: u16 },

    /// The fetcher itself failed (connection refused, DNS, unreadable file, bad body).
    #[error("failed to fetch {path}")]
    Transport {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error("fetching {filename} timed out after {after:?}")]
    TimedOut { filename: String, after: Duration },

    #[error("fetching {filename} was cancelled")]
    Cancelled { filename: String },
}

impl FixtureError {
    pub(crate) fn transport<E>(path: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// The HTTP-style status for a [`FixtureError::Fetch`] failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch { status, .. } => Some(*status),
            _ => None,
        }
    }
}
