use thiserror::Error;

/// Top-level error type for the `overkiz-api` crate.
///
/// Covers every failure mode of the cloud API: authentication, rate
/// limiting, vendor maintenance windows, transport, and the structured
/// `{error, errorCode}` envelope returned on non-2xx responses.
/// `kizbridge-core` switches on [`ErrorKind`] to decide fatal-vs-logged.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected: the account credentials are wrong.
    #[error("Bad credentials: {message}")]
    BadCredentials { message: String },

    /// Request rejected because the session cookie is missing or expired.
    #[error("Not authenticated -- session expired or never established")]
    NotAuthenticated,

    // ── Cloud ───────────────────────────────────────────────────────
    /// Rate limited by the cloud API (too many requests or executions).
    #[error("Rate limited by the cloud API: {message}")]
    RateLimited { message: String },

    /// The vendor platform is in a maintenance window (HTTP 503).
    #[error("Cloud API is under maintenance")]
    Maintenance,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL construction error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── API ─────────────────────────────────────────────────────────
    /// Structured error from the `{error, errorCode}` envelope that did
    /// not match a more specific classification.
    #[error("Cloud API error (HTTP {status}): {message}")]
    Api {
        message: String,
        code: Option<String>,
        status: u16,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// Closed classification of API failures.
///
/// Call sites switch on this to pick a policy: credential failures are
/// fatal with a cool-down, rate limiting is a hard stop, maintenance is a
/// clean stop, transient failures end the session (restart is delegated
/// to an external supervisor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid account credentials.
    Credentials,
    /// Upstream rate limiting.
    RateLimited,
    /// Vendor maintenance window.
    Maintenance,
    /// Recoverable-transient: disconnects, timeouts, expired sessions,
    /// malformed responses.
    Transient,
    /// Everything else.
    Other,
}

impl Error {
    /// Classify this error into the closed [`ErrorKind`] set.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BadCredentials { .. } => ErrorKind::Credentials,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Maintenance => ErrorKind::Maintenance,
            Self::NotAuthenticated
            | Self::Transport(_)
            | Self::Deserialization { .. } => ErrorKind::Transient,
            Self::InvalidUrl(_) | Self::Api { .. } => ErrorKind::Other,
        }
    }

    /// Returns `true` if the login credentials were rejected outright.
    pub fn is_bad_credentials(&self) -> bool {
        self.kind() == ErrorKind::Credentials
    }

    /// Returns `true` if the cloud API rate-limited the caller.
    pub fn is_rate_limited(&self) -> bool {
        self.kind() == ErrorKind::RateLimited
    }

    /// Returns `true` if the vendor platform is in maintenance.
    pub fn is_maintenance(&self) -> bool {
        self.kind() == ErrorKind::Maintenance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_is_closed_over_variants() {
        let cases = [
            (
                Error::BadCredentials { message: "Bad credentials".into() },
                ErrorKind::Credentials,
            ),
            (Error::NotAuthenticated, ErrorKind::Transient),
            (
                Error::RateLimited { message: "Too many requests".into() },
                ErrorKind::RateLimited,
            ),
            (Error::Maintenance, ErrorKind::Maintenance),
            (
                Error::Api {
                    message: "UNSUPPORTED_OPERATION".into(),
                    code: None,
                    status: 400,
                },
                ErrorKind::Other,
            ),
            (
                Error::Deserialization {
                    message: "expected value".into(),
                    body: "<html>".into(),
                },
                ErrorKind::Transient,
            ),
        ];

        for (err, kind) in cases {
            assert_eq!(err.kind(), kind, "{err}");
        }
    }
}
