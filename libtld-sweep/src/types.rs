use crate::redirect::{RedirectOutcome, RedirectPolicy};
use reqwest::StatusCode;
use std::time::Duration;

/// Marker used when an enrichment lookup (IP, favicon) fails.
pub const NOT_AVAILABLE: &str = "N/A";

/// A domain counts as live when its terminal response is one of these.
pub fn is_active_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK | StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub domain: String,
    pub active: bool,
    pub ip: Option<String>,
    pub status_code: Option<u16>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub favicon_hash: Option<String>,
    pub redirect: Option<RedirectOutcome>,
    pub failure: Option<String>,
    pub duration: Duration,
}

impl ProbeResult {
    /// Result for a probe that never got a response.
    pub fn unreachable(domain: &str, reason: impl Into<String>, duration: Duration) -> Self {
        Self {
            domain: domain.to_string(),
            active: false,
            ip: None,
            status_code: None,
            title: None,
            location: None,
            favicon_hash: None,
            redirect: None,
            failure: Some(reason.into()),
            duration,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.status_code.is_some()
    }
}

/// What to do with the favicon once it has been fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaviconHashMode {
    /// Hash the bytes of the fetched `/favicon.ico`.
    Content,
    /// Hash the literal request path once the fetch succeeds. Every reachable
    /// favicon gets the same value, which matches the output of older tooling.
    #[default]
    PathLiteral,
}

/// Which optional fields to collect for active domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Enrichment {
    pub ip: bool,
    pub title: bool,
    pub location: bool,
    pub favicon: bool,
}

impl Enrichment {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            ip: true,
            title: true,
            location: true,
            favicon: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub timeout: Duration,
    pub redirect: RedirectPolicy,
    pub enrichment: Enrichment,
    pub favicon_mode: FaviconHashMode,
    /// Hard requests-per-second ceiling across every outbound request.
    pub max_requests_per_second: Option<u32>,
    pub user_agent: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            redirect: RedirectPolicy::default(),
            enrichment: Enrichment::none(),
            favicon_mode: FaviconHashMode::default(),
            max_requests_per_second: None,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
    /// Maximum number of probes in flight at once.
    pub max_in_flight: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 50,
            max_in_flight: 150,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ok_and_two_redirects_are_active() {
        assert!(is_active_status(StatusCode::OK));
        assert!(is_active_status(StatusCode::MOVED_PERMANENTLY));
        assert!(is_active_status(StatusCode::FOUND));

        for status in [
            StatusCode::NO_CONTENT,
            StatusCode::SEE_OTHER,
            StatusCode::TEMPORARY_REDIRECT,
            StatusCode::PERMANENT_REDIRECT,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            assert!(!is_active_status(status), "{status} should be inactive");
        }
    }

    #[test]
    fn unreachable_result_carries_only_the_reason() {
        let result = ProbeResult::unreachable("example.invalid", "connection refused", Duration::ZERO);
        assert!(!result.active);
        assert!(!result.is_reachable());
        assert_eq!(result.failure.as_deref(), Some("connection refused"));
        assert!(result.ip.is_none());
        assert!(result.title.is_none());
        assert!(result.location.is_none());
        assert!(result.favicon_hash.is_none());
    }
}
