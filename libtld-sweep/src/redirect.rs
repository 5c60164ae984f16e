//! Redirect handling for the primary liveness request.
//!
//! The probe client never follows redirects on its own. Instead every 3xx
//! response is passed to [`RedirectPolicy::decide`], which looks at the URLs
//! visited so far and either follows the hop or ends the chain with a
//! [`RedirectOutcome`] explaining why.
//!
//! Hosts are compared on the authority text as it was written, in the
//! candidate name or the `Location` header, not on the parsed URL. Parsing
//! lowercases hostnames and drops default ports, so `EXAMPLE.com` and
//! `example.com:80` would otherwise count as the host already visited.

use crate::ratelimit::RequestPacer;
use reqwest::{header::LOCATION, Client, Response, StatusCode, Url};
use std::{str::FromStr, time::Duration};
use thiserror::Error;
use tracing::debug;

/// Error from parsing a candidate into a [`Url`].
pub type UrlParseError = <Url as FromStr>::Err;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectPolicy {
    pub follow: bool,
    pub max_redirects: usize,
    /// Allow hops to a different authority than the ones already visited.
    pub cross_host: bool,
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            follow: false,
            max_redirects: 10,
            cross_host: false,
        }
    }
}

/// Why a redirect chain ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// The last response was not a followable redirect.
    Terminal { hops: usize },
    /// Following is disabled; the first 3xx was returned as-is.
    NotFollowed,
    /// The next hop would have left the host(s) visited so far.
    StoppedAtHostBoundary { hops: usize, target: Url },
    /// `max_redirects` hops were already taken.
    StoppedAtMaxDepth { hops: usize },
}

impl RedirectOutcome {
    pub fn hops(&self) -> usize {
        match self {
            RedirectOutcome::Terminal { hops }
            | RedirectOutcome::StoppedAtHostBoundary { hops, .. }
            | RedirectOutcome::StoppedAtMaxDepth { hops } => *hops,
            RedirectOutcome::NotFollowed => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RedirectOutcome::Terminal { .. } => "terminal",
            RedirectOutcome::NotFollowed => "not_followed",
            RedirectOutcome::StoppedAtHostBoundary { .. } => "host_boundary",
            RedirectOutcome::StoppedAtMaxDepth { .. } => "max_depth",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HopDecision {
    Follow,
    Stop(RedirectOutcome),
}

/// One URL of a redirect chain and its authority as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub url: Url,
    pub authority: String,
}

impl Hop {
    /// `http://<domain>`, keeping the authority exactly as given.
    pub fn start(domain: &str) -> Result<Self, UrlParseError> {
        let url = Url::parse(&format!("http://{}", domain))?;
        let authority = raw_authority(&format!("//{}", domain)).unwrap_or_default().to_string();
        Ok(Self { url, authority })
    }

    /// Resolve a `Location` value against this hop. A reference without an
    /// authority of its own stays on the current one.
    pub fn redirect(&self, location: &str) -> Option<Self> {
        let url = self.url.join(location).ok()?;
        let authority = match raw_authority(location) {
            Some(authority) => authority.to_string(),
            None => self.authority.clone(),
        };
        Some(Self { url, authority })
    }
}

/// Authority component of a URL reference, verbatim and without userinfo.
/// `None` for references that do not carry one (`/path`, `?q`, `page.html`).
pub fn raw_authority(reference: &str) -> Option<&str> {
    let reference = reference.trim();
    let rest = match reference.find("://") {
        Some(i) if is_scheme(&reference[..i]) => &reference[i + 3..],
        _ => reference.strip_prefix("//")?,
    };
    let end = rest.find(['/', '?', '#', '\\']).unwrap_or(rest.len());
    let authority = &rest[..end];
    Some(authority.rsplit_once('@').map_or(authority, |(_, host)| host))
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl RedirectPolicy {
    /// Decide whether to follow a redirect to `target`.
    ///
    /// `trace` holds every hop requested so far, starting with the original
    /// one, so `trace.len() - 1` hops have already been taken.
    pub fn decide(&self, trace: &[Hop], target: &Hop) -> HopDecision {
        if !self.follow {
            return HopDecision::Stop(RedirectOutcome::NotFollowed);
        }

        let hops = trace.len().saturating_sub(1);
        if hops >= self.max_redirects {
            return HopDecision::Stop(RedirectOutcome::StoppedAtMaxDepth { hops });
        }

        if !self.cross_host && trace.iter().any(|visited| visited.authority != target.authority) {
            return HopDecision::Stop(RedirectOutcome::StoppedAtHostBoundary {
                hops,
                target: target.url.clone(),
            });
        }

        HopDecision::Follow
    }
}

pub fn is_followable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn redirect_target(response: &Response, current: &Hop) -> Option<Hop> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    current.redirect(location)
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Timeout")]
    Timeout,
    #[error("Request failed: {0}")]
    Request(reqwest::Error),
}

impl From<reqwest::Error> for ChainError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChainError::Timeout
        } else {
            ChainError::Request(e)
        }
    }
}

pub struct RedirectChain {
    pub response: Response,
    pub outcome: RedirectOutcome,
    pub trace: Vec<Hop>,
}

/// Request `start` and walk its redirect chain under `policy`.
///
/// `timeout` bounds each request on its own. Waiting on `pacer` happens
/// before the clock starts, so a slow rate never turns into a timeout.
/// Only transport errors are returned as `Err`; every way a chain can stop is
/// reported through [`RedirectChain::outcome`].
pub async fn follow_chain(
    client: &Client,
    start: Hop,
    policy: &RedirectPolicy,
    timeout: Duration,
    pacer: Option<&RequestPacer>,
) -> Result<RedirectChain, ChainError> {
    let mut trace = vec![start.clone()];
    let mut current = start;

    loop {
        if let Some(pacer) = pacer {
            pacer.wait().await;
        }
        let response = tokio::time::timeout(timeout, client.get(current.url.clone()).send())
            .await
            .map_err(|_| ChainError::Timeout)??;
        let hops = trace.len() - 1;

        if !is_followable(response.status()) {
            return Ok(RedirectChain {
                response,
                outcome: RedirectOutcome::Terminal { hops },
                trace,
            });
        }

        let Some(target) = redirect_target(&response, &current) else {
            return Ok(RedirectChain {
                response,
                outcome: RedirectOutcome::Terminal { hops },
                trace,
            });
        };

        match policy.decide(&trace, &target) {
            HopDecision::Follow => {
                debug!(from = %current.url, to = %target.url, "Following redirect");
                trace.push(target.clone());
                current = target;
            }
            HopDecision::Stop(outcome) => {
                debug!(url = %current.url, outcome = outcome.label(), "Redirect chain stopped");
                return Ok(RedirectChain {
                    response,
                    outcome,
                    trace,
                });
            }
        }
    }
}
