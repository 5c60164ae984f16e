//! Optional per-domain lookups done after a domain has been found active.
//! Each one degrades to a marker value on failure and never affects the
//! liveness verdict.

use crate::{
    ratelimit::RequestPacer,
    types::{FaviconHashMode, NOT_AVAILABLE},
};
use fnv::FnvHasher;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use std::{hash::Hasher, net::IpAddr};
use tracing::debug;

const FAVICON_PATH: &str = "/favicon.ico";

/// Resolve the host of `url` with the system resolver, independently of the
/// connection the probe used.
pub async fn resolve_ip(url: &Url) -> String {
    let Some(host) = url.host_str() else {
        return NOT_AVAILABLE.to_string();
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.to_string();
    }

    let port = url.port_or_known_default().unwrap_or(80);
    match tokio::net::lookup_host((host, port)).await {
        Ok(mut addrs) => addrs
            .next()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        Err(e) => {
            debug!(host, error = %e, "IP lookup failed");
            NOT_AVAILABLE.to_string()
        }
    }
}

pub async fn fetch_title(client: &Client, url: &Url, pacer: Option<&RequestPacer>) -> String {
    if let Some(pacer) = pacer {
        pacer.wait().await;
    }
    let body = match client.get(url.clone()).send().await {
        Ok(response) => match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(%url, error = %e, "Failed to read page body");
                return String::new();
            }
        },
        Err(e) => {
            debug!(%url, error = %e, "Title fetch failed");
            return String::new();
        }
    };
    extract_title(&body)
}

/// Trimmed text of the first `<title>` element, or empty.
pub fn extract_title(html: &str) -> String {
    let Ok(selector) = Selector::parse("title") else {
        return String::new();
    };
    Html::parse_document(html)
        .select(&selector)
        .next()
        .map(|title| title.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

pub async fn favicon_hash(
    client: &Client,
    base: &Url,
    mode: FaviconHashMode,
    pacer: Option<&RequestPacer>,
) -> String {
    let Ok(url) = base.join(FAVICON_PATH) else {
        return NOT_AVAILABLE.to_string();
    };
    if let Some(pacer) = pacer {
        pacer.wait().await;
    }
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!(%url, error = %e, "Favicon fetch failed");
            return NOT_AVAILABLE.to_string();
        }
    };

    match mode {
        FaviconHashMode::PathLiteral => favicon_digest(FAVICON_PATH.as_bytes()),
        FaviconHashMode::Content => match response.bytes().await {
            Ok(bytes) => favicon_digest(&bytes),
            Err(e) => {
                debug!(%url, error = %e, "Failed to read favicon body");
                NOT_AVAILABLE.to_string()
            }
        },
    }
}

/// 64-bit FNV-1a as lowercase hex.
pub fn favicon_digest(bytes: &[u8]) -> String {
    let mut hasher = FnvHasher::default();
    hasher.write(bytes);
    format!("{:x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_fnv1a_64() {
        assert_eq!(favicon_digest(b""), "cbf29ce484222325");
        assert_eq!(favicon_digest(b"/favicon.ico"), "4ebcd113f77428bd");
        assert_eq!(favicon_digest(b"icon-bytes"), "d85a0a4a3538f472");
    }

    #[test]
    fn title_is_trimmed_text_of_first_title() {
        let html = "<html><head><title>\n  Hello World  </title></head>\
                    <body><svg><title>icon</title></svg></body></html>";
        assert_eq!(extract_title(html), "Hello World");
    }

    #[test]
    fn missing_title_is_empty() {
        assert_eq!(extract_title("<html><body>no title</body></html>"), "");
        assert_eq!(extract_title(""), "");
    }

    #[tokio::test]
    async fn literal_ips_skip_the_resolver() {
        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert_eq!(resolve_ip(&url).await, "127.0.0.1");

        let url = Url::parse("http://[::1]/").unwrap();
        assert_eq!(resolve_ip(&url).await, "::1");
    }

    #[tokio::test]
    async fn unresolvable_host_is_not_available() {
        let url = Url::parse("http://does-not-exist.invalid/").unwrap();
        assert_eq!(resolve_ip(&url).await, NOT_AVAILABLE);
    }
}
