use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_USER_AGENT: &str = concat!("tldsweep/", env!("CARGO_PKG_VERSION"));

/// Redirect limit for enrichment fetches (title, favicon).
const FETCH_MAX_REDIRECTS: usize = 10;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// Clients used by one prober.
#[derive(Clone)]
pub struct HttpClients {
    /// Never follows redirects; the redirect policy walks the chain itself.
    pub probe: Client,
    /// Follows redirects like a browser would.
    pub fetch: Client,
}

pub fn create_http_clients(
    timeout: Duration,
    user_agent: Option<&str>,
) -> Result<HttpClients, ClientError> {
    let user_agent = user_agent.unwrap_or(DEFAULT_USER_AGENT);
    Ok(HttpClients {
        probe: create_http_pool(timeout, user_agent, Policy::none())?,
        fetch: create_http_pool(timeout, user_agent, Policy::limited(FETCH_MAX_REDIRECTS))?,
    })
}

/// Client for downloading TLD lists, bounded by the same timeout as probes.
pub fn create_list_client(timeout: Duration, user_agent: Option<&str>) -> Result<Client, ClientError> {
    create_http_pool(
        timeout,
        user_agent.unwrap_or(DEFAULT_USER_AGENT),
        Policy::limited(FETCH_MAX_REDIRECTS),
    )
}

fn create_http_pool(timeout: Duration, user_agent: &str, redirect: Policy) -> Result<Client, ClientError> {
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(redirect)
        .user_agent(user_agent)
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_nodelay(true)
        .use_rustls_tls()
        .build()?;
    Ok(client)
}
