use crate::{
    enrich::{favicon_hash, fetch_title, resolve_ip},
    http::{create_http_clients, ClientError, HttpClients},
    ratelimit::RequestPacer,
    redirect::{follow_chain, Hop},
    types::{is_active_status, ProbeConfig, ProbeResult},
};
use reqwest::header::LOCATION;
use std::{sync::Arc, time::Instant};
use tracing::debug;

pub struct Prober {
    clients: HttpClients,
    pacer: Option<RequestPacer>,
    config: Arc<ProbeConfig>,
}

impl Prober {
    pub fn new() -> Result<Self, ClientError> {
        Self::with_config(ProbeConfig::default())
    }

    pub fn with_config(config: ProbeConfig) -> Result<Self, ClientError> {
        let clients = create_http_clients(config.timeout, config.user_agent.as_deref())?;
        let pacer = config.max_requests_per_second.and_then(RequestPacer::per_second);
        Ok(Self {
            clients,
            pacer,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe `http://<domain>` and collect whatever enrichment is enabled.
    ///
    /// Never fails: a transport error yields an inactive result.
    pub async fn probe_one(&self, domain: &str) -> ProbeResult {
        let start = Instant::now();

        let start_hop = match Hop::start(domain) {
            Ok(hop) => hop,
            Err(e) => {
                return ProbeResult::unreachable(domain, format!("Invalid URL: {}", e), start.elapsed());
            }
        };
        let url = start_hop.url.clone();

        let chain = follow_chain(
            &self.clients.probe,
            start_hop,
            &self.config.redirect,
            self.config.timeout,
            self.pacer.as_ref(),
        )
        .await;

        let chain = match chain {
            Ok(chain) => chain,
            Err(e) => {
                debug!(domain, error = %e, "Liveness request failed");
                return ProbeResult::unreachable(domain, e.to_string(), start.elapsed());
            }
        };

        let status = chain.response.status();
        let active = is_active_status(status);
        let location = chain
            .response
            .headers()
            .get(LOCATION)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .unwrap_or_default();
        drop(chain.response);

        let mut result = ProbeResult {
            domain: domain.to_string(),
            active,
            ip: None,
            status_code: Some(status.as_u16()),
            title: None,
            location: None,
            favicon_hash: None,
            redirect: Some(chain.outcome),
            failure: None,
            duration: start.elapsed(),
        };

        if !active {
            return result;
        }

        let enrichment = self.config.enrichment;
        if enrichment.ip {
            result.ip = Some(resolve_ip(&url).await);
        }
        if enrichment.title {
            result.title = Some(fetch_title(&self.clients.fetch, &url, self.pacer.as_ref()).await);
        }
        if enrichment.location {
            result.location = Some(location);
        }
        if enrichment.favicon {
            result.favicon_hash = Some(
                favicon_hash(&self.clients.fetch, &url, self.config.favicon_mode, self.pacer.as_ref()).await,
            );
        }

        result.duration = start.elapsed();
        result
    }
}

impl Clone for Prober {
    fn clone(&self) -> Self {
        Self {
            clients: self.clients.clone(),
            pacer: self.pacer.clone(),
            config: Arc::clone(&self.config),
        }
    }
}
