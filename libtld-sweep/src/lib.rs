mod enrich;
mod gate;
mod http;
mod pool;
mod prober;
mod ratelimit;
pub mod redirect;
pub mod report;
pub mod tlds;
mod types;

pub use enrich::{extract_title, favicon_digest};
pub use gate::{ConcurrencyGate, GatePermit};
pub use http::{create_list_client, ClientError};
pub use pool::WorkerPool;
pub use prober::Prober;
pub use ratelimit::RequestPacer;
pub use redirect::{RedirectOutcome, RedirectPolicy};
pub use report::{Display, ReportError, Reporter, Summary};
pub use tlds::{expand_tlds, fetch_iana_tlds, fetch_tld_list, parse_tlds, read_tlds, TldError};
pub use types::{
    is_active_status, Enrichment, FaviconHashMode, PoolConfig, ProbeConfig, ProbeResult,
    NOT_AVAILABLE,
};

pub async fn probe(domain: &str) -> Result<ProbeResult, ClientError> {
    Ok(Prober::new()?.probe_one(domain).await)
}

pub async fn probe_many<I>(domains: I) -> Result<Vec<ProbeResult>, ClientError>
where
    I: IntoIterator<Item = String>,
    I::IntoIter: Send + 'static,
{
    let pool = WorkerPool::new(Prober::new()?, PoolConfig::default());
    Ok(pool.run(domains).await)
}
