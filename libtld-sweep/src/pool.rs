use crate::{
    gate::ConcurrencyGate,
    prober::Prober,
    types::{PoolConfig, ProbeResult},
};
use futures::stream::{self, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Fixed set of workers draining one shared candidate queue, each probe
/// gated by a [`ConcurrencyGate`].
pub struct WorkerPool {
    prober: Prober,
    gate: ConcurrencyGate,
    workers: usize,
}

impl WorkerPool {
    pub fn new(prober: Prober, config: PoolConfig) -> Self {
        Self {
            prober,
            gate: ConcurrencyGate::new(config.max_in_flight),
            workers: config.workers.max(1),
        }
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Start probing `candidates` in the background.
    ///
    /// Results arrive in completion order. The receiver yields `None` once
    /// every candidate has been probed and every worker has exited. Dropping
    /// the receiver early makes the workers stop after their current probe.
    pub fn spawn<I>(&self, candidates: I) -> mpsc::Receiver<ProbeResult>
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'static,
    {
        let (job_tx, job_rx) = mpsc::channel::<String>(self.workers);
        let (result_tx, result_rx) = mpsc::channel::<ProbeResult>(self.workers);
        let job_rx = Arc::new(Mutex::new(job_rx));

        let candidates = candidates.into_iter();
        tokio::spawn(async move {
            for domain in candidates {
                if job_tx.send(domain).await.is_err() {
                    break;
                }
            }
            // job_tx dropped here closes the queue.
        });

        for id in 0..self.workers {
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            let gate = self.gate.clone();
            let prober = self.prober.clone();

            tokio::spawn(async move {
                loop {
                    let next = job_rx.lock().await.recv().await;
                    let Some(domain) = next else {
                        break;
                    };

                    let permit = match gate.acquire().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            warn!(worker = id, error = %e, "Concurrency gate closed");
                            break;
                        }
                    };
                    let result = prober.probe_one(&domain).await;
                    drop(permit);

                    if result_tx.send(result).await.is_err() {
                        break;
                    }
                }
                debug!(worker = id, "Worker finished");
            });
        }

        result_rx
    }

    /// [`WorkerPool::spawn`] as a stream.
    pub fn probe_stream<I>(&self, candidates: I) -> impl Stream<Item = ProbeResult>
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'static,
    {
        stream::unfold(self.spawn(candidates), |mut rx| async move {
            rx.recv().await.map(|result| (result, rx))
        })
    }

    /// Probe everything and collect the results.
    pub async fn run<I>(&self, candidates: I) -> Vec<ProbeResult>
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'static,
    {
        self.probe_stream(candidates).collect().await
    }
}
