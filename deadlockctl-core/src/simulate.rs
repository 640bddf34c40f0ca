//! Gated concurrent dispatch
//!
//! Spawns N workers, holds them behind a one-shot [`Gate`] until every one of
//! them is parked, then opens it so they all hit the database together. The
//! caller resumes only after every worker has finished.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::{watch, Barrier};
use tokio::task::JoinSet;
use tracing::{debug, info, info_span, warn, Instrument};

/// One-shot broadcast signal. Closed until [`Gate::open`]; never closes again.
#[derive(Debug)]
pub struct Gate {
    tx: watch::Sender<bool>,
}

/// Worker-side view of a [`Gate`]
#[derive(Debug, Clone)]
pub struct GateWatch {
    rx: watch::Receiver<bool>,
}

impl Gate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn watch(&self) -> GateWatch {
        GateWatch {
            rx: self.tx.subscribe(),
        }
    }

    /// Release every current and future waiter.
    pub fn open(self) {
        self.tx.send_replace(true);
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

impl GateWatch {
    pub fn is_open(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the gate to open. Returns `false` if the gate was dropped
    /// without ever opening.
    pub async fn wait(&mut self) -> bool {
        self.rx.wait_for(|open| *open).await.is_ok()
    }
}

/// How the workers of one dispatch ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub completed: usize,
    /// Workers whose task panicked; their work did not run to completion
    pub panicked: usize,
}

impl DispatchSummary {
    pub fn total(&self) -> usize {
        self.completed + self.panicked
    }
}

/// Run `work` on `concurrency` workers released together.
pub async fn simulate<F, Fut>(concurrency: NonZeroUsize, work: F) -> DispatchSummary
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    dispatch(concurrency, Gate::new(), work).await
}

/// Like [`simulate`], with a caller-supplied gate so the caller can hold a
/// [`GateWatch`] of its own.
pub async fn dispatch<F, Fut>(concurrency: NonZeroUsize, gate: Gate, work: F) -> DispatchSummary
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let workers = concurrency.get();
    let work = Arc::new(work);
    // Workers plus the dispatcher itself.
    let parked = Arc::new(Barrier::new(workers + 1));
    let mut tasks = JoinSet::new();

    for id in 0..workers {
        let work = Arc::clone(&work);
        let parked = Arc::clone(&parked);
        let mut release = gate.watch();
        tasks.spawn(
            async move {
                parked.wait().await;
                if release.wait().await {
                    work().await;
                }
            }
            .instrument(info_span!("worker", id)),
        );
    }

    parked.wait().await;
    info!(workers, "releasing workers");
    gate.open();

    let mut summary = DispatchSummary::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(()) => summary.completed += 1,
            Err(err) => {
                summary.panicked += 1;
                warn!(error = %err, "worker did not complete");
            }
        }
    }
    debug!(
        completed = summary.completed,
        panicked = summary.panicked,
        "all workers finished"
    );
    summary
}
