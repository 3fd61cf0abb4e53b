// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Lazy, single-instance supervision of the protocol engine task.
//!
//! The supervisor owns the only engine task of the process. The first call to
//! [`EngineSupervisor::ensure_running`] spawns it; later calls hand out the
//! same [`EngineHandle`] until the task dies, at which point the next call
//! starts a replacement with a higher generation number.
//!
//! Start-up is explicit: the spawned task opens the duplex pair, sends the
//! transport end back over a one-shot channel and only then begins to run the
//! engine. Callers never write to a pair whose reader does not exist yet.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use mcp_engine::{
    CorrelationId, JsonRpcMessage, ProtocolEngine, SessionMessage, TransportStreams, duplex,
};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::BridgeError;

/// Replies awaited by in-flight requests, keyed by correlation id.
#[derive(Debug, Default)]
pub struct PendingReplies {
    waiters: DashMap<CorrelationId, oneshot::Sender<JsonRpcMessage>>,
    closed: AtomicBool,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a reply slot for `correlation`.
    ///
    /// Fails once the engine's outbound side has closed.
    pub fn register(
        &self,
        correlation: CorrelationId,
    ) -> Result<oneshot::Receiver<JsonRpcMessage>, BridgeError> {
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(correlation, tx);
        // Checked after insertion: `route` marks the table closed before
        // draining it, so either the drain sees this slot or we see the flag.
        if self.closed.load(Ordering::SeqCst) {
            self.waiters.remove(&correlation);
            return Err(BridgeError::EngineRoundTrip(
                "engine outbound stream closed".to_string(),
            ));
        }
        Ok(rx)
    }

    /// Drop the slot for `correlation` if it is still pending.
    pub fn cancel(&self, correlation: CorrelationId) {
        self.waiters.remove(&correlation);
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Deliver engine output to waiting callers until the engine closes its
    /// outbound side, then fail every caller still waiting.
    pub async fn route(&self, mut outbound: mpsc::UnboundedReceiver<SessionMessage>) {
        while let Some(envelope) = outbound.recv().await {
            let Some(correlation) = envelope.correlation else {
                debug!(
                    method = ?envelope.message.method(),
                    "Dropping uncorrelated engine message"
                );
                continue;
            };

            match self.waiters.remove(&correlation) {
                Some((_, waiter)) => {
                    if waiter.send(envelope.message).is_err() {
                        debug!(correlation, "Reply waiter went away");
                    }
                }
                None => {
                    debug!(correlation, "Dropping reply with no waiter");
                }
            }
        }

        self.close();
    }

    /// Refuse new slots and fail every caller still waiting.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let orphaned = self.waiters.len();
        self.waiters.clear();
        if orphaned > 0 {
            warn!(orphaned, "Engine closed with replies outstanding");
        }
    }
}

/// Closes the reply table when the engine task ends, including by panic.
struct CloseOnDrop(Arc<PendingReplies>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// The bridge's end of a running engine task.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    generation: u64,
    inbound: mpsc::UnboundedSender<SessionMessage>,
    pending: Arc<PendingReplies>,
}

impl EngineHandle {
    /// Ordinal of the task within this process, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Write one envelope to the engine's inbound side.
    pub fn submit(&self, envelope: SessionMessage) -> Result<(), BridgeError> {
        self.inbound.send(envelope).map_err(|_| {
            BridgeError::EngineRoundTrip("engine inbound stream closed".to_string())
        })
    }

    /// Reserve a reply slot before submitting a request.
    pub fn expect_reply(
        &self,
        correlation: CorrelationId,
    ) -> Result<oneshot::Receiver<JsonRpcMessage>, BridgeError> {
        self.pending.register(correlation)
    }

    pub fn cancel_reply(&self, correlation: CorrelationId) {
        self.pending.cancel(correlation);
    }

    /// Whether the engine can still accept and answer messages.
    pub fn is_usable(&self) -> bool {
        !self.inbound.is_closed() && !self.pending.is_closed()
    }
}

struct EngineTask {
    join: JoinHandle<()>,
    handle: EngineHandle,
}

impl EngineTask {
    fn is_alive(&self) -> bool {
        !self.join.is_finished() && self.handle.is_usable()
    }
}

/// Owner of the process-wide engine task.
pub struct EngineSupervisor {
    engine: Arc<dyn ProtocolEngine>,
    slot: Mutex<Option<EngineTask>>,
    generation: AtomicU64,
}

impl std::fmt::Debug for EngineSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSupervisor")
            .field("engine", &"...")
            .field("generation", &self.generation())
            .finish()
    }
}

impl EngineSupervisor {
    pub fn new(engine: Arc<dyn ProtocolEngine>) -> Self {
        Self {
            engine,
            slot: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Return the live engine handle, starting a task first if none is alive.
    ///
    /// The slot lock is held across spawn and readiness wait, so concurrent
    /// callers all receive the handle of the same task.
    pub async fn ensure_running(&self) -> Result<EngineHandle, BridgeError> {
        let mut slot = self.slot.lock().await;

        if let Some(task) = slot.as_ref() {
            if task.is_alive() {
                return Ok(task.handle.clone());
            }
            info!(
                generation = task.handle.generation,
                "Engine task ended; starting replacement"
            );
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (ready_tx, ready_rx) = oneshot::channel();
        let join = tokio::spawn(run_engine_task(self.engine.clone(), generation, ready_tx));

        let handle = match ready_rx.await {
            Ok(handle) => handle,
            Err(_) => {
                *slot = None;
                error!(generation, "Engine task exited before signalling readiness");
                return Err(BridgeError::EngineUnavailable(format!(
                    "engine task {} exited before it was ready",
                    generation
                )));
            }
        };

        info!(generation, "Engine task started");
        *slot = Some(EngineTask {
            join,
            handle: handle.clone(),
        });
        Ok(handle)
    }

    /// Number of engine tasks started so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether an engine task is currently alive.
    pub async fn is_running(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .is_some_and(EngineTask::is_alive)
    }
}

/// Body of the engine task: open the pair, report readiness, then run the
/// engine and the reply router side by side until the engine stops.
async fn run_engine_task(
    engine: Arc<dyn ProtocolEngine>,
    generation: u64,
    ready: oneshot::Sender<EngineHandle>,
) {
    let (engine_streams, transport) = duplex::open();
    let TransportStreams { inbound, outbound } = transport;

    let pending = Arc::new(PendingReplies::new());
    let handle = EngineHandle {
        generation,
        inbound,
        pending: pending.clone(),
    };

    if ready.send(handle).is_err() {
        warn!(generation, "Supervisor stopped waiting; engine task not started");
        return;
    }

    let _close = CloseOnDrop(pending.clone());

    let (result, ()) = tokio::join!(engine.run(engine_streams), pending.route(outbound));

    match result {
        Ok(()) => info!(generation, "Engine task finished"),
        Err(e) => error!(generation, error = %e, "Engine task failed"),
    }
}
