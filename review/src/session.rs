//! Request/response analysis over one engine process.

use cozy_chess::Move;
use engine::{EngineCommand, EngineEvent, Evaluation, SearchInfo, UciProcess};
use std::time::Duration;
use tokio::time::Instant;

/// Wall-clock budget for one analysis request. When it expires the caller
/// gets the deepest partial result seen so far instead of an error.
pub const DEFAULT_ANALYZE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for the engine to acknowledge a `stop` before assuming
/// the terminal line was lost.
const STOP_GRACE: Duration = Duration::from_millis(500);

/// Turns engine events into "evaluate this position" request/response
/// semantics over exactly one [`UciProcess`].
///
/// Invariant: at most one search is in flight. A new request always stops
/// and drains the previous one first, because interleaved searches corrupt
/// the protocol framing.
pub struct AnalysisSession {
    engine: UciProcess,
    timeout: Duration,
    in_flight: bool,
    /// Latest progress snapshot of the current search; this is what the
    /// timeout and cancellation paths resolve with.
    last_partial: Option<SearchInfo>,
}

impl AnalysisSession {
    pub fn new(engine: UciProcess) -> Self {
        Self::with_timeout(engine, DEFAULT_ANALYZE_TIMEOUT)
    }

    pub fn with_timeout(engine: UciProcess, timeout: Duration) -> Self {
        Self {
            engine,
            timeout,
            in_flight: false,
            last_partial: None,
        }
    }

    /// Evaluate the position given by `fen` with a depth-bounded search.
    ///
    /// Never fails: engine faults and timeouts resolve to the best-known
    /// (possibly neutral) evaluation.
    pub async fn analyze(&mut self, fen: &str, depth: u32) -> Evaluation {
        self.analyze_position(Some(fen.to_string()), Vec::new(), depth)
            .await
    }

    /// Evaluate the position reached from the start position after `moves`,
    /// letting the engine apply the move list itself. Yields the same
    /// result as [`analyze`](Self::analyze) on the resulting FEN.
    pub async fn analyze_from_moves(&mut self, moves: &[Move], depth: u32) -> Evaluation {
        self.analyze_position(None, moves.to_vec(), depth).await
    }

    /// Set the engine's position without searching.
    pub async fn set_position(&mut self, fen: &str) {
        self.engine
            .send(EngineCommand::SetPosition {
                fen: Some(fen.to_string()),
                moves: Vec::new(),
            })
            .await;
    }

    /// Cancel the current search, resolving with the best-known partial.
    pub async fn stop(&mut self) -> Evaluation {
        if self.in_flight {
            self.engine.send(EngineCommand::Stop).await;
            self.drain_stale_search().await;
        }
        Evaluation::from_parts(self.last_partial.take(), None)
    }

    pub fn is_faulted(&self) -> bool {
        self.engine.is_faulted()
    }

    pub async fn shutdown(self) {
        self.engine.shutdown().await;
    }

    async fn analyze_position(
        &mut self,
        fen: Option<String>,
        moves: Vec<Move>,
        depth: u32,
    ) -> Evaluation {
        if self.engine.is_faulted() {
            tracing::debug!("Engine is faulted; returning neutral evaluation");
            return Evaluation::default();
        }

        // Single-flight: a previous request may have timed out while the
        // engine kept searching. Interrupt it and drain its terminal line
        // before reusing the channel.
        if self.in_flight {
            self.engine.send(EngineCommand::Stop).await;
            self.drain_stale_search().await;
        }

        self.last_partial = None;
        self.engine
            .send(EngineCommand::SetPosition { fen, moves })
            .await;
        self.engine.send(EngineCommand::Go { depth }).await;
        self.in_flight = true;

        self.wait_for_result().await
    }

    /// Race the engine's terminal event against the session deadline.
    async fn wait_for_result(&mut self) -> Evaluation {
        let deadline = Instant::now() + self.timeout;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::debug!("Analysis deadline hit; returning best-known partial");
                    return Evaluation::from_parts(self.last_partial.clone(), None);
                }
                event = self.engine.recv_event() => match event {
                    Some(EngineEvent::SearchProgress(info)) => {
                        self.last_partial = Some(info);
                    }
                    Some(EngineEvent::SearchComplete { best_move }) => {
                        self.in_flight = false;
                        return Evaluation::from_parts(self.last_partial.take(), best_move);
                    }
                    Some(EngineEvent::Fault(reason)) => {
                        tracing::warn!("Engine fault during search: {}", reason);
                        self.in_flight = false;
                        return Evaluation::default();
                    }
                    Some(_) => {}
                    None => {
                        self.in_flight = false;
                        return Evaluation::default();
                    }
                }
            }
        }
    }

    /// Consume events from an interrupted search until its terminal line
    /// (or a bounded grace period) so the next search starts clean.
    async fn drain_stale_search(&mut self) {
        let deadline = Instant::now() + STOP_GRACE;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::debug!("Stale search never acknowledged stop");
                    break;
                }
                event = self.engine.recv_event() => match event {
                    Some(EngineEvent::SearchProgress(info)) => {
                        self.last_partial = Some(info);
                    }
                    Some(EngineEvent::SearchComplete { .. }) => break,
                    Some(EngineEvent::Fault(_)) | None => break,
                    Some(_) => {}
                }
            }
        }
        self.in_flight = false;
    }
}
