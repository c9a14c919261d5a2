//! Channel-level engine double: tests sit on the far side of the command
//! and event channels and script the engine's half of the protocol.

use crate::session::AnalysisSession;
use engine::{EngineCommand, EngineEvent, EngineState, StateCell, UciProcess};
use std::time::Duration;
use tokio::sync::mpsc;

/// A session whose engine is whatever the test scripts: commands the
/// session sends arrive on the returned receiver, and events the test
/// sends on the returned sender arrive at the session.
pub(crate) fn scripted_session(
    timeout: Duration,
) -> (
    AnalysisSession,
    mpsc::Receiver<EngineCommand>,
    mpsc::Sender<EngineEvent>,
) {
    let (engine, cmd_rx, event_tx) = scripted_process(EngineState::Ready);
    (
        AnalysisSession::with_timeout(engine, timeout),
        cmd_rx,
        event_tx,
    )
}

/// A session over an engine that already faulted (spawn failure path).
pub(crate) fn faulted_session() -> (
    AnalysisSession,
    mpsc::Receiver<EngineCommand>,
    mpsc::Sender<EngineEvent>,
) {
    let (engine, cmd_rx, event_tx) = scripted_process(EngineState::Faulted);
    (AnalysisSession::new(engine), cmd_rx, event_tx)
}

pub(crate) fn scripted_process(
    state: EngineState,
) -> (
    UciProcess,
    mpsc::Receiver<EngineCommand>,
    mpsc::Sender<EngineEvent>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::channel(64);
    let engine = UciProcess::from_channels(cmd_tx, event_rx, StateCell::new(state));
    (engine, cmd_rx, event_tx)
}
