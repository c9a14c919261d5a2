use crate::uci::{format_uci_move, parse_uci_message, UciMessage};
use crate::{EngineCommand, EngineEvent, EngineState, StateCell};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);
const CHANNEL_CAPACITY: usize = 64;

/// Configuration for spawning the engine subprocess.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Explicit engine binary. Falls back to `REVIEW_ENGINE_PATH`, then a
    /// probe of well-known install locations.
    pub binary: Option<PathBuf>,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
}

/// One engine subprocess plus the tasks that shuttle its line protocol.
///
/// `start` never fails into the caller: every spawn or protocol error is
/// surfaced as a [`EngineEvent::Fault`] on the event stream with the state
/// set to [`EngineState::Faulted`], so callers can degrade instead of
/// crashing.
pub struct UciProcess {
    child: Option<Child>,
    command_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    state: Arc<StateCell>,
}

impl UciProcess {
    /// Spawn the engine and run the two-step handshake (`uci` → `uciok`,
    /// `isready` → `readyok`). Returns once the engine is `Ready` or the
    /// attempt has faulted.
    #[tracing::instrument(level = "info", skip(config))]
    pub async fn start(config: EngineConfig) -> Self {
        let state = StateCell::new(EngineState::Uninitialized);
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel::<EngineCommand>(CHANNEL_CAPACITY);
        let (line_tx, line_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);

        fn fault(
            state: &Arc<StateCell>,
            event_tx: &mpsc::Sender<EngineEvent>,
            reason: String,
        ) {
            tracing::error!("Engine start failed: {}", reason);
            state.store(EngineState::Faulted);
            let _ = event_tx.try_send(EngineEvent::Fault(reason));
        }

        let path = resolve_engine_path(&config);
        tracing::info!("Spawning engine at {:?}", path);
        let mut child = match tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            // Some engines print the benchmark summary on stderr.
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                fault(&state, &event_tx, format!("failed to spawn {:?}: {}", path, e));
                return Self {
                    child: None,
                    command_tx,
                    event_rx,
                    state,
                };
            }
        };

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                fault(&state, &event_tx, "engine has no stdio pipes".to_string());
                return Self {
                    child: Some(child),
                    command_tx,
                    event_rx,
                    state,
                };
            }
        };

        let (ready_tx, ready_rx) = oneshot::channel::<()>();

        spawn_writer_task(stdin, line_rx, event_tx.clone(), state.clone());
        spawn_reader_task(stdout, line_tx.clone(), event_tx.clone(), state.clone(), ready_tx);
        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_task(stderr, event_tx.clone(), state.clone());
        }
        spawn_command_task(command_rx, line_tx.clone(), state.clone());

        // Two-step handshake: identification, then an explicit readiness
        // probe once identification has drained.
        state.store(EngineState::HandshakeInProgress);
        let _ = line_tx.send("uci\n".to_string()).await;

        match tokio::time::timeout(HANDSHAKE_TIMEOUT, ready_rx).await {
            Ok(Ok(())) => {
                tracing::info!("Engine handshake complete");
            }
            Ok(Err(_)) | Err(_) => {
                if state.load() != EngineState::Faulted {
                    state.store(EngineState::Faulted);
                    let _ = event_tx
                        .try_send(EngineEvent::Fault("handshake timed out".to_string()));
                }
                let _ = child.start_kill();
                return Self {
                    child: Some(child),
                    command_tx,
                    event_rx,
                    state,
                };
            }
        }

        if let Some(threads) = config.threads {
            let threads = threads.clamp(1, 16);
            let _ = line_tx
                .send(format!("setoption name Threads value {}\n", threads))
                .await;
        }
        if let Some(hash_mb) = config.hash_mb {
            let hash_mb = hash_mb.clamp(1, 2048);
            let _ = line_tx
                .send(format!("setoption name Hash value {}\n", hash_mb))
                .await;
        }

        Self {
            child: Some(child),
            command_tx,
            event_rx,
            state,
        }
    }

    /// Queue a command for the engine. Dropped (with a warning) unless the
    /// engine is `Ready` or `Searching`; never an error for the caller.
    pub async fn send(&self, cmd: EngineCommand) {
        let _ = self.command_tx.send(cmd).await;
    }

    /// Receive the next engine event. `None` once the engine is gone and
    /// the stream is drained.
    pub async fn recv_event(&mut self) -> Option<EngineEvent> {
        self.event_rx.recv().await
    }

    pub fn state(&self) -> EngineState {
        self.state.load()
    }

    pub fn is_faulted(&self) -> bool {
        self.state.load() == EngineState::Faulted
    }

    /// Quit politely, then kill whatever is left after a short grace period.
    pub async fn shutdown(mut self) {
        let _ = self.command_tx.send(EngineCommand::Quit).await;
        if let Some(mut child) = self.child.take() {
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await;
            let _ = child.kill().await;
        }
    }

    /// Assemble a process from raw channel halves, with no subprocess
    /// behind it. Lets tests script the engine side of the protocol.
    #[cfg(any(test, feature = "mock"))]
    pub fn from_channels(
        command_tx: mpsc::Sender<EngineCommand>,
        event_rx: mpsc::Receiver<EngineEvent>,
        state: Arc<StateCell>,
    ) -> Self {
        Self {
            child: None,
            command_tx,
            event_rx,
            state,
        }
    }
}

/// Drain queued lines into the engine's stdin.
fn spawn_writer_task(
    mut stdin: tokio::process::ChildStdin,
    mut line_rx: mpsc::Receiver<String>,
    event_tx: mpsc::Sender<EngineEvent>,
    state: Arc<StateCell>,
) {
    tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            tracing::trace!("UCI >> {}", line.trim());
            if let Err(e) = stdin.write_all(line.as_bytes()).await {
                state.store(EngineState::Faulted);
                let _ = event_tx
                    .send(EngineEvent::Fault(format!("stdin write failed: {}", e)))
                    .await;
                break;
            }
            if let Err(e) = stdin.flush().await {
                state.store(EngineState::Faulted);
                let _ = event_tx
                    .send(EngineEvent::Fault(format!("stdin flush failed: {}", e)))
                    .await;
                break;
            }
        }
        tracing::debug!("Stdin writer task exiting");
    });
}

/// Parse engine stdout into typed events and drive the handshake/search
/// state transitions that depend on engine acknowledgements.
fn spawn_reader_task(
    stdout: tokio::process::ChildStdout,
    line_tx: mpsc::Sender<String>,
    event_tx: mpsc::Sender<EngineEvent>,
    state: Arc<StateCell>,
    ready_tx: oneshot::Sender<()>,
) {
    tokio::spawn(async move {
        let mut ready_tx = Some(ready_tx);
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    tracing::warn!("Engine stdout EOF");
                    state.store(EngineState::Faulted);
                    let _ = event_tx
                        .send(EngineEvent::Fault("engine closed its output".to_string()))
                        .await;
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    tracing::trace!("UCI << {}", trimmed);

                    let event = match parse_uci_message(trimmed) {
                        Ok(UciMessage::UciOk) => {
                            if state.load() == EngineState::HandshakeInProgress {
                                let _ = line_tx.send("isready\n".to_string()).await;
                            }
                            continue;
                        }
                        Ok(UciMessage::ReadyOk) => {
                            if state.load() == EngineState::HandshakeInProgress {
                                state.store(EngineState::Ready);
                                if let Some(tx) = ready_tx.take() {
                                    let _ = tx.send(());
                                }
                                EngineEvent::HandshakeComplete
                            } else {
                                continue;
                            }
                        }
                        Ok(UciMessage::BestMove { mv, .. }) => {
                            if state.load() == EngineState::Searching {
                                state.store(EngineState::Ready);
                            }
                            EngineEvent::SearchComplete { best_move: mv }
                        }
                        Ok(UciMessage::Info(info)) => EngineEvent::SearchProgress(info),
                        Ok(UciMessage::NodesPerSecond(nps)) => {
                            if state.load() == EngineState::Searching {
                                state.store(EngineState::Ready);
                            }
                            EngineEvent::Bench {
                                nodes_per_second: nps,
                            }
                        }
                        Ok(UciMessage::Id { name, value }) => {
                            tracing::debug!("Engine id {} {}", name, value);
                            continue;
                        }
                        Err(_) => {
                            // The identification phase floods the output
                            // with option listings; only forward unmatched
                            // lines once the engine is usable.
                            if state.load() == EngineState::HandshakeInProgress {
                                continue;
                            }
                            EngineEvent::RawLine(trimmed.to_string())
                        }
                    };

                    if event_tx.send(event).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Error reading engine stdout: {}", e);
                    state.store(EngineState::Faulted);
                    let _ = event_tx
                        .send(EngineEvent::Fault(format!("stdout read failed: {}", e)))
                        .await;
                    break;
                }
            }
        }
        tracing::debug!("Output reader task exiting");
    });
}

/// Watch stderr for the benchmark summary; everything else is diagnostic
/// noise worth at most a trace line.
fn spawn_stderr_task(
    stderr: tokio::process::ChildStderr,
    event_tx: mpsc::Sender<EngineEvent>,
    state: Arc<StateCell>,
) {
    tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    tracing::trace!("UCI !! {}", trimmed);
                    if let Ok(UciMessage::NodesPerSecond(nps)) = parse_uci_message(trimmed) {
                        if state.load() == EngineState::Searching {
                            state.store(EngineState::Ready);
                        }
                        let _ = event_tx
                            .send(EngineEvent::Bench {
                                nodes_per_second: nps,
                            })
                            .await;
                    }
                }
            }
        }
    });
}

/// Turn typed commands into protocol lines, enforcing the state gate:
/// everything except `Quit` is dropped unless the engine is usable.
fn spawn_command_task(
    mut command_rx: mpsc::Receiver<EngineCommand>,
    line_tx: mpsc::Sender<String>,
    state: Arc<StateCell>,
) {
    tokio::spawn(async move {
        while let Some(cmd) = command_rx.recv().await {
            if !matches!(cmd, EngineCommand::Quit) && !state.accepts_commands() {
                tracing::warn!("Dropping {:?}: engine is {:?}", cmd, state.load());
                continue;
            }

            let line = match cmd {
                EngineCommand::SetPosition { ref fen, ref moves } => {
                    let mut line = match fen {
                        Some(fen) => format!("position fen {}", fen),
                        None => "position startpos".to_string(),
                    };
                    if !moves.is_empty() {
                        line.push_str(" moves");
                        for mv in moves {
                            line.push(' ');
                            line.push_str(&format_uci_move(mv));
                        }
                    }
                    line.push('\n');
                    line
                }
                EngineCommand::Go { depth } => {
                    state.store(EngineState::Searching);
                    format!("go depth {}\n", depth)
                }
                EngineCommand::Stop => "stop\n".to_string(),
                EngineCommand::Bench => {
                    state.store(EngineState::Searching);
                    "bench\n".to_string()
                }
                EngineCommand::Quit => {
                    let _ = line_tx.send("quit\n".to_string()).await;
                    break;
                }
            };

            if line_tx.send(line).await.is_err() {
                break;
            }
        }
        tracing::debug!("Command task exiting");
    });
}

/// Pick the engine binary: explicit config, then the `REVIEW_ENGINE_PATH`
/// environment variable, then well-known install locations, then PATH.
fn resolve_engine_path(config: &EngineConfig) -> PathBuf {
    if let Some(path) = &config.binary {
        return path.clone();
    }
    if let Ok(path) = std::env::var("REVIEW_ENGINE_PATH") {
        return PathBuf::from(path);
    }
    for candidate in [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ] {
        if Path::new(candidate).exists() {
            return PathBuf::from(candidate);
        }
    }
    // Last resort: let PATH resolution succeed or the spawn fault.
    PathBuf::from("stockfish")
}
