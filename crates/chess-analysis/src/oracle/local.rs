//! Local UCI engine driven by a single worker task.
//!
//! The worker owns the engine's input and output. Callers hand it searches
//! over a bounded queue and get the outcome back on a oneshot channel, so
//! only one search is ever in flight and requests are served in order.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use uci::{EngineCommand, EngineMessage, GoOptions, MultiPvCollector, SearchOutcome};

use super::{clamp_lines, EngineLine, EvaluationOracle, EvaluationResult};
use crate::config::LocalConfig;
use crate::evaluation::Evaluation;
use crate::replay::Position;

/// Maximum number of lines to read before giving up on a UCI response.
pub const MAX_UCI_LINES: usize = 1000;

/// Errors that can occur when starting or talking to a local engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to spawn the engine process, or to talk to it.
    #[error("Failed to spawn engine: {0}")]
    SpawnError(#[from] std::io::Error),
    /// Engine executable was not found at the specified path.
    #[error("Engine not found at path: {0}")]
    NotFound(String),
    /// Engine failed to initialize properly (UCI handshake failed).
    #[error("Engine initialization failed")]
    InitFailed,
    /// Engine returned an invalid or unexpected response.
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
}

/// How searches are run on the local engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub depth: u32,
    pub pv_plies: usize,
    pub queue_capacity: usize,
    /// Caller-side wait limit per search.
    pub search_timeout: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            depth: 15,
            pv_plies: uci::DEFAULT_PV_PLIES,
            queue_capacity: 8,
            search_timeout: None,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &LocalConfig, pv_plies: usize) -> Self {
        Self {
            depth: config.depth,
            pv_plies,
            queue_capacity: config.queue_capacity,
            search_timeout: config.search_timeout_secs.map(Duration::from_secs),
        }
    }
}

struct SearchRequest {
    fen: String,
    multi_pv: u32,
    reply: oneshot::Sender<Option<SearchOutcome>>,
}

/// Handle to a running engine worker.
///
/// Dropping the handle shuts the worker down.
pub struct LocalEngine {
    requests: mpsc::Sender<SearchRequest>,
    shutdown: watch::Sender<bool>,
    search_timeout: Option<Duration>,
    name: String,
}

impl LocalEngine {
    /// Spawn the engine at `path` and perform the UCI handshake.
    ///
    /// # Errors
    ///
    /// - `EngineError::NotFound` if the executable cannot be found
    /// - `EngineError::SpawnError` if the process fails to start
    /// - `EngineError::InitFailed` / `InvalidResponse` if the handshake fails
    pub async fn spawn(path: &str, settings: EngineSettings) -> Result<Self, EngineError> {
        let mut child = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => EngineError::NotFound(path.to_string()),
                _ => EngineError::SpawnError(e),
            })?;

        let stdin = child.stdin.take().ok_or(EngineError::InitFailed)?;
        let stdout = child.stdout.take().ok_or(EngineError::InitFailed)?;

        Self::start(BufReader::new(stdout), stdin, settings, Some(child)).await
    }

    /// Drive an engine that speaks UCI over an arbitrary byte transport.
    pub async fn with_transport<Rd, W>(reader: Rd, writer: W, settings: EngineSettings) -> Result<Self, EngineError>
    where
        Rd: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        Self::start(reader, writer, settings, None).await
    }

    async fn start<Rd, W>(
        reader: Rd,
        writer: W,
        settings: EngineSettings,
        child: Option<Child>,
    ) -> Result<Self, EngineError>
    where
        Rd: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut transport = Transport { reader, writer };
        let name = transport.handshake().await?;
        info!(engine = %name, depth = settings.depth, "local engine ready");

        let (requests, queue) = mpsc::channel(settings.queue_capacity.max(1));
        let (shutdown, shutdown_rx) = watch::channel(false);

        let worker = Worker {
            transport,
            depth: settings.depth,
            pv_plies: settings.pv_plies,
            multi_pv: 1,
            child,
        };
        tokio::spawn(worker.run(queue, shutdown_rx));

        Ok(Self {
            requests,
            shutdown,
            search_timeout: settings.search_timeout,
            name,
        })
    }

    /// The engine's name as reported via `id name`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns false once the worker has stopped.
    pub fn is_running(&self) -> bool {
        !self.requests.is_closed()
    }

    /// Stop the worker. Outstanding and queued searches resolve degraded.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    async fn submit(&self, position: &Position, multi_pv: u32) -> Option<SearchOutcome> {
        let (reply, outcome) = oneshot::channel();
        let request = SearchRequest {
            fen: position.fen.clone(),
            multi_pv,
            reply,
        };

        if self.requests.send(request).await.is_err() {
            warn!(fen = %position.fen, "local engine is not running");
            return None;
        }

        match self.search_timeout {
            Some(limit) => match tokio::time::timeout(limit, outcome).await {
                Ok(outcome) => outcome.ok().flatten(),
                Err(_) => {
                    warn!(fen = %position.fen, ?limit, "local engine search timed out");
                    None
                }
            },
            None => outcome.await.ok().flatten(),
        }
    }
}

impl Drop for LocalEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl EvaluationOracle for LocalEngine {
    async fn evaluate(&self, position: &Position) -> EvaluationResult {
        let Some(outcome) = self.submit(position, 1).await else {
            warn!(fen = %position.fen, "local evaluation failed, using neutral score");
            return EvaluationResult::degraded();
        };

        match outcome.lines.first() {
            Some(line) => EvaluationResult::new(
                Evaluation::from_uci_score(line.score, position.side_to_move),
                outcome.best_move,
            ),
            None => {
                warn!(fen = %position.fen, "engine reported no score, using neutral score");
                EvaluationResult::degraded()
            }
        }
    }

    async fn evaluate_top(&self, position: &Position, n: usize) -> Vec<EngineLine> {
        let n = clamp_lines(n) as u32;
        let Some(outcome) = self.submit(position, n).await else {
            warn!(fen = %position.fen, "local evaluation failed, no lines available");
            return Vec::new();
        };

        outcome
            .lines
            .into_iter()
            .filter(|line| line.rank <= n)
            .map(|line| EngineLine {
                rank: line.rank,
                moves: line.moves,
                evaluation: Evaluation::from_uci_score(line.score, position.side_to_move),
            })
            .collect()
    }
}

struct Transport<Rd, W> {
    reader: Rd,
    writer: W,
}

impl<Rd, W> Transport<Rd, W>
where
    Rd: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    async fn send(&mut self, command: &EngineCommand) -> std::io::Result<()> {
        let line = command.to_uci();
        debug!(cmd = %line, "engine <");
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }

    /// Read one line into `buf`. Returns false at end of stream.
    async fn read_line(&mut self, buf: &mut String) -> std::io::Result<bool> {
        buf.clear();
        let n = self.reader.read_line(buf).await?;
        if n > 0 {
            debug!(line = buf.trim_end(), "engine >");
        }
        Ok(n > 0)
    }

    /// `uci`/`uciok` then `isready`/`readyok`. Returns the engine name.
    async fn handshake(&mut self) -> Result<String, EngineError> {
        self.send(&EngineCommand::Uci).await?;

        let mut name = None;
        self.wait_for("uciok", |msg| match msg {
            EngineMessage::Id { name: Some(n), .. } => {
                name = Some(n.clone());
                false
            }
            EngineMessage::UciOk => true,
            _ => false,
        })
        .await?;

        self.send(&EngineCommand::IsReady).await?;
        self.wait_for("readyok", |msg| matches!(msg, EngineMessage::ReadyOk))
            .await?;

        Ok(name.unwrap_or_else(|| "Unknown Engine".to_string()))
    }

    async fn wait_for(
        &mut self,
        expected: &str,
        mut done: impl FnMut(&EngineMessage) -> bool,
    ) -> Result<(), EngineError> {
        let mut line = String::new();
        for _ in 0..MAX_UCI_LINES {
            if !self.read_line(&mut line).await? {
                return Err(EngineError::InitFailed);
            }
            if let Some(msg) = EngineMessage::parse(&line) {
                if done(&msg) {
                    return Ok(());
                }
            }
        }
        Err(EngineError::InvalidResponse(format!(
            "no {} within {} lines",
            expected, MAX_UCI_LINES
        )))
    }
}

struct Worker<Rd, W> {
    transport: Transport<Rd, W>,
    depth: u32,
    pv_plies: usize,
    /// MultiPV value the engine currently has.
    multi_pv: u32,
    child: Option<Child>,
}

impl<Rd, W> Worker<Rd, W>
where
    Rd: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn run(mut self, mut queue: mpsc::Receiver<SearchRequest>, mut shutdown: watch::Receiver<bool>) {
        loop {
            let request = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                request = queue.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            // The caller timed out while the request sat in the queue.
            if request.reply.is_closed() {
                debug!(fen = %request.fen, "skipping abandoned search");
                continue;
            }

            match self.search(&request.fen, request.multi_pv, &mut shutdown).await {
                Ok(Some(outcome)) => {
                    let _ = request.reply.send(Some(outcome));
                }
                Ok(None) => {
                    let _ = request.reply.send(None);
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "local engine stopped responding");
                    let _ = request.reply.send(None);
                    break;
                }
            }
        }

        queue.close();
        while let Ok(request) = queue.try_recv() {
            let _ = request.reply.send(None);
        }

        let _ = self.transport.send(&EngineCommand::Quit).await;
        if let Some(mut child) = self.child.take() {
            if tokio::time::timeout(Duration::from_secs(1), child.wait()).await.is_err() {
                let _ = child.kill().await;
            }
        }
        debug!("local engine worker stopped");
    }

    /// Run one search. `Ok(None)` means shutdown was requested mid-search.
    async fn search(
        &mut self,
        fen: &str,
        multi_pv: u32,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<Option<SearchOutcome>, EngineError> {
        if multi_pv != self.multi_pv {
            self.transport.send(&EngineCommand::multi_pv(multi_pv)).await?;
            self.multi_pv = multi_pv;
        }
        self.transport.send(&EngineCommand::position_fen(fen)).await?;
        self.transport
            .send(&EngineCommand::Go(GoOptions::depth(self.depth)))
            .await?;

        let mut collector = MultiPvCollector::new(self.pv_plies);
        let mut line = String::new();
        loop {
            let read = tokio::select! {
                biased;
                _ = shutdown.changed() => None,
                read = self.transport.read_line(&mut line) => Some(read),
            };

            let Some(read) = read else {
                let _ = self.transport.send(&EngineCommand::Stop).await;
                return Ok(None);
            };
            if !read? {
                return Err(EngineError::InvalidResponse("engine closed its output".to_string()));
            }
            if let Some(outcome) = collector.feed(&line) {
                return Ok(Some(outcome));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_from_config() {
        let config = LocalConfig {
            engine_path: "sf".to_string(),
            depth: 12,
            queue_capacity: 3,
            search_timeout_secs: Some(7),
        };
        let settings = EngineSettings::from_config(&config, 6);
        assert_eq!(settings.depth, 12);
        assert_eq!(settings.pv_plies, 6);
        assert_eq!(settings.queue_capacity, 3);
        assert_eq!(settings.search_timeout, Some(Duration::from_secs(7)));
    }

    #[test]
    fn engine_error_display() {
        let err = EngineError::NotFound("/opt/stockfish".to_string());
        assert_eq!(err.to_string(), "Engine not found at path: /opt/stockfish");
        assert_eq!(EngineError::InitFailed.to_string(), "Engine initialization failed");
    }

    #[tokio::test]
    async fn spawn_missing_executable_is_not_found() {
        let result = LocalEngine::spawn("/nonexistent/engine-binary", EngineSettings::default()).await;
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }
}
