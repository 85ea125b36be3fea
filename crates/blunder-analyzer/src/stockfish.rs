//! Stockfish engine client using UCI protocol (async I/O)

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use crate::error::EngineError;

pub const DEFAULT_EVAL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Magnitude used for mate scores so that any mate outranks material.
pub const MATE_SCORE: i32 = 10_000;

/// Engine score, from the perspective of the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Score {
    Cp(i32),
    /// Mate in N moves (positive = side to move mates, negative = gets mated)
    Mate(i32),
}

impl Score {
    /// Collapse to centipawns: mate in `n` becomes `±(10000 - |n|)`, so a
    /// nearer mate scores higher. `mate 0` (side to move is mated) is -10000.
    pub fn centipawns(self) -> i32 {
        match self {
            Score::Cp(cp) => cp,
            Score::Mate(n) if n > 0 => MATE_SCORE - n,
            Score::Mate(n) => -MATE_SCORE - n,
        }
    }
}

/// A move in coordinate notation: origin, destination, optional promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMove {
    pub uci: String,
    pub from: String,
    pub to: String,
    pub promotion: Option<char>,
}

impl EngineMove {
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if !(4..=5).contains(&bytes.len()) {
            return None;
        }
        let is_square = |f: u8, r: u8| (b'a'..=b'h').contains(&f) && (b'1'..=b'8').contains(&r);
        if !is_square(bytes[0], bytes[1]) || !is_square(bytes[2], bytes[3]) {
            return None;
        }
        let promotion = match bytes.get(4) {
            None => None,
            Some(&p) if matches!(p, b'q' | b'r' | b'b' | b'n') => Some(p as char),
            Some(_) => return None,
        };
        Some(Self {
            uci: text.to_string(),
            from: text[0..2].to_string(),
            to: text[2..4].to_string(),
            promotion,
        })
    }
}

/// Result of a single position evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalResult {
    /// Last score reported for the search (`Cp(0)` if none arrived)
    pub score: Score,
    /// `None` on timeout or when the engine has no legal move
    pub best_move: Option<EngineMove>,
    /// The search did not finish in time; treat the score as low confidence
    pub timed_out: bool,
}

/// Line-oriented, bidirectional channel to an engine.
pub trait EngineTransport: Send {
    fn send(&mut self, line: &str) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Next line from the engine; `None` once the channel is closed.
    /// Must be cancel safe: it is raced against the search timeout.
    fn recv(&mut self) -> impl Future<Output = Result<Option<String>, EngineError>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

/// Engine running as a child process, talking over stdin/stdout.
pub struct ProcessTransport {
    process: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
}

impl ProcessTransport {
    pub fn spawn(path: &str) -> Result<Self, EngineError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Spawn(format!("{path}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Spawn("engine stdin not captured".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Spawn("engine stdout not captured".into()))?;

        Ok(Self {
            process,
            stdin,
            stdout: BufReader::new(stdout).lines(),
        })
    }
}

fn io_error(e: std::io::Error) -> EngineError {
    if e.kind() == std::io::ErrorKind::BrokenPipe {
        EngineError::SessionClosed
    } else {
        EngineError::Io(e.to_string())
    }
}

impl EngineTransport for ProcessTransport {
    async fn send(&mut self, line: &str) -> Result<(), EngineError> {
        self.stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(io_error)?;
        self.stdin.flush().await.map_err(io_error)
    }

    async fn recv(&mut self) -> Result<Option<String>, EngineError> {
        self.stdout.next_line().await.map_err(io_error)
    }

    async fn close(&mut self) {
        let _ = self.send("quit").await;
        if timeout(Duration::from_secs(1), self.process.wait()).await.is_err() {
            let _ = self.process.start_kill();
        }
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        let _ = self.process.start_kill();
    }
}

/// One end of an in-memory message channel. `pair()` returns both ends:
/// hand one to an [`EngineSession`], drive the other as the engine.
pub struct ChannelTransport {
    tx: Option<mpsc::UnboundedSender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl ChannelTransport {
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();
        (
            Self {
                tx: Some(a_tx),
                rx: a_rx,
            },
            Self {
                tx: Some(b_tx),
                rx: b_rx,
            },
        )
    }
}

impl EngineTransport for ChannelTransport {
    async fn send(&mut self, line: &str) -> Result<(), EngineError> {
        let tx = self.tx.as_ref().ok_or(EngineError::SessionClosed)?;
        tx.send(line.to_string())
            .map_err(|_| EngineError::SessionClosed)
    }

    async fn recv(&mut self) -> Result<Option<String>, EngineError> {
        Ok(self.rx.recv().await)
    }

    async fn close(&mut self) {
        self.tx = None;
        self.rx.close();
    }
}

/// Anything that can score a position. The detector only needs this much.
pub trait Evaluator {
    fn evaluate(
        &mut self,
        fen: &str,
        depth: u32,
    ) -> impl Future<Output = Result<EvalResult, EngineError>> + Send;
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub eval_timeout: Duration,
    pub handshake_timeout: Duration,
    /// `setoption` pairs applied after the handshake
    pub options: Vec<(String, String)>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            eval_timeout: DEFAULT_EVAL_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            options: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Fresh,
    Ready,
    Destroyed,
}

/// One engine session. Searches are serialized through `&mut self`.
pub struct EngineSession<T: EngineTransport = ProcessTransport> {
    transport: Option<T>,
    settings: EngineSettings,
    state: SessionState,
    /// Searches abandoned on timeout whose `bestmove` is still in flight
    stale_searches: usize,
}

impl EngineSession<ProcessTransport> {
    /// Spawn the engine binary at `path`. The handshake runs on first use or
    /// via [`EngineSession::initialize`].
    pub fn spawn(path: &str, settings: EngineSettings) -> Result<Self, EngineError> {
        Ok(Self::new(ProcessTransport::spawn(path)?, settings))
    }
}

impl<T: EngineTransport> EngineSession<T> {
    pub fn new(transport: T, settings: EngineSettings) -> Self {
        Self {
            transport: Some(transport),
            settings,
            state: SessionState::Fresh,
            stale_searches: 0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == SessionState::Destroyed
    }

    /// Run the UCI handshake (`uci` → `uciok`, options, `isready` → `readyok`).
    pub async fn initialize(&mut self) -> Result<(), EngineError> {
        match self.state {
            SessionState::Ready => return Ok(()),
            SessionState::Destroyed => return Err(EngineError::SessionDestroyed),
            SessionState::Fresh => {}
        }

        let limit = self.settings.handshake_timeout;
        timeout(limit, self.handshake())
            .await
            .map_err(|_| EngineError::HandshakeTimeout(limit))??;

        self.state = SessionState::Ready;
        info!("Engine ready");
        Ok(())
    }

    async fn handshake(&mut self) -> Result<(), EngineError> {
        self.send("uci").await?;
        self.wait_for("uciok").await?;

        let options = self.settings.options.clone();
        for (name, value) in &options {
            self.send(&format!("setoption name {name} value {value}")).await?;
        }
        self.send("isready").await?;
        self.wait_for("readyok").await
    }

    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(cmd, "SF <");
        let transport = self.transport.as_mut().ok_or(EngineError::SessionDestroyed)?;
        transport.send(cmd).await
    }

    async fn recv(&mut self) -> Result<String, EngineError> {
        let transport = self.transport.as_mut().ok_or(EngineError::SessionDestroyed)?;
        let line = transport.recv().await?.ok_or(EngineError::SessionClosed)?;
        let trimmed = line.trim().to_string();
        debug!(line = %trimmed, "SF >");
        Ok(trimmed)
    }

    async fn wait_for(&mut self, expected: &str) -> Result<(), EngineError> {
        loop {
            if self.recv().await? == expected {
                return Ok(());
            }
        }
    }

    /// Search `fen` to `depth` and return the last score and the best move.
    ///
    /// If no `bestmove` arrives within the evaluation timeout the search is
    /// stopped and the last score seen (or 0) comes back with `timed_out` set.
    /// Output from that abandoned search is skipped by the next call.
    pub async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EvalResult, EngineError> {
        if !self.is_ready() {
            self.initialize().await?;
        }

        self.send(&format!("position fen {fen}")).await?;
        self.send(&format!("go depth {depth}")).await?;

        let deadline = Instant::now() + self.settings.eval_timeout;
        let mut score: Option<Score> = None;

        loop {
            let line = match timeout_at(deadline, self.recv()).await {
                Ok(Ok(line)) => line,
                Ok(Err(e)) => {
                    if !e.is_fatal() {
                        self.abandon_search().await;
                    }
                    return Err(e);
                }
                Err(_) => {
                    warn!(fen, "Engine search timed out");
                    self.stale_searches += 1;
                    self.send("stop").await?;
                    return Ok(EvalResult {
                        score: score.unwrap_or(Score::Cp(0)),
                        best_move: None,
                        timed_out: true,
                    });
                }
            };

            if self.stale_searches > 0 {
                if line.starts_with("bestmove") {
                    self.stale_searches -= 1;
                }
                continue;
            }

            if line.starts_with("info") {
                if let Some(s) = parse_score(&line) {
                    score = Some(s);
                }
            } else if line.starts_with("bestmove") {
                return Ok(EvalResult {
                    score: score.unwrap_or(Score::Cp(0)),
                    best_move: parse_bestmove(&line),
                    timed_out: false,
                });
            }
        }
    }

    /// Give up on the running search. Its remaining output, up to its
    /// `bestmove`, is skipped by the next call.
    async fn abandon_search(&mut self) {
        self.stale_searches += 1;
        if let Err(e) = self.send("stop").await {
            warn!(error = %e, "Failed to stop abandoned search");
        }
    }

    /// Tear the session down. Safe to call more than once.
    pub async fn destroy(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
            info!("Engine session destroyed");
        }
        self.stale_searches = 0;
        self.state = SessionState::Destroyed;
    }
}

impl<T: EngineTransport> Evaluator for EngineSession<T> {
    async fn evaluate(&mut self, fen: &str, depth: u32) -> Result<EvalResult, EngineError> {
        EngineSession::evaluate(self, fen, depth).await
    }
}

/// Parse `score cp N` / `score mate N` from an info line
pub fn parse_score(line: &str) -> Option<Score> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    for (i, part) in parts.iter().enumerate() {
        if *part == "score" && i + 2 < parts.len() {
            let value: i32 = parts[i + 2].parse().ok()?;
            return match parts[i + 1] {
                "cp" => Some(Score::Cp(value)),
                "mate" => Some(Score::Mate(value)),
                _ => None,
            };
        }
    }
    None
}

/// Parse the move from a `bestmove` line; `(none)` and junk give `None`
pub fn parse_bestmove(line: &str) -> Option<EngineMove> {
    line.split_whitespace().nth(1).and_then(EngineMove::parse)
}
