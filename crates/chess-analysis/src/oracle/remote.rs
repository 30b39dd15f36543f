//! Cloud evaluation over HTTP.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{clamp_lines, EngineLine, EvaluationOracle, EvaluationResult};
use crate::config::RemoteConfig;
use crate::evaluation::Evaluation;
use crate::replay::Position;

pub const DEFAULT_BASE_URL: &str = "https://lichess.org/api/cloud-eval";

/// Gap kept between the end of one response and the next request.
pub const DEFAULT_PACING: Duration = Duration::from_millis(300);

/// Why a cloud evaluation could not be used.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Service returned {0}")]
    Status(StatusCode),
    #[error("Malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Response carried no variations")]
    NoVariations,
}

#[derive(Debug, Deserialize)]
struct CloudEval {
    #[serde(default)]
    pvs: Vec<CloudPv>,
}

#[derive(Debug, Deserialize)]
struct CloudPv {
    #[serde(default)]
    moves: String,
    cp: Option<i32>,
    mate: Option<i32>,
}

/// Client for a cloud evaluation service answering
/// `GET {base_url}?fen=<fen>&multiPv=<n>` with White-relative scores.
///
/// Requests go out one at a time, and each waits until the pacing interval
/// has passed since the previous response arrived.
pub struct CloudEvalClient {
    client: Client,
    base_url: String,
    pacing: Duration,
    pv_plies: usize,
    last_response: Mutex<Option<Instant>>,
}

impl CloudEvalClient {
    pub fn new(base_url: impl Into<String>, pacing: Duration, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(concat!("game-review/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            pacing,
            pv_plies: uci::DEFAULT_PV_PLIES,
            last_response: Mutex::new(None),
        })
    }

    pub fn from_config(config: &RemoteConfig, pv_plies: usize) -> Result<Self, RemoteError> {
        let client = Self::new(
            config.base_url.clone(),
            Duration::from_millis(config.pacing_ms),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(client.with_pv_plies(pv_plies))
    }

    /// Keep at most `plies` moves of each returned line.
    pub fn with_pv_plies(mut self, plies: usize) -> Self {
        self.pv_plies = plies;
        self
    }

    async fn fetch(&self, position: &Position, lines: usize) -> Result<Vec<EngineLine>, RemoteError> {
        let mut last = self.last_response.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.pacing).await;
        }

        let result = self.request(position, lines).await;
        *last = Some(Instant::now());
        result
    }

    async fn request(&self, position: &Position, lines: usize) -> Result<Vec<EngineLine>, RemoteError> {
        debug!(fen = %position.fen, lines, "requesting cloud evaluation");

        let params = [("fen", position.fen.clone()), ("multiPv", lines.to_string())];
        let resp = self.client.get(&self.base_url).query(&params).send().await?;

        if !resp.status().is_success() {
            return Err(RemoteError::Status(resp.status()));
        }

        let body = resp.text().await?;
        let eval: CloudEval = serde_json::from_str(&body)?;

        let lines: Vec<EngineLine> = eval
            .pvs
            .into_iter()
            .filter_map(|pv| {
                let evaluation = Evaluation::from_white_score(pv.cp, pv.mate, position.side_to_move)?;
                Some((pv.moves, evaluation))
            })
            .zip(1..)
            .map(|((moves, evaluation), rank)| EngineLine {
                rank,
                moves: moves
                    .split_whitespace()
                    .take(self.pv_plies)
                    .map(str::to_string)
                    .collect(),
                evaluation,
            })
            .collect();

        if lines.is_empty() {
            return Err(RemoteError::NoVariations);
        }
        Ok(lines)
    }
}

impl EvaluationOracle for CloudEvalClient {
    async fn evaluate(&self, position: &Position) -> EvaluationResult {
        match self.fetch(position, 1).await {
            Ok(lines) => match lines.into_iter().next() {
                Some(best) => EvaluationResult::new(best.evaluation, best.moves.into_iter().next()),
                None => EvaluationResult::degraded(),
            },
            Err(e) => {
                warn!(fen = %position.fen, error = %e, "cloud evaluation failed, using neutral score");
                EvaluationResult::degraded()
            }
        }
    }

    async fn evaluate_top(&self, position: &Position, n: usize) -> Vec<EngineLine> {
        match self.fetch(position, clamp_lines(n)).await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(fen = %position.fen, error = %e, "cloud evaluation failed, no lines available");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_payload() {
        let body = r#"{"fen":"x","knodes":1200,"depth":36,"pvs":[
            {"moves":"e7e5 g1f3 b8c6","cp":-25},
            {"moves":"c7c5","mate":-7}
        ]}"#;
        let eval: CloudEval = serde_json::from_str(body).unwrap();
        assert_eq!(eval.pvs.len(), 2);
        assert_eq!(eval.pvs[0].cp, Some(-25));
        assert_eq!(eval.pvs[1].mate, Some(-7));
    }

    #[test]
    fn missing_pvs_is_empty() {
        let eval: CloudEval = serde_json::from_str(r#"{"error":"Not found"}"#).unwrap();
        assert!(eval.pvs.is_empty());
    }

    #[test]
    fn remote_error_display() {
        let err = RemoteError::Status(StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(err.to_string(), "Service returned 429 Too Many Requests");
    }
}
