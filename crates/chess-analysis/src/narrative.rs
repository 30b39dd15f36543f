//! Hand-off of a finished report to a narrative generator.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::summary::NarrativePayload;

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Narrator returned {0}")]
    Status(StatusCode),
    #[error("Narrator returned no text")]
    Empty,
}

/// Turns a game summary into prose.
pub trait NarrativeGenerator: Send + Sync {
    fn generate(&self, payload: &NarrativePayload) -> impl Future<Output = Result<String, NarrativeError>> + Send;
}

/// Generated prose, or the reason there is none.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Narration {
    pub prose: String,
    pub error: Option<String>,
}

impl Narration {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Ask `generator` for prose. A failure yields empty prose and an error note.
pub async fn narrate<G: NarrativeGenerator>(generator: &G, payload: &NarrativePayload) -> Narration {
    match generator.generate(payload).await {
        Ok(prose) if !prose.trim().is_empty() => Narration { prose, error: None },
        Ok(_) => failed(NarrativeError::Empty),
        Err(e) => failed(e),
    }
}

fn failed(error: NarrativeError) -> Narration {
    warn!(error = %error, "narrative generation failed");
    Narration {
        prose: String::new(),
        error: Some(error.to_string()),
    }
}

/// Posts the payload as JSON and reads the response body as the prose.
pub struct HttpNarrator {
    client: Client,
    url: String,
}

impl HttpNarrator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NarrativeError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl NarrativeGenerator for HttpNarrator {
    async fn generate(&self, payload: &NarrativePayload) -> Result<String, NarrativeError> {
        let resp = self.client.post(&self.url).json(payload).send().await?;
        if !resp.status().is_success() {
            return Err(NarrativeError::Status(resp.status()));
        }
        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::TierCounts;

    struct Canned(Option<&'static str>);

    impl NarrativeGenerator for Canned {
        async fn generate(&self, _payload: &NarrativePayload) -> Result<String, NarrativeError> {
            match self.0 {
                Some(text) => Ok(text.to_string()),
                None => Err(NarrativeError::Status(StatusCode::SERVICE_UNAVAILABLE)),
            }
        }
    }

    fn payload() -> NarrativePayload {
        NarrativePayload {
            plies: 0,
            tier_counts: TierCounts::new(),
            key_moments: vec![],
            outcome: "Unresolved".to_string(),
        }
    }

    #[tokio::test]
    async fn prose_is_passed_through() {
        let narration = narrate(&Canned(Some("A quiet draw.")), &payload()).await;
        assert_eq!(narration.prose, "A quiet draw.");
        assert!(narration.is_ok());
    }

    #[tokio::test]
    async fn failure_gives_empty_prose_and_note() {
        let narration = narrate(&Canned(None), &payload()).await;
        assert!(narration.prose.is_empty());
        assert_eq!(
            narration.error.as_deref(),
            Some("Narrator returned 503 Service Unavailable")
        );
    }

    #[tokio::test]
    async fn blank_prose_counts_as_failure() {
        let narration = narrate(&Canned(Some("  \n")), &payload()).await;
        assert!(narration.prose.is_empty());
        assert_eq!(narration.error.as_deref(), Some("Narrator returned no text"));
    }
}
