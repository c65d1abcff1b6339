//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use filmswap_core::primitives::MAX_REVEAL_COUNT;
use filmswap_core::{
    GraphLayout, MatchOutcome, MatchStrategy, Notification, ParticipantId, RevealFormat, SwapError,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH / ERRORS
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Body of every non-2xx response produced by a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Set when the failure means the stored assignment is corrupt.
    #[serde(default)]
    pub integrity_failure: bool,
}

impl From<&SwapError> for ErrorResponse {
    fn from(e: &SwapError) -> Self {
        Self {
            error: e.to_string(),
            integrity_failure: e.is_integrity_failure(),
        }
    }
}

// =============================================================================
// PARTICIPANT REQUESTS
// =============================================================================

/// Join request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    pub id: u64,
    pub name: String,
}

impl JoinRequest {
    #[must_use]
    pub fn participant_id(&self) -> ParticipantId {
        ParticipantId(self.id)
    }
}

/// Body for letter and gift submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

/// Done-watching toggle. Omitting `done` marks the participant done.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneRequest {
    #[serde(default = "default_done")]
    pub done: bool,
}

fn default_done() -> bool {
    true
}

// =============================================================================
// ADMIN REQUESTS / RESPONSES
// =============================================================================

/// Ban or unban target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetRequest {
    pub id: u64,
}

impl TargetRequest {
    #[must_use]
    pub fn participant_id(&self) -> ParticipantId {
        ParticipantId(self.id)
    }
}

/// Period change request, e.g. `{"period": "swap"}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodRequest {
    pub period: String,
}

/// Reveal request. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RevealRequest {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
}

impl RevealRequest {
    /// Resolve names against the defaults.
    ///
    /// The count is validated here as well as in the engine so a bad request
    /// is rejected before any lock is taken.
    pub fn resolve(
        &self,
        default_layout: GraphLayout,
    ) -> Result<(RevealFormat, GraphLayout, usize), SwapError> {
        let format: RevealFormat = match &self.format {
            Some(name) => name.parse()?,
            None => RevealFormat::default(),
        };
        let layout: GraphLayout = match &self.layout {
            Some(name) => name.parse()?,
            None => default_layout,
        };
        let count = self.count.unwrap_or(1);
        if count == 0 || count > MAX_REVEAL_COUNT {
            return Err(SwapError::InvalidInput(format!(
                "count must be between 1 and {MAX_REVEAL_COUNT}"
            )));
        }
        Ok((format, layout, count))
    }
}

/// Summary of a matching run, without the raw field updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResponse {
    pub strategy: MatchStrategy,
    pub newly_matched: Vec<ParticipantId>,
    pub notifications: Vec<Notification>,
}

impl From<MatchOutcome> for MatchResponse {
    fn from(outcome: MatchOutcome) -> Self {
        Self {
            strategy: outcome.strategy,
            newly_matched: outcome.newly_matched,
            notifications: outcome.notifications,
        }
    }
}
