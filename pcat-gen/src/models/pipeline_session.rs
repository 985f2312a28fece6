//! Catalog pipeline session (caller-owned state)
//!
//! The session is the only place pipeline state lives. The pipeline moves it
//! through `Idle → Generating → Assembling → Ready` (or `Failed`) and the
//! caller calls [`PipelineSession::reset`] before running again.

use crate::error::{CatalogError, CatalogResult};
use chrono::{DateTime, Utc};
use pcat_common::PipelineState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: PipelineState,
    pub new_state: PipelineState,
    pub transitioned_at: DateTime<Utc>,
}

/// Pipeline session (in-memory state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSession {
    /// Unique identifier of the current run
    pub session_id: Uuid,

    /// Current pipeline state
    pub state: PipelineState,

    /// Product image the run was started with (after placeholder substitution)
    pub product_image_url: Option<String>,

    /// When the run left `Idle`
    pub started_at: Option<DateTime<Utc>>,

    /// When the run reached `Ready` or `Failed`
    pub ended_at: Option<DateTime<Utc>>,

    /// Error text of the failed run, for diagnostics
    pub last_error: Option<String>,
}

impl PipelineSession {
    /// Create new idle session
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            state: PipelineState::Idle,
            product_image_url: None,
            started_at: None,
            ended_at: None,
            last_error: None,
        }
    }

    /// Transition to new state
    ///
    /// Rejects any move the state machine does not allow.
    pub fn transition_to(&mut self, new_state: PipelineState) -> CatalogResult<StateTransition> {
        if !self.state.can_transition_to(new_state) {
            return Err(CatalogError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        let now = Utc::now();
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.state,
            new_state,
            transitioned_at: now,
        };

        if self.state == PipelineState::Idle {
            self.started_at = Some(now);
        }
        if new_state.is_terminal() {
            self.ended_at = Some(now);
        }
        self.state = new_state;

        Ok(transition)
    }

    /// Move to `Failed`, recording the error text
    pub fn fail(&mut self, error: &CatalogError) -> CatalogResult<StateTransition> {
        let transition = self.transition_to(PipelineState::Failed)?;
        self.last_error = Some(error.to_string());
        Ok(transition)
    }

    /// Return a finished session to `Idle` under a fresh run id
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Check if session is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Run duration, once the session has both started and ended
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.ended_at? - self.started_at?)
    }
}

impl Default for PipelineSession {
    fn default() -> Self {
        Self::new()
    }
}
