//! Pipeline-related type definitions
//!
//! Supporting types for the catalog pipeline state machine.

use serde::{Deserialize, Serialize};

/// Catalog pipeline state
///
/// `Idle → Generating → Assembling → Ready` on success. Any stage failure
/// moves to `Failed` from whichever state it happened in. `Ready` and `Failed`
/// are terminal until the session is reset to `Idle`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    /// Nothing running; the only state a pipeline may start from
    Idle,
    /// Scene generation requests in flight
    Generating,
    /// Decoding, compositing and exporting the catalog
    Assembling,
    /// Catalog and both exports are available
    Ready,
    /// A stage failed or the run was cancelled
    Failed,
}

impl PipelineState {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, Generating)
                | (Generating, Assembling)
                | (Assembling, Ready)
                | (Idle, Failed)
                | (Generating, Failed)
                | (Assembling, Failed)
        )
    }

    /// Check if state is terminal (finished)
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Ready | PipelineState::Failed)
    }

    /// User-facing status line for this state
    pub fn status_text(self) -> &'static str {
        match self {
            PipelineState::Idle => "",
            PipelineState::Generating => "Generating images…",
            PipelineState::Assembling => "Building assembled catalog…",
            PipelineState::Ready => "Done",
            PipelineState::Failed => "Error – check logs",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Generating => write!(f, "generating"),
            PipelineState::Assembling => write!(f, "assembling"),
            PipelineState::Ready => write!(f, "ready"),
            PipelineState::Failed => write!(f, "failed"),
        }
    }
}
