//! Notifications emitted to the embedding presentation layer.

use crate::session::SessionId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Engine notification, delivered over the registry's event channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// The authoritative position moved after an accepted match.
    PositionUpdate {
        session_id: SessionId,
        token_index: usize,
        pixel_position: f64,
        /// Fraction of the script covered, in [0, 1]
        progress: f64,
        /// Match score weighted by the recognizer's source confidence
        confidence: f64,
        at: DateTime<Utc>,
    },
    /// The smoothed speaking-rate estimate changed.
    RateAdjusted {
        session_id: SessionId,
        tokens_per_second: f64,
        at: DateTime<Utc>,
    },
    /// The session was stopped and its state released.
    SessionEnded {
        session_id: SessionId,
        at: DateTime<Utc>,
    },
}

impl EngineEvent {
    pub fn session_id(&self) -> SessionId {
        match self {
            EngineEvent::PositionUpdate { session_id, .. } => *session_id,
            EngineEvent::RateAdjusted { session_id, .. } => *session_id,
            EngineEvent::SessionEnded { session_id, .. } => *session_id,
        }
    }
}
