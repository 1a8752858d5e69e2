//! scrollsync: speech-driven teleprompter position and motion engine.
//!
//! Continuously infers the reader's position in a fixed script from a live
//! stream of transcript fragments, and turns that position into smooth,
//! jitter-free scroll motion. Speech-to-text itself is an external
//! collaborator: this crate starts where transcribed text arrives and ends
//! at a per-frame pixel position.
//!
//! Entry point is [`SessionRegistry`]: build one, start a session per
//! reader/script, feed it fragments as they arrive, and drive
//! [`SessionRegistry::tick`] from the render loop. Notifications stream out
//! over [`SessionRegistry::events`].

pub mod config;
pub mod error;
pub mod events;
pub mod layout;
pub mod matching;
pub mod motion;
pub mod registry;
pub mod script;
pub mod session;
pub mod similarity;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use events::EngineEvent;
pub use layout::{ScrollLayout, UniformLayout};
pub use matching::{MatchEngine, MatchResult, MatchStrategy};
pub use motion::{MotionRenderer, ScrollState};
pub use registry::{SessionRegistry, SessionSnapshot};
pub use script::{ScriptIndex, Token};
pub use session::{RateEstimator, Session, SessionId};
