//! Engine error taxonomy.
//!
//! Only caller errors surface as `Err`. "No match" is a normal return value
//! (`None`), a malformed fragment is treated the same way, and an empty
//! script is a logged warning whose sessions simply never match.

use crate::session::SessionId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The given session id is unknown (never created, or already stopped).
    #[error("{0} not found")]
    SessionNotFound(SessionId),
}

pub type Result<T> = std::result::Result<T, EngineError>;
