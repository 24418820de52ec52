//! Relay sessions
//!
//! One session per signaling connection:
//! - [`PeerEngine`] and [`Backend`]: the collaborators a session drives
//! - [`Session`]: the coordinator task routing signaling, engine events and pipelines
//! - [`SessionState`]: lifecycle phase and counters

pub mod backend;
pub mod context;
pub mod coordinator;
pub mod engine;
pub mod state;

pub use backend::Backend;
pub use context::SessionContext;
pub use coordinator::Session;
pub use engine::{
    CandidateHandler, EngineConfig, EngineEvent, PeerEngine, TrackHandler, DEFAULT_STUN_SERVER,
};
pub use state::{SessionPhase, SessionState};
