#![deny(unsafe_code)]

//! Wiring for the AI sidebar: live post updates plus the panel state machine.
pub mod host;
/// Transcript-driven headless runs.
pub mod replay;

pub use host::{Collaborators, SidebarHost};
pub use replay::{FixtureThreadsApi, LoggingReadApi, Replay, ReplayError, TranscriptStep};
