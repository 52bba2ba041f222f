#![deny(unsafe_code)]

//! Sidebar panel core: tab state, thread list loading and read tracking.
pub mod api;
pub mod bots;
pub mod clock;
pub mod effects;
pub mod loader;
/// Panel state machine and its inputs.
pub mod machine;
pub mod read_tracker;
/// Settings persistence.
pub mod settings;
/// Pure panel transitions.
pub mod state;
pub mod view;

pub use api::{ApiError, ApiResult, ReadApi, ReadMark, ThreadSummary, ThreadsApi};
pub use bots::{Bot, BotRoster};
pub use clock::{Clock, ManualClock, READ_WATERMARK_OFFSET_MS, SystemClock, read_watermark};
pub use effects::SidebarEffects;
pub use loader::ThreadListLoader;
pub use machine::{PanelInput, PanelRejection, PanelResult, PanelStateMachine, TransitionHandler};
pub use read_tracker::{ReadTracker, ReaderIdentity};
pub use settings::{SettingsError, SettingsStore, SidebarSettings};
pub use state::{LoadTicket, PanelEffect, PanelState, PanelStep, PanelTransition, Tab};
pub use view::{PanelContent, PanelView, ThreadItem};
