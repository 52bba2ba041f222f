#![deny(unsafe_code)]

//! Live update routing for bot posts.
//!
//! Server-pushed frames are decoded into [`UpdateEvent`]s and fanned out to every listener
//! registered for the event's subject through an [`EventRouter`].
pub mod error;
/// Update event contracts shared by the transport and rendered posts.
pub mod event;
pub mod frame;
pub mod router;

pub use error::{FrameError, FrameResult, ListenerError, ListenerResult};
pub use event::{SubjectId, UpdateEvent, UpdateKind};
pub use frame::{CONFIG_CHANGED_EVENT, DEFAULT_PLUGIN_ID, EventNames, PushFrame, PushSignal};
pub use router::{
    DeliveryObserver, DispatchSummary, EventRouter, Registration, RegistrationHandle,
    TracingObserver,
};
