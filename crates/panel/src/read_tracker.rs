//! Fire-and-forget "read in the future" marks.
//!
//! A mark is sent when a thread is opened and sent again when it is left, because the first
//! request can still be in flight when the view goes away. Failures are only logged: a stale
//! unread badge is the worst outcome.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::runtime::Handle;

use sidekick_live::SubjectId;

use crate::api::{ReadApi, ReadMark};
use crate::clock::{Clock, read_watermark};

/// User and team the marks are recorded for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReaderIdentity {
    pub user_id: String,
    pub team_id: String,
}

impl ReaderIdentity {
    pub fn new(user_id: impl Into<String>, team_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            team_id: team_id.into(),
        }
    }
}

#[derive(Clone)]
pub struct ReadTracker {
    api: Arc<dyn ReadApi>,
    clock: Arc<dyn Clock>,
    identity: Arc<ArcSwap<ReaderIdentity>>,
    runtime: Handle,
}

impl ReadTracker {
    /// Marks are driven to completion on `runtime`, which does not have to be the caller's.
    pub fn new(
        api: Arc<dyn ReadApi>,
        clock: Arc<dyn Clock>,
        identity: ReaderIdentity,
        runtime: Handle,
    ) -> Self {
        Self {
            api,
            clock,
            identity: Arc::new(ArcSwap::from_pointee(identity)),
            runtime,
        }
    }

    pub fn identity(&self) -> Arc<ReaderIdentity> {
        self.identity.load_full()
    }

    /// Switches the user/team used by later marks, e.g. after a login change.
    pub fn set_identity(&self, identity: ReaderIdentity) {
        self.identity.store(Arc::new(identity));
    }

    /// Marks `subject_id` read for the current identity.
    ///
    /// An unknown user is sent as an empty id; the server decides what to do with it.
    pub fn mark_read_future(&self, subject_id: &SubjectId) {
        let identity = self.identity.load_full();
        self.mark_read_future_for(&identity.user_id, &identity.team_id, subject_id);
    }

    /// Issues one mark with a watermark of now + 24h and returns without waiting for it.
    pub fn mark_read_future_for(&self, user_id: &str, team_id: &str, subject_id: &SubjectId) {
        let mark = ReadMark {
            user_id: user_id.to_string(),
            team_id: team_id.to_string(),
            subject_id: subject_id.clone(),
            read_at_ms: read_watermark(self.clock.now_ms()),
        };

        let request = self.api.update_read(mark.clone());
        self.runtime.spawn(async move {
            match request.await {
                Ok(()) => tracing::trace!(
                    subject_id = %mark.subject_id,
                    read_at_ms = mark.read_at_ms,
                    "read mark delivered"
                ),
                Err(error) => tracing::debug!(
                    subject_id = %mark.subject_id,
                    error = %error,
                    "read mark failed; ignoring"
                ),
            }
        });
    }
}
