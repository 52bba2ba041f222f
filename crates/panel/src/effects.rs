use tokio::sync::mpsc;

use sidekick_live::SubjectId;

use crate::loader::ThreadListLoader;
use crate::machine::{PanelInput, TransitionHandler};
use crate::read_tracker::ReadTracker;
use crate::state::LoadTicket;

/// Production transition handler: read marks on thread entry and exit, background thread loads.
pub struct SidebarEffects {
    read_tracker: ReadTracker,
    loader: ThreadListLoader,
    completions: mpsc::UnboundedSender<PanelInput>,
}

impl SidebarEffects {
    pub fn new(
        read_tracker: ReadTracker,
        loader: ThreadListLoader,
        completions: mpsc::UnboundedSender<PanelInput>,
    ) -> Self {
        Self {
            read_tracker,
            loader,
            completions,
        }
    }

    pub fn read_tracker(&self) -> &ReadTracker {
        &self.read_tracker
    }
}

impl TransitionHandler for SidebarEffects {
    fn on_enter_thread(&mut self, post_id: &SubjectId) {
        tracing::debug!(post_id = %post_id, "entering thread");
        self.read_tracker.mark_read_future(post_id);
    }

    fn on_exit_thread(&mut self, post_id: &SubjectId) {
        // The entry mark may still be in flight, so send it once more on the way out.
        tracing::debug!(post_id = %post_id, "leaving thread");
        self.read_tracker.mark_read_future(post_id);
    }

    fn on_enter_threads(&mut self, ticket: LoadTicket) {
        self.loader.spawn_load(ticket, self.completions.clone());
    }
}
