use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::api::{ApiResult, ThreadSummary, ThreadsApi};
use crate::machine::PanelInput;
use crate::state::LoadTicket;

/// Fetches the AI thread list. Every call goes to the server; nothing is cached between visits.
#[derive(Clone)]
pub struct ThreadListLoader {
    api: Arc<dyn ThreadsApi>,
    runtime: Handle,
}

impl ThreadListLoader {
    pub fn new(api: Arc<dyn ThreadsApi>, runtime: Handle) -> Self {
        Self { api, runtime }
    }

    pub async fn load(&self) -> ApiResult<Vec<ThreadSummary>> {
        self.api.get_threads().await
    }

    /// Starts a fetch in the background and reports it back as [`PanelInput::ThreadsLoaded`].
    ///
    /// The fetch cannot be cancelled; the receiving machine decides whether the result is still
    /// relevant by comparing `ticket` with the latest one it issued.
    pub fn spawn_load(&self, ticket: LoadTicket, completions: mpsc::UnboundedSender<PanelInput>) {
        let request = self.api.get_threads();
        self.runtime.spawn(async move {
            let result = request.await;
            if let Err(error) = &result {
                tracing::warn!(ticket = ticket.0, error = %error, "failed to load AI threads");
            }
            if completions
                .send(PanelInput::ThreadsLoaded { ticket, result })
                .is_err()
            {
                tracing::debug!(ticket = ticket.0, "panel gone before thread list arrived");
            }
        });
    }
}
