use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;

use sidekick_live::{
    DispatchSummary, EventNames, EventRouter, FrameResult, PushFrame, PushSignal, SubjectId,
};
use sidekick_panel::{
    BotRoster, Clock, PanelInput, PanelResult, PanelStateMachine, PanelView, ReadApi,
    ReadTracker, ReaderIdentity, SettingsStore, SidebarEffects, SidebarSettings, Tab,
    ThreadListLoader, ThreadsApi,
};

/// External services the sidebar talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub threads: Arc<dyn ThreadsApi>,
    pub reads: Arc<dyn ReadApi>,
    pub clock: Arc<dyn Clock>,
    /// Runtime that drives read marks and thread-list fetches.
    pub runtime: Handle,
}

/// One sidebar instance: its router, its panel and the channel fetches report back on.
///
/// Every instance is independent, so several panes can each own a host.
pub struct SidebarHost {
    router: EventRouter,
    names: EventNames,
    panel: PanelStateMachine<SidebarEffects>,
    completions: mpsc::UnboundedReceiver<PanelInput>,
    settings: Option<Arc<SettingsStore>>,
}

impl SidebarHost {
    pub fn new(
        settings: &SidebarSettings,
        collaborators: Collaborators,
        identity: ReaderIdentity,
    ) -> Self {
        Self::with_router(settings, collaborators, identity, EventRouter::new())
    }

    pub fn with_router(
        settings: &SidebarSettings,
        collaborators: Collaborators,
        identity: ReaderIdentity,
        router: EventRouter,
    ) -> Self {
        let (completions_tx, completions) = mpsc::unbounded_channel();
        let effects = SidebarEffects::new(
            ReadTracker::new(
                collaborators.reads,
                collaborators.clock,
                identity,
                collaborators.runtime.clone(),
            ),
            ThreadListLoader::new(collaborators.threads, collaborators.runtime),
            completions_tx,
        );

        Self {
            router,
            names: settings.event_names(),
            panel: PanelStateMachine::new(effects, BotRoster::new(settings.default_bot.clone())),
            completions,
            settings: None,
        }
    }

    /// Builds a host from `store` and writes the user's bot choices back to it.
    pub fn from_store(
        store: Arc<SettingsStore>,
        collaborators: Collaborators,
        identity: ReaderIdentity,
    ) -> Self {
        let mut host = Self::new(&store.settings(), collaborators, identity);
        host.settings = Some(store);
        host
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    pub fn panel(&self) -> &PanelStateMachine<SidebarEffects> {
        &self.panel
    }

    pub fn view(&self) -> PanelView {
        self.panel.view()
    }

    pub fn set_identity(&self, identity: ReaderIdentity) {
        self.panel.handler().read_tracker().set_identity(identity);
    }

    pub fn handle(&mut self, input: PanelInput) -> PanelResult {
        match input {
            PanelInput::SetActiveBot(username) => self.set_active_bot(&username),
            input => self.panel.handle(input),
        }
    }

    /// Switches the bot new conversations go to and remembers it for the next session.
    ///
    /// A failed save is logged; the switch itself still holds.
    pub fn set_active_bot(&mut self, username: &str) -> PanelResult {
        self.panel.set_active_bot(username)?;
        let Some(store) = &self.settings else {
            return Ok(());
        };
        if let Err(error) = store.remember_default_bot(username) {
            tracing::warn!(error = %error, username, "failed to remember active bot");
        }
        Ok(())
    }

    pub fn select_post(&mut self, post_id: Option<SubjectId>) -> PanelResult {
        self.panel.select_post(post_id)
    }

    pub fn pick_tab(&mut self, tab: Tab) -> PanelResult {
        self.panel.pick_tab(tab)
    }

    pub fn unmount(&mut self) -> PanelResult {
        self.panel.unmount()
    }

    /// Decodes one transport frame and routes it.
    ///
    /// Returns the dispatch summary for post events and `None` for anything else.
    pub fn handle_push(&mut self, text: &str) -> FrameResult<Option<DispatchSummary>> {
        self.handle_frame(PushFrame::parse(text)?)
    }

    pub fn handle_frame(&mut self, frame: PushFrame) -> FrameResult<Option<DispatchSummary>> {
        match self.names.decode(frame)? {
            PushSignal::Update(event) => Ok(Some(self.router.dispatch(&event))),
            PushSignal::ConfigChanged => {
                tracing::info!("server config changed; dropping bot roster");
                self.apply(PanelInput::BotsChanged(None));
                Ok(None)
            }
            PushSignal::Ignored(event) => {
                tracing::trace!(event = %event, "ignoring push event");
                Ok(None)
            }
        }
    }

    /// Applies every completion already waiting, without blocking.
    pub fn drain_completions(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(input) = self.completions.try_recv() {
            self.apply(input);
            applied += 1;
        }
        applied
    }

    /// Waits for the next background completion and applies it.
    pub async fn next_completion(&mut self) -> Option<PanelResult> {
        let input = self.completions.recv().await?;
        Some(self.panel.handle(input))
    }

    fn apply(&mut self, input: PanelInput) {
        if let Err(rejection) = self.panel.handle(input) {
            tracing::debug!(rejection = ?rejection, "panel input not applied");
        }
    }
}
