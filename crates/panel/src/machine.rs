use sidekick_live::SubjectId;

use crate::api::{ApiResult, ThreadSummary};
use crate::bots::{Bot, BotRoster};
use crate::state::{LoadTicket, PanelEffect, PanelState, PanelTransition, Tab};
use crate::view::PanelView;

/// Callbacks run synchronously, in order, while a transition is applied.
pub trait TransitionHandler {
    fn on_enter_thread(&mut self, post_id: &SubjectId);
    fn on_exit_thread(&mut self, post_id: &SubjectId);
    /// A fresh thread-list fetch is wanted; its result must come back tagged with `ticket`.
    fn on_enter_threads(&mut self, ticket: LoadTicket);
}

/// Everything that can drive the panel, as delivered by the host's event loop.
#[derive(Debug)]
pub enum PanelInput {
    Select(Option<SubjectId>),
    PickTab(Tab),
    ThreadsLoaded {
        ticket: LoadTicket,
        result: ApiResult<Vec<ThreadSummary>>,
    },
    BotsChanged(Option<Vec<Bot>>),
    SetActiveBot(String),
    Unmount,
}

/// Reason an input was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelRejection {
    Unmounted,
    StaleThreads {
        ticket: LoadTicket,
        latest: Option<LoadTicket>,
        tab: Tab,
    },
    UnknownBot(String),
}

pub type PanelResult = Result<(), PanelRejection>;

/// Owns the panel state and the data shown for it.
pub struct PanelStateMachine<H> {
    state: PanelState,
    threads: Option<Vec<ThreadSummary>>,
    roster: BotRoster,
    last_ticket: LoadTicket,
    pending_ticket: Option<LoadTicket>,
    mounted: bool,
    handler: H,
}

impl<H: TransitionHandler> PanelStateMachine<H> {
    pub fn new(handler: H, roster: BotRoster) -> Self {
        Self {
            state: PanelState::default(),
            threads: None,
            roster,
            last_ticket: LoadTicket::new(0),
            pending_ticket: None,
            mounted: true,
            handler,
        }
    }

    pub fn state(&self) -> &PanelState {
        &self.state
    }

    pub fn threads(&self) -> Option<&[ThreadSummary]> {
        self.threads.as_deref()
    }

    pub fn roster(&self) -> &BotRoster {
        &self.roster
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn view(&self) -> PanelView {
        PanelView::project(&self.state, self.threads.as_deref(), &self.roster)
    }

    pub fn handle(&mut self, input: PanelInput) -> PanelResult {
        match input {
            PanelInput::Select(post_id) => self.select_post(post_id),
            PanelInput::PickTab(tab) => self.pick_tab(tab),
            PanelInput::ThreadsLoaded { ticket, result } => self.threads_loaded(ticket, result),
            PanelInput::BotsChanged(bots) => self.set_bots(bots),
            PanelInput::SetActiveBot(username) => self.set_active_bot(&username),
            PanelInput::Unmount => self.unmount(),
        }
    }

    /// Applies the selection store's current post. Blank ids count as no selection.
    pub fn select_post(&mut self, post_id: Option<SubjectId>) -> PanelResult {
        let post_id = post_id.and_then(|id| SubjectId::non_empty(id.as_str()));
        self.transition(PanelTransition::Select(post_id))
    }

    pub fn pick_tab(&mut self, tab: Tab) -> PanelResult {
        self.transition(PanelTransition::PickTab(tab))
    }

    /// Runs the exit effect for a selected post and stops accepting input.
    pub fn unmount(&mut self) -> PanelResult {
        self.transition(PanelTransition::Unmount)?;
        self.mounted = false;
        self.pending_ticket = None;
        Ok(())
    }

    /// Applies a thread-list response if it answers the latest fetch and the tab still wants it.
    pub fn threads_loaded(
        &mut self,
        ticket: LoadTicket,
        result: ApiResult<Vec<ThreadSummary>>,
    ) -> PanelResult {
        self.ensure_mounted()?;

        if self.pending_ticket != Some(ticket) || self.state.tab != Tab::Threads {
            tracing::debug!(
                ticket = ticket.0,
                latest = ?self.pending_ticket,
                tab = ?self.state.tab,
                "discarding stale thread list response"
            );
            return Err(PanelRejection::StaleThreads {
                ticket,
                latest: self.pending_ticket,
                tab: self.state.tab,
            });
        }

        self.pending_ticket = None;
        // A failed fetch leaves the list absent; surfacing the error is the host's job.
        self.threads = result.ok();
        Ok(())
    }

    pub fn set_bots(&mut self, bots: Option<Vec<Bot>>) -> PanelResult {
        self.ensure_mounted()?;
        self.roster.replace(bots);
        Ok(())
    }

    pub fn set_active_bot(&mut self, username: &str) -> PanelResult {
        self.ensure_mounted()?;
        if self.roster.set_active(username) {
            Ok(())
        } else {
            Err(PanelRejection::UnknownBot(username.to_string()))
        }
    }

    fn ensure_mounted(&self) -> PanelResult {
        if self.mounted {
            Ok(())
        } else {
            tracing::debug!("ignoring input for unmounted panel");
            Err(PanelRejection::Unmounted)
        }
    }

    fn transition(&mut self, transition: PanelTransition) -> PanelResult {
        self.ensure_mounted()?;

        let step = self.state.apply(transition);
        if step.next.tab != Tab::Threads {
            // Any fetch still running belongs to a tab we are leaving.
            self.pending_ticket = None;
        }
        self.state = step.next;

        for effect in step.effects {
            match effect {
                PanelEffect::EnterThread(post_id) => self.handler.on_enter_thread(&post_id),
                PanelEffect::ExitThread(post_id) => self.handler.on_exit_thread(&post_id),
                PanelEffect::EnterThreads => {
                    self.last_ticket = self.last_ticket.next();
                    self.pending_ticket = Some(self.last_ticket);
                    self.threads = None;
                    self.handler.on_enter_threads(self.last_ticket);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::view::PanelContent;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Enter(String),
        Exit(String),
        Load(u64),
    }

    #[derive(Default)]
    struct RecordingHandler {
        calls: Vec<Call>,
    }

    impl TransitionHandler for RecordingHandler {
        fn on_enter_thread(&mut self, post_id: &SubjectId) {
            self.calls.push(Call::Enter(post_id.to_string()));
        }

        fn on_exit_thread(&mut self, post_id: &SubjectId) {
            self.calls.push(Call::Exit(post_id.to_string()));
        }

        fn on_enter_threads(&mut self, ticket: LoadTicket) {
            self.calls.push(Call::Load(ticket.0));
        }
    }

    fn machine() -> PanelStateMachine<RecordingHandler> {
        let mut roster = BotRoster::default();
        roster.replace(Some(vec![Bot::new("ai", "Copilot", "dm-ai")]));
        PanelStateMachine::new(RecordingHandler::default(), roster)
    }

    fn summary(id: &str) -> ThreadSummary {
        ThreadSummary {
            id: SubjectId::from(id),
            message: "hello".to_string(),
            channel_id: "dm-ai".to_string(),
            title: format!("thread {id}"),
            reply_count: 2,
            update_at: 10,
        }
    }

    fn post(raw: &str) -> Option<SubjectId> {
        Some(SubjectId::from(raw))
    }

    #[test]
    fn starts_on_new_tab() {
        let machine = machine();
        let view = machine.view();
        assert_eq!(view.tab, Tab::New);
        assert!(matches!(view.content, PanelContent::NewTab { active_bot: Some(_) }));
    }

    #[test]
    fn selecting_from_threads_enters_thread_once() {
        let mut machine = machine();
        machine.pick_tab(Tab::Threads).unwrap();
        machine.select_post(post("P")).unwrap();

        assert_eq!(machine.state().tab, Tab::Thread);
        assert_eq!(machine.state().selected_post_id, post("P"));
        assert_eq!(
            machine.handler().calls,
            vec![Call::Load(1), Call::Enter("P".to_string())]
        );
    }

    #[test]
    fn leaving_thread_reissues_mark() {
        let mut machine = machine();
        machine.select_post(post("P")).unwrap();
        machine.pick_tab(Tab::New).unwrap();

        assert_eq!(
            machine.handler().calls,
            vec![Call::Enter("P".to_string()), Call::Exit("P".to_string())]
        );
        assert_eq!(machine.state(), &PanelState::default());
    }

    #[test]
    fn every_threads_entry_loads() {
        let mut machine = machine();
        for _ in 0..3 {
            machine.pick_tab(Tab::Threads).unwrap();
        }
        assert_eq!(
            machine.handler().calls,
            vec![Call::Load(1), Call::Load(2), Call::Load(3)]
        );
    }

    #[test]
    fn content_is_empty_until_threads_arrive() {
        let mut machine = machine();
        machine.pick_tab(Tab::Threads).unwrap();
        assert_eq!(machine.view().content, PanelContent::Empty);

        machine
            .threads_loaded(LoadTicket::new(1), Ok(vec![summary("t1")]))
            .unwrap();
        let PanelContent::ThreadList { items } = machine.view().content else {
            panic!("expected thread list");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].label, "Copilot");
        assert_eq!(items[0].replies_count, 2);
    }

    #[test]
    fn reentering_threads_clears_previous_list() {
        let mut machine = machine();
        machine.pick_tab(Tab::Threads).unwrap();
        machine
            .threads_loaded(LoadTicket::new(1), Ok(vec![summary("t1")]))
            .unwrap();
        machine.pick_tab(Tab::Threads).unwrap();

        assert!(machine.threads().is_none());
        assert_eq!(machine.view().content, PanelContent::Empty);
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut machine = machine();
        machine.pick_tab(Tab::Threads).unwrap();
        machine.pick_tab(Tab::Threads).unwrap();

        let rejection = machine
            .threads_loaded(LoadTicket::new(1), Ok(vec![summary("old")]))
            .unwrap_err();
        assert_eq!(
            rejection,
            PanelRejection::StaleThreads {
                ticket: LoadTicket::new(1),
                latest: Some(LoadTicket::new(2)),
                tab: Tab::Threads,
            }
        );
        assert!(machine.threads().is_none());

        machine.pick_tab(Tab::New).unwrap();
        assert!(
            machine
                .threads_loaded(LoadTicket::new(2), Ok(vec![summary("late")]))
                .is_err()
        );
        assert!(machine.threads().is_none());
    }

    #[test]
    fn selection_invalidates_outstanding_fetch() {
        let mut machine = machine();
        machine.pick_tab(Tab::Threads).unwrap();
        machine.select_post(post("P")).unwrap();

        assert!(
            machine
                .threads_loaded(LoadTicket::new(1), Ok(vec![summary("t1")]))
                .is_err()
        );
        assert!(matches!(
            machine.view().content,
            PanelContent::ThreadViewer { .. }
        ));
    }

    #[test]
    fn failed_fetch_leaves_content_absent() {
        let mut machine = machine();
        machine.pick_tab(Tab::Threads).unwrap();
        machine
            .threads_loaded(
                LoadTicket::new(1),
                Err(ApiError::Request {
                    stage: "get-threads",
                    message: "offline".to_string(),
                }),
            )
            .unwrap();

        assert_eq!(machine.state().tab, Tab::Threads);
        assert_eq!(machine.view().content, PanelContent::Empty);
    }

    #[test]
    fn blank_selection_counts_as_cleared() {
        let mut machine = machine();
        machine.select_post(post("P")).unwrap();
        machine.select_post(Some(SubjectId::from(""))).unwrap();

        assert_eq!(machine.state().selected_post_id, None);
        assert_eq!(machine.handler().calls.last(), Some(&Call::Exit("P".to_string())));
    }

    #[test]
    fn unmount_exits_then_ignores_input() {
        let mut machine = machine();
        machine.select_post(post("P")).unwrap();
        machine.unmount().unwrap();

        assert!(!machine.is_mounted());
        assert_eq!(machine.pick_tab(Tab::Threads), Err(PanelRejection::Unmounted));
        assert_eq!(machine.unmount(), Err(PanelRejection::Unmounted));
        assert_eq!(
            machine.handler().calls,
            vec![Call::Enter("P".to_string()), Call::Exit("P".to_string())]
        );
    }

    #[test]
    fn empty_roster_shows_unconfigured() {
        let mut machine = machine();
        machine.handle(PanelInput::BotsChanged(Some(Vec::new()))).unwrap();
        machine.select_post(post("P")).unwrap();
        assert_eq!(machine.view().content, PanelContent::Unconfigured);

        machine.handle(PanelInput::BotsChanged(None)).unwrap();
        assert!(matches!(
            machine.view().content,
            PanelContent::ThreadViewer { .. }
        ));
    }

    #[test]
    fn thread_list_waits_for_roster() {
        let mut machine = PanelStateMachine::new(RecordingHandler::default(), BotRoster::default());
        machine.pick_tab(Tab::Threads).unwrap();
        machine
            .threads_loaded(LoadTicket::new(1), Ok(vec![summary("t1")]))
            .unwrap();
        assert_eq!(machine.view().content, PanelContent::Empty);

        machine
            .set_bots(Some(vec![Bot::new("ai", "Copilot", "dm-ai")]))
            .unwrap();
        assert!(matches!(
            machine.view().content,
            PanelContent::ThreadList { .. }
        ));
    }

    #[test]
    fn unknown_active_bot_is_rejected() {
        let mut machine = machine();
        assert_eq!(
            machine.set_active_bot("nobody"),
            Err(PanelRejection::UnknownBot("nobody".to_string()))
        );
        assert!(machine.set_active_bot("ai").is_ok());
    }
}
