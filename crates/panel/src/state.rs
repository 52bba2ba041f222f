use serde::{Deserialize, Serialize};

use sidekick_live::SubjectId;

/// Sidebar tab. `Thread` is also forced whenever a post is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    New,
    Threads,
    Thread,
}

/// Identifies one thread-list fetch so late responses can be matched against the latest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

impl LoadTicket {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PanelState {
    pub tab: Tab,
    pub selected_post_id: Option<SubjectId>,
}

/// Transition input for the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelTransition {
    /// The selection store changed. `None` clears the selection.
    Select(Option<SubjectId>),
    /// The user picked a tab in the header.
    PickTab(Tab),
    /// The panel is being torn down.
    Unmount,
}

/// Side effect requested by a transition, run in order by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEffect {
    EnterThread(SubjectId),
    ExitThread(SubjectId),
    EnterThreads,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelStep {
    pub next: PanelState,
    pub effects: Vec<PanelEffect>,
}

impl PanelStep {
    fn unchanged(state: &PanelState) -> Self {
        Self {
            next: state.clone(),
            effects: Vec::new(),
        }
    }
}

impl PanelState {
    /// Computes the next state and its effects without running anything.
    ///
    /// Leaving a selected post always yields `ExitThread` before anything else so the exit mark
    /// for the old post is issued ahead of any entry work for the new view.
    pub fn apply(&self, transition: PanelTransition) -> PanelStep {
        match transition {
            PanelTransition::Select(Some(post_id)) => self.apply_select(post_id),
            PanelTransition::Select(None) => self.apply_clear_selection(),
            PanelTransition::PickTab(tab) => self.apply_pick_tab(tab),
            PanelTransition::Unmount => self.apply_unmount(),
        }
    }

    fn apply_select(&self, post_id: SubjectId) -> PanelStep {
        if self.selected_post_id.as_ref() == Some(&post_id) {
            return PanelStep::unchanged(self);
        }

        let mut effects = Vec::with_capacity(2);
        if let Some(previous) = &self.selected_post_id {
            effects.push(PanelEffect::ExitThread(previous.clone()));
        }
        effects.push(PanelEffect::EnterThread(post_id.clone()));

        PanelStep {
            next: Self {
                tab: Tab::Thread,
                selected_post_id: Some(post_id),
            },
            effects,
        }
    }

    fn apply_clear_selection(&self) -> PanelStep {
        let Some(previous) = &self.selected_post_id else {
            return PanelStep::unchanged(self);
        };

        PanelStep {
            next: Self {
                tab: self.tab,
                selected_post_id: None,
            },
            effects: vec![PanelEffect::ExitThread(previous.clone())],
        }
    }

    fn apply_pick_tab(&self, tab: Tab) -> PanelStep {
        // A selection would immediately force `Thread` again, so picking any other tab drops it.
        if tab == Tab::Thread {
            return PanelStep {
                next: Self {
                    tab,
                    selected_post_id: self.selected_post_id.clone(),
                },
                effects: Vec::new(),
            };
        }

        let mut effects = Vec::with_capacity(2);
        if let Some(previous) = &self.selected_post_id {
            effects.push(PanelEffect::ExitThread(previous.clone()));
        }
        if tab == Tab::Threads {
            effects.push(PanelEffect::EnterThreads);
        }

        PanelStep {
            next: Self {
                tab,
                selected_post_id: None,
            },
            effects,
        }
    }

    fn apply_unmount(&self) -> PanelStep {
        PanelStep {
            next: self.clone(),
            effects: self
                .selected_post_id
                .iter()
                .cloned()
                .map(PanelEffect::ExitThread)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(raw: &str) -> SubjectId {
        SubjectId::from(raw)
    }

    fn viewing(raw: &str) -> PanelState {
        PanelState {
            tab: Tab::Thread,
            selected_post_id: Some(post(raw)),
        }
    }

    #[test]
    fn initial_state_is_new_tab_without_selection() {
        let state = PanelState::default();
        assert_eq!(state.tab, Tab::New);
        assert_eq!(state.selected_post_id, None);
    }

    #[test]
    fn selection_preempts_any_tab() {
        for tab in [Tab::New, Tab::Threads, Tab::Thread] {
            let state = PanelState {
                tab,
                selected_post_id: None,
            };
            let step = state.apply(PanelTransition::Select(Some(post("p1"))));
            assert_eq!(step.next, viewing("p1"));
            assert_eq!(step.effects, vec![PanelEffect::EnterThread(post("p1"))]);
        }
    }

    #[test]
    fn switching_posts_exits_old_before_entering_new() {
        let step = viewing("p1").apply(PanelTransition::Select(Some(post("p2"))));
        assert_eq!(step.next, viewing("p2"));
        assert_eq!(
            step.effects,
            vec![
                PanelEffect::ExitThread(post("p1")),
                PanelEffect::EnterThread(post("p2")),
            ]
        );
    }

    #[test]
    fn reselecting_current_post_changes_nothing() {
        let step = viewing("p1").apply(PanelTransition::Select(Some(post("p1"))));
        assert_eq!(step.next, viewing("p1"));
        assert!(step.effects.is_empty());
    }

    #[test]
    fn clearing_selection_exits_but_keeps_tab() {
        let step = viewing("p1").apply(PanelTransition::Select(None));
        assert_eq!(step.next.tab, Tab::Thread);
        assert_eq!(step.next.selected_post_id, None);
        assert_eq!(step.effects, vec![PanelEffect::ExitThread(post("p1"))]);

        let idle = PanelState::default().apply(PanelTransition::Select(None));
        assert!(idle.effects.is_empty());
    }

    #[test]
    fn picking_tabs_drops_selection_and_requests_loads() {
        let step = viewing("p1").apply(PanelTransition::PickTab(Tab::New));
        assert_eq!(step.next, PanelState::default());
        assert_eq!(step.effects, vec![PanelEffect::ExitThread(post("p1"))]);

        let step = viewing("p1").apply(PanelTransition::PickTab(Tab::Threads));
        assert_eq!(step.next.tab, Tab::Threads);
        assert_eq!(
            step.effects,
            vec![PanelEffect::ExitThread(post("p1")), PanelEffect::EnterThreads]
        );

        let already_there = PanelState {
            tab: Tab::Threads,
            selected_post_id: None,
        };
        let step = already_there.apply(PanelTransition::PickTab(Tab::Threads));
        assert_eq!(step.effects, vec![PanelEffect::EnterThreads]);
    }

    #[test]
    fn picking_thread_tab_keeps_selection_without_effects() {
        let step = viewing("p1").apply(PanelTransition::PickTab(Tab::Thread));
        assert_eq!(step.next, viewing("p1"));
        assert!(step.effects.is_empty());
    }

    #[test]
    fn unmount_exits_selected_post_only() {
        let step = viewing("p1").apply(PanelTransition::Unmount);
        assert_eq!(step.effects, vec![PanelEffect::ExitThread(post("p1"))]);

        let step = PanelState::default().apply(PanelTransition::Unmount);
        assert!(step.effects.is_empty());
    }

    #[test]
    fn load_tickets_advance() {
        assert_eq!(LoadTicket::new(1).next(), LoadTicket::new(2));
    }
}
