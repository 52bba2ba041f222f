use serde::Serialize;

use sidekick_live::SubjectId;

use crate::api::ThreadSummary;
use crate::bots::{Bot, BotRoster};
use crate::state::{PanelState, Tab};

/// One row of the threads tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadItem {
    pub post_id: SubjectId,
    pub title: String,
    pub message: String,
    pub replies_count: u64,
    pub last_activity_at: i64,
    /// Display name of the bot owning the thread's DM channel, empty when unknown.
    pub label: String,
}

impl ThreadItem {
    fn from_summary(summary: &ThreadSummary, roster: &BotRoster) -> Self {
        Self {
            post_id: summary.id.clone(),
            title: summary.title.clone(),
            message: summary.message.clone(),
            replies_count: summary.reply_count,
            last_activity_at: summary.update_at,
            label: roster.label_for_channel(&summary.channel_id),
        }
    }
}

/// What the panel body shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PanelContent {
    /// No bot is configured for this workspace.
    Unconfigured,
    ThreadViewer { root_post_id: SubjectId },
    ThreadList { items: Vec<ThreadItem> },
    NewTab { active_bot: Option<Bot> },
    /// Nothing to show yet, for example while the thread list is loading.
    Empty,
}

/// Read-only projection handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub tab: Tab,
    pub selected_post_id: Option<SubjectId>,
    pub threads: Option<Vec<ThreadSummary>>,
    pub active_bot: Option<Bot>,
    pub content: PanelContent,
}

impl PanelView {
    pub(crate) fn project(
        state: &PanelState,
        threads: Option<&[ThreadSummary]>,
        roster: &BotRoster,
    ) -> Self {
        let content = if roster.is_unconfigured() {
            PanelContent::Unconfigured
        } else if let Some(post_id) = &state.selected_post_id {
            PanelContent::ThreadViewer {
                root_post_id: post_id.clone(),
            }
        } else {
            match (state.tab, threads) {
                (Tab::Threads, Some(threads)) if roster.is_loaded() => PanelContent::ThreadList {
                    items: threads
                        .iter()
                        .map(|summary| ThreadItem::from_summary(summary, roster))
                        .collect(),
                },
                (Tab::New, _) => PanelContent::NewTab {
                    active_bot: roster.active_bot().cloned(),
                },
                _ => PanelContent::Empty,
            }
        };

        Self {
            tab: state.tab,
            selected_post_id: state.selected_post_id.clone(),
            threads: threads.map(<[ThreadSummary]>::to_vec),
            active_bot: roster.active_bot().cloned(),
            content,
        }
    }
}
