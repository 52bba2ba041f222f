//! Drives a headless sidebar from a JSON-lines transcript.
//!
//! Each line is one step, for example `{"tab": "threads"}` or
//! `{"push": {"event": "custom_mattermost-ai_postupdate", "data": {"post_id": "p1"}}}`.
//! Collaborators are in-memory fixtures that log what the core asks of them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};

use sidekick_live::{PushFrame, Registration, SubjectId, UpdateEvent};
use sidekick_panel::{ApiResult, Bot, PanelInput, ReadApi, ReadMark, Tab, ThreadSummary, ThreadsApi};

use crate::host::SidebarHost;

const SETTLE_ROUNDS: usize = 4;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptStep {
    Push(PushFrame),
    Select(Option<String>),
    Tab(Tab),
    Bots(Option<Vec<Bot>>),
    ActiveBot(String),
    /// Replaces what the fixture thread API returns from now on.
    Threads(Vec<ThreadSummary>),
    Listen(SubjectId),
    Unlisten(SubjectId),
    Unmount,
}

impl TranscriptStep {
    pub fn parse_lines(text: &str) -> Result<Vec<Self>, ReplayError> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
            .map(|(index, line)| {
                serde_json::from_str(line).context(ParseStepSnafu {
                    stage: "parse-transcript-step",
                    line: index + 1,
                })
            })
            .collect()
    }
}

#[derive(Debug, Snafu)]
pub enum ReplayError {
    #[snafu(display("failed to read transcript {path:?} on `{stage}`: {source}"))]
    ReadTranscript {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("invalid transcript line {line} on `{stage}`: {source}"))]
    ParseStep {
        stage: &'static str,
        line: usize,
        source: serde_json::Error,
    },
}

/// Thread API serving whatever list the transcript last provided.
#[derive(Debug, Default)]
pub struct FixtureThreadsApi {
    threads: Mutex<Vec<ThreadSummary>>,
}

impl FixtureThreadsApi {
    pub fn set_threads(&self, threads: Vec<ThreadSummary>) {
        *self.threads.lock().unwrap_or_else(PoisonError::into_inner) = threads;
    }
}

impl ThreadsApi for FixtureThreadsApi {
    fn get_threads(&self) -> BoxFuture<'static, ApiResult<Vec<ThreadSummary>>> {
        let threads = self
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        tracing::info!(count = threads.len(), "getThreads");
        Box::pin(async move { Ok(threads) })
    }
}

/// Read API that only records and logs the marks it receives.
#[derive(Debug, Default)]
pub struct LoggingReadApi {
    marks: Mutex<Vec<ReadMark>>,
}

impl LoggingReadApi {
    pub fn marks(&self) -> Vec<ReadMark> {
        self.marks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReadApi for LoggingReadApi {
    fn update_read(&self, mark: ReadMark) -> BoxFuture<'static, ApiResult<()>> {
        tracing::info!(
            user_id = %mark.user_id,
            team_id = %mark.team_id,
            subject_id = %mark.subject_id,
            read_at_ms = mark.read_at_ms,
            "updateRead"
        );
        self.marks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(mark);
        Box::pin(async { Ok(()) })
    }
}

pub struct Replay {
    host: SidebarHost,
    threads: Arc<FixtureThreadsApi>,
    listeners: HashMap<SubjectId, Vec<Registration>>,
    deliveries: Arc<Mutex<Vec<UpdateEvent>>>,
}

impl Replay {
    pub fn new(host: SidebarHost, threads: Arc<FixtureThreadsApi>) -> Self {
        Self {
            host,
            threads,
            listeners: HashMap::new(),
            deliveries: Arc::default(),
        }
    }

    pub fn host(&self) -> &SidebarHost {
        &self.host
    }

    /// Updates seen by transcript listeners, in delivery order.
    pub fn deliveries(&self) -> Vec<UpdateEvent> {
        self.deliveries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn run_file(&mut self, path: &Path) -> Result<(), ReplayError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .context(ReadTranscriptSnafu {
                stage: "read-transcript-file",
                path: path.to_path_buf(),
            })?;
        self.run(TranscriptStep::parse_lines(&text)?).await;
        Ok(())
    }

    pub async fn run(&mut self, steps: Vec<TranscriptStep>) {
        for step in steps {
            self.step(step).await;
            let view = self.host.view();
            tracing::info!(
                tab = ?view.tab,
                selected_post_id = ?view.selected_post_id,
                content = %serde_json::to_string(&view.content).unwrap_or_default(),
                "panel"
            );
        }
    }

    pub async fn step(&mut self, step: TranscriptStep) {
        let outcome = match step {
            TranscriptStep::Push(frame) => {
                if let Err(error) = self.host.handle_frame(frame) {
                    tracing::warn!(error = %error, "dropping undecodable push frame");
                }
                Ok(())
            }
            TranscriptStep::Select(post_id) => self
                .host
                .select_post(post_id.and_then(SubjectId::non_empty)),
            TranscriptStep::Tab(tab) => self.host.pick_tab(tab),
            TranscriptStep::Bots(bots) => self.host.handle(PanelInput::BotsChanged(bots)),
            TranscriptStep::ActiveBot(username) => {
                self.host.handle(PanelInput::SetActiveBot(username))
            }
            TranscriptStep::Threads(threads) => {
                self.threads.set_threads(threads);
                Ok(())
            }
            TranscriptStep::Listen(subject_id) => {
                self.listen(subject_id);
                Ok(())
            }
            TranscriptStep::Unlisten(subject_id) => {
                // Dropping the registrations releases every listener on the subject.
                self.listeners.remove(&subject_id);
                Ok(())
            }
            TranscriptStep::Unmount => self.host.unmount(),
        };

        if let Err(rejection) = outcome {
            tracing::warn!(rejection = ?rejection, "transcript step rejected");
        }
        self.settle().await;
    }

    fn listen(&mut self, subject_id: SubjectId) {
        let deliveries = Arc::clone(&self.deliveries);
        let registration = self.host.router().subscribe(subject_id.clone(), move |event| {
            tracing::info!(
                subject_id = %event.subject_id,
                kind = ?event.kind,
                payload = %event.payload,
                "live update"
            );
            deliveries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
            Ok(())
        });
        self.listeners.entry(subject_id).or_default().push(registration);
    }

    async fn settle(&mut self) {
        for _ in 0..SETTLE_ROUNDS {
            tokio::task::yield_now().await;
            self.host.drain_completions();
        }
    }
}
