use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FrameError {
    #[snafu(display("failed to parse push frame on `{stage}`: {source}"))]
    ParseFrame {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("push event '{event}' carries no post id"))]
    MissingSubject { stage: &'static str, event: String },
}

pub type FrameResult<T> = Result<T, FrameError>;

/// Failure reported by one listener. It never stops delivery to the others.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ListenerError {
    #[snafu(display("listener rejected update: {message}"))]
    Rejected { message: String },
    #[snafu(display("listener panicked on `{stage}`: {message}"))]
    Panicked {
        stage: &'static str,
        message: String,
    },
}

impl ListenerError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

pub type ListenerResult = Result<(), ListenerError>;
