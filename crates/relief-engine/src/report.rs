//! The one place a command result turns into what the user is told.

use relief_ops::ReliefError;
use serde::Serialize;

use crate::types::{CommandResult, Completion, ReliefFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageKind {
    Info,
    Cancelled,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMessage {
    pub kind: MessageKind,
    pub title: String,
    pub body: String,
}

impl UserMessage {
    fn new(kind: MessageKind, title: &str, body: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.to_string(),
            body: body.into(),
        }
    }
}

/// Map a finished command to a message for the shell.
pub fn user_message(result: &Result<CommandResult, ReliefFailure>) -> UserMessage {
    match result {
        Ok(CommandResult::Declined { pixels, threshold }) => UserMessage::new(
            MessageKind::Info,
            "Image Relief",
            format!("Not run: the image has {pixels} pixels, above the limit of {threshold}."),
        ),
        Ok(CommandResult::Completed(outcome)) => match outcome.completion {
            Completion::Cancelled => {
                UserMessage::new(MessageKind::Cancelled, "Image Relief", "Cancelled.")
            }
            Completion::Done => UserMessage::new(
                MessageKind::Info,
                "Image Relief",
                format!(
                    "Relief finished: {} levels cut from {} pixels.",
                    outcome.report.levels_cut, outcome.report.cells_mapped
                ),
            ),
        },
        Err(failure) => UserMessage::new(MessageKind::Error, "Image Relief", failure_body(failure)),
    }
}

/// Error text, followed by where the run stopped and what it was run with
/// when the sequencer had started.
fn failure_body(failure: &ReliefFailure) -> String {
    let mut body = error_body(&failure.error);
    if let Some(ctx) = &failure.context {
        body.push_str(&format!(
            "\nStopped while {:?}: {}x{} image, {:?}, minimum depth {}.",
            failure.stage, ctx.image_width, ctx.image_height, ctx.strategy, ctx.params.min_depth
        ));
    }
    body
}

fn error_body(error: &ReliefError) -> String {
    match error {
        ReliefError::MinimumDepthExceeded { .. } => {
            "Minimum Depth exceeds object depth.".to_string()
        }
        ReliefError::ImageDecode { source_name, .. } => {
            format!("Invalid Image File: {source_name}")
        }
        ReliefError::NoDepthEdgeFound => {
            "No edge along the face normal was found to measure depth from.".to_string()
        }
        ReliefError::MissingSelection { what } => format!("Nothing selected for: {what}."),
        other => other.to_string(),
    }
}
