use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;

use atelier_gateway::{Gateway, GatewayError};
use atelier_types::{ModelReply, NonEmptyString, ResponseMode, Turn};

use crate::composer::Submission;
use crate::store::Conversation;

/// Shown when a worker vanished without reporting a result.
const LOST_REQUEST_TEXT: &str =
    "Sorry, something went wrong while handling this request. Please try again.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a request is already in flight")]
    Busy,
}

#[derive(Debug)]
struct InFlight {
    /// Mode captured at submit time; live mode switches don't touch it.
    mode: ResponseMode,
    rx: oneshot::Receiver<ModelReply>,
}

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Idle,
    Submitting(InFlight),
}

/// The mode-dispatch state machine.
///
/// Owns the [`Conversation`] exclusively. A submission appends the user
/// turn synchronously (optimistic append), runs the gateway call on a
/// spawned task, and settles via [`Session::poll_settled`] from the
/// render loop - at most one request is outstanding at any time.
pub struct Session {
    conversation: Conversation,
    phase: Phase,
    gateway: Arc<dyn Gateway>,
}

impl Session {
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            conversation: Conversation::new(),
            phase: Phase::Idle,
            gateway,
        }
    }

    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        matches!(self.phase, Phase::Submitting(_))
    }

    /// The mode of the in-flight request, if any.
    #[must_use]
    pub fn in_flight_mode(&self) -> Option<ResponseMode> {
        match &self.phase {
            Phase::Submitting(in_flight) => Some(in_flight.mode),
            Phase::Idle => None,
        }
    }

    /// Swap the backing gateway, e.g. after a model change.
    ///
    /// Refused while a request is in flight so the settled reply always
    /// comes from the gateway it was submitted to.
    pub fn set_gateway(&mut self, gateway: Arc<dyn Gateway>) -> Result<(), SubmitError> {
        if self.is_submitting() {
            return Err(SubmitError::Busy);
        }
        self.gateway = gateway;
        Ok(())
    }

    /// `Idle --submit--> Submitting`.
    ///
    /// The user turn is visible in the conversation before any network
    /// activity starts. Must run inside a tokio runtime.
    pub fn submit(&mut self, submission: Submission) -> Result<(), SubmitError> {
        if self.is_submitting() {
            return Err(SubmitError::Busy);
        }

        let Submission {
            mode,
            text,
            attachment,
            history,
        } = submission;

        self.conversation
            .append(Turn::user(text.clone(), attachment.clone()));

        let (tx, rx) = oneshot::channel();
        let gateway = Arc::clone(&self.gateway);
        tokio::spawn(async move {
            let reply = dispatch(gateway.as_ref(), mode, &text, attachment.as_ref(), &history).await;
            // A dropped receiver means the session is gone; nothing to do.
            let _ = tx.send(reply);
        });

        self.phase = Phase::Submitting(InFlight { mode, rx });
        tracing::debug!(mode = mode.as_str(), "submitted request");
        Ok(())
    }

    /// `Submitting --settle--> Idle`.
    ///
    /// Non-blocking; called once per render tick. Appends exactly one
    /// model turn per submission and returns whether a settlement
    /// happened this call. A worker that died without reporting settles
    /// as an error turn, so the machine cannot stay `Submitting` forever.
    pub fn poll_settled(&mut self) -> bool {
        let Phase::Submitting(in_flight) = &mut self.phase else {
            return false;
        };

        let reply = match in_flight.rx.try_recv() {
            Ok(reply) => reply,
            Err(oneshot::error::TryRecvError::Empty) => return false,
            Err(oneshot::error::TryRecvError::Closed) => {
                tracing::warn!("request worker dropped without settling");
                plain_reply(LOST_REQUEST_TEXT.to_string())
            }
        };

        self.conversation.append(Turn::model(reply));
        self.phase = Phase::Idle;
        true
    }
}

/// Invoke the gateway operation matching the captured mode and fold any
/// failure into a plain, human-readable reply.
async fn dispatch(
    gateway: &dyn Gateway,
    mode: ResponseMode,
    text: &str,
    attachment: Option<&atelier_types::ImageAttachment>,
    history: &[atelier_gateway::HistoryTurn],
) -> ModelReply {
    match mode {
        ResponseMode::Chat => match gateway.complete_chat(history, text, attachment).await {
            Ok(reply) => ModelReply::Plain(reply),
            Err(e) => plain_reply(failure_text(mode, &e)),
        },
        ResponseMode::ImageGeneration => match NonEmptyString::new(text) {
            Ok(prompt) => match gateway.generate_image(&prompt).await {
                Ok(image) => ModelReply::GeneratedImage {
                    caption: caption_for(&prompt),
                    image,
                },
                Err(e) => plain_reply(failure_text(mode, &e)),
            },
            // The composer rejects text-less non-chat submissions; this
            // is unreachable through the public path.
            Err(_) => plain_reply(failure_text(mode, &GatewayError::EmptyResult)),
        },
        ResponseMode::Research => match NonEmptyString::new(text) {
            Ok(topic) => match gateway.research(&topic).await {
                Ok(findings) => ModelReply::ResearchReport {
                    text: findings.text,
                    citations: findings.citations,
                },
                Err(e) => plain_reply(failure_text(mode, &e)),
            },
            Err(_) => plain_reply(failure_text(mode, &GatewayError::EmptyResult)),
        },
    }
}

fn caption_for(prompt: &NonEmptyString) -> NonEmptyString {
    NonEmptyString::new(format!("Generated image for: \"{prompt}\""))
        .expect("caption built from a non-empty prompt")
}

fn failure_text(mode: ResponseMode, error: &GatewayError) -> String {
    match (mode, error) {
        (ResponseMode::ImageGeneration, GatewayError::EmptyResult) => {
            "Could not generate an image for this prompt. Please try rephrasing it.".to_string()
        }
        (ResponseMode::Research, GatewayError::EmptyResult) => {
            "Sorry, the web research came back empty. Please try again.".to_string()
        }
        (_, e) => format!("Sorry, I encountered an error. {e}"),
    }
}

fn plain_reply(text: String) -> ModelReply {
    let text = NonEmptyString::new(text)
        .unwrap_or_else(|_| {
            NonEmptyString::new(LOST_REQUEST_TEXT).expect("fallback text is not empty")
        });
    ModelReply::Plain(text)
}
