//! Session state machine tests against a scripted fake gateway.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use atelier_engine::{ComposeError, Composer, Session, SubmitError};
use atelier_gateway::{Gateway, GatewayError, HistoryTurn, ResearchFindings};
use atelier_types::{
    Citation, GeneratedImage, ImageAttachment, ModelReply, NonEmptyString, ResponseMode, Speaker,
    Turn,
};

/// What the fake does when any of its operations is called.
#[derive(Clone)]
enum Script {
    Reply(String),
    Fail,
    Panic,
}

/// A scripted [`Gateway`] that records calls and can hold requests in
/// flight until the test releases them.
struct FakeGateway {
    script: Script,
    calls: Mutex<Vec<String>>,
    histories: Mutex<Vec<Vec<HistoryTurn>>>,
    gate: Option<Arc<Notify>>,
}

impl FakeGateway {
    fn replying(text: &str) -> Self {
        Self {
            script: Script::Reply(text.to_string()),
            calls: Mutex::new(Vec::new()),
            histories: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    fn failing() -> Self {
        Self {
            script: Script::Fail,
            ..Self::replying("")
        }
    }

    fn panicking() -> Self {
        Self {
            script: Script::Panic,
            ..Self::replying("")
        }
    }

    fn gated(text: &str, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::replying(text)
        }
    }

    fn record(&self, op: &str) {
        self.calls.lock().unwrap().push(op.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn complete_chat(
        &self,
        history: &[HistoryTurn],
        _text: &str,
        _image: Option<&ImageAttachment>,
    ) -> Result<NonEmptyString, GatewayError> {
        self.record("chat");
        self.histories.lock().unwrap().push(history.to_vec());
        self.wait_gate().await;
        match &self.script {
            Script::Reply(text) => {
                NonEmptyString::new(text.clone()).map_err(|_| GatewayError::EmptyResult)
            }
            Script::Fail => Err(GatewayError::EmptyResult),
            Script::Panic => panic!("scripted worker crash"),
        }
    }

    async fn generate_image(
        &self,
        prompt: &NonEmptyString,
    ) -> Result<GeneratedImage, GatewayError> {
        self.record("image");
        self.wait_gate().await;
        let _ = prompt;
        match &self.script {
            Script::Reply(_) => Ok(GeneratedImage::new(
                "aGVsbG8=".to_string(),
                "image/png".to_string(),
            )),
            Script::Fail => Err(GatewayError::EmptyResult),
            Script::Panic => panic!("scripted worker crash"),
        }
    }

    async fn research(&self, _topic: &NonEmptyString) -> Result<ResearchFindings, GatewayError> {
        self.record("research");
        self.wait_gate().await;
        match &self.script {
            Script::Reply(_) => Ok(ResearchFindings {
                text: NonEmptyString::new("## Overview\nfindings").unwrap(),
                citations: vec![Citation {
                    uri: "https://x.org".to_string(),
                    title: Some("X".to_string()),
                }],
            }),
            Script::Fail => Err(GatewayError::EmptyResult),
            Script::Panic => panic!("scripted worker crash"),
        }
    }
}

fn typed(composer: &mut Composer, text: &str) {
    for ch in text.chars() {
        composer.draft_mut().enter_char(ch);
    }
}

/// Poll until the in-flight request settles, bounded so a broken
/// machine fails the test instead of hanging it.
async fn settle(session: &mut Session) {
    for _ in 0..500 {
        if session.poll_settled() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("request did not settle");
}

fn submit_text(session: &mut Session, composer: &mut Composer, mode: ResponseMode, text: &str) {
    typed(composer, text);
    let submission = composer.compose(mode, session.conversation()).unwrap();
    session.submit(submission).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn n_submissions_end_with_alternating_turns() {
    let mut session = Session::new(Arc::new(FakeGateway::replying("answer")));
    let mut composer = Composer::new();

    for i in 0..3 {
        submit_text(
            &mut session,
            &mut composer,
            ResponseMode::Chat,
            &format!("question {i}"),
        );
        settle(&mut session).await;
    }

    let turns = session.conversation().turns();
    assert_eq!(turns.len(), 6);
    for (i, turn) in turns.iter().enumerate() {
        let expected = if i % 2 == 0 {
            Speaker::User
        } else {
            Speaker::Model
        };
        assert_eq!(turn.speaker(), expected, "turn {i}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_submission_never_reaches_the_session() {
    let gateway = Arc::new(FakeGateway::replying("unused"));
    let session = Session::new(Arc::clone(&gateway) as Arc<dyn Gateway>);
    let mut composer = Composer::new();
    typed(&mut composer, "   ");

    let err = composer
        .compose(ResponseMode::Chat, session.conversation())
        .unwrap_err();
    assert_eq!(err, ComposeError::EmptyDraft);
    assert!(session.conversation().is_empty());
    assert!(!session.is_submitting());
    assert!(gateway.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn second_submit_while_busy_is_rejected_without_side_effects() {
    let gate = Arc::new(Notify::new());
    let mut session = Session::new(Arc::new(FakeGateway::gated("slow answer", Arc::clone(&gate))));
    let mut composer = Composer::new();

    submit_text(&mut session, &mut composer, ResponseMode::Chat, "first");
    assert!(session.is_submitting());
    let len_before = session.conversation().len();

    typed(&mut composer, "second");
    let submission = composer
        .compose(ResponseMode::Chat, session.conversation())
        .unwrap();
    assert_eq!(session.submit(submission), Err(SubmitError::Busy));
    assert_eq!(session.conversation().len(), len_before);

    gate.notify_one();
    settle(&mut session).await;
    assert_eq!(session.conversation().len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn gateway_swap_is_refused_while_in_flight() {
    let gate = Arc::new(Notify::new());
    let mut session = Session::new(Arc::new(FakeGateway::gated("slow", Arc::clone(&gate))));
    let mut composer = Composer::new();

    submit_text(&mut session, &mut composer, ResponseMode::Chat, "hello");
    let replacement: Arc<dyn Gateway> = Arc::new(FakeGateway::replying("other"));
    assert_eq!(
        session.set_gateway(Arc::clone(&replacement)),
        Err(SubmitError::Busy)
    );

    gate.notify_one();
    settle(&mut session).await;
    assert_eq!(session.set_gateway(replacement), Ok(()));
}

#[tokio::test(flavor = "multi_thread")]
async fn in_flight_mode_is_the_one_captured_at_submit() {
    let gate = Arc::new(Notify::new());
    let gateway = Arc::new(FakeGateway::gated("ok", Arc::clone(&gate)));
    let mut session = Session::new(Arc::clone(&gateway) as Arc<dyn Gateway>);
    let mut composer = Composer::new();

    submit_text(&mut session, &mut composer, ResponseMode::Research, "topic");
    // The UI's selected mode may change freely now; the in-flight
    // request keeps the mode it was submitted with.
    assert_eq!(session.in_flight_mode(), Some(ResponseMode::Research));

    gate.notify_one();
    settle(&mut session).await;
    assert_eq!(gateway.calls(), vec!["research"]);
    assert_eq!(session.in_flight_mode(), None);

    let Turn::Model(model) = &session.conversation().turns()[1] else {
        panic!("expected model turn");
    };
    assert!(matches!(model.reply(), ModelReply::ResearchReport { .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn modes_dispatch_to_matching_gateway_operations() {
    let gateway = Arc::new(FakeGateway::replying("chat answer"));
    let mut session = Session::new(Arc::clone(&gateway) as Arc<dyn Gateway>);
    let mut composer = Composer::new();

    submit_text(&mut session, &mut composer, ResponseMode::Chat, "hello");
    settle(&mut session).await;
    submit_text(
        &mut session,
        &mut composer,
        ResponseMode::ImageGeneration,
        "a lighthouse",
    );
    settle(&mut session).await;
    submit_text(&mut session, &mut composer, ResponseMode::Research, "energy");
    settle(&mut session).await;

    assert_eq!(gateway.calls(), vec!["chat", "image", "research"]);

    let turns = session.conversation().turns();
    let Turn::Model(image_turn) = &turns[3] else {
        panic!("expected model turn");
    };
    match image_turn.reply() {
        ModelReply::GeneratedImage { caption, image } => {
            assert!(caption.as_str().contains("a lighthouse"));
            assert_eq!(image.mime(), "image/png");
        }
        other => panic!("expected generated image, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_chat_reply_settles_as_error_turn() {
    let mut session = Session::new(Arc::new(FakeGateway::failing()));
    let mut composer = Composer::new();

    submit_text(&mut session, &mut composer, ResponseMode::Chat, "hello");
    settle(&mut session).await;

    let turns = session.conversation().turns();
    assert_eq!(turns.len(), 2);
    let Turn::Model(model) = &turns[1] else {
        panic!("expected model turn");
    };
    match model.reply() {
        ModelReply::Plain(text) => assert!(text.as_str().contains("error")),
        other => panic!("expected plain error turn, got {other:?}"),
    }
    assert!(!session.is_submitting());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_image_generation_settles_as_plain_error_turn() {
    let mut session = Session::new(Arc::new(FakeGateway::failing()));
    let mut composer = Composer::new();

    submit_text(
        &mut session,
        &mut composer,
        ResponseMode::ImageGeneration,
        "a lighthouse",
    );
    settle(&mut session).await;

    let turns = session.conversation().turns();
    assert_eq!(turns.len(), 2);
    let Turn::Model(model) = &turns[1] else {
        panic!("expected model turn");
    };
    match model.reply() {
        ModelReply::Plain(text) => {
            assert!(text.as_str().contains("Could not generate an image"));
        }
        other => panic!("expected plain error turn, got {other:?}"),
    }
    assert!(!session.is_submitting());
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_research_settles_as_plain_error_turn_without_citations() {
    let mut session = Session::new(Arc::new(FakeGateway::failing()));
    let mut composer = Composer::new();

    submit_text(
        &mut session,
        &mut composer,
        ResponseMode::Research,
        "renewable energy",
    );
    settle(&mut session).await;

    let turns = session.conversation().turns();
    assert_eq!(turns.len(), 2);
    let Turn::Model(model) = &turns[1] else {
        panic!("expected model turn");
    };
    match model.reply() {
        ModelReply::Plain(text) => {
            assert!(text.as_str().contains("web research came back empty"));
        }
        other => panic!("expected plain error turn, got {other:?}"),
    }
    assert!(!session.is_submitting());
}

#[tokio::test(flavor = "multi_thread")]
async fn crashed_worker_still_settles_with_an_error_turn() {
    let mut session = Session::new(Arc::new(FakeGateway::panicking()));
    let mut composer = Composer::new();

    submit_text(&mut session, &mut composer, ResponseMode::Chat, "hello");
    settle(&mut session).await;

    let turns = session.conversation().turns();
    assert_eq!(turns.len(), 2);
    let Turn::Model(model) = &turns[1] else {
        panic!("expected model turn");
    };
    assert!(matches!(model.reply(), ModelReply::Plain(_)));
    assert!(!session.is_submitting());
}

#[tokio::test(flavor = "multi_thread")]
async fn history_sent_to_gateway_excludes_the_submitted_turn() {
    let gateway = Arc::new(FakeGateway::replying("answer"));
    let mut session = Session::new(Arc::clone(&gateway) as Arc<dyn Gateway>);
    let mut composer = Composer::new();

    submit_text(&mut session, &mut composer, ResponseMode::Chat, "first");
    settle(&mut session).await;
    submit_text(&mut session, &mut composer, ResponseMode::Chat, "second");
    settle(&mut session).await;

    let histories = gateway.histories.lock().unwrap();
    assert!(histories[0].is_empty());
    assert_eq!(histories[1].len(), 2);
    assert_eq!(histories[1][0].text, "first");
    assert_eq!(histories[1][1].text, "answer");
}

#[tokio::test(flavor = "multi_thread")]
async fn optimistic_user_turn_is_visible_before_settlement() {
    let gate = Arc::new(Notify::new());
    let mut session = Session::new(Arc::new(FakeGateway::gated("ok", Arc::clone(&gate))));
    let mut composer = Composer::new();

    let attachment = ImageAttachment::from_bytes("photo.png", b"img").unwrap();
    composer.stage_attachment(attachment.clone());
    typed(&mut composer, "what is this?");
    let submission = composer
        .compose(ResponseMode::Chat, session.conversation())
        .unwrap();
    session.submit(submission).unwrap();

    // User turn, with its preview attachment, appended before settle.
    let turns = session.conversation().turns();
    assert_eq!(turns.len(), 1);
    let Turn::User(user) = &turns[0] else {
        panic!("expected user turn");
    };
    assert_eq!(user.text(), "what is this?");
    assert_eq!(user.attachment(), Some(&attachment));

    gate.notify_one();
    settle(&mut session).await;
    assert_eq!(session.conversation().len(), 2);
}
