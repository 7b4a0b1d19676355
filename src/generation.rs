// Sequential reply generation

use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::api::ReplyGenerator;
use crate::error::GenerationError;
use crate::events::AppEvent;
use crate::models::{Category, ReplyRequest, ReplyResult, SessionStatus};

pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<ReplyResult, GenerationError>> + Send>>;

const PERSONA: &str = "You are a clever reply sniper — trained to respond to any online post \
                       in ways that spark conversation, curiosity, or chaos.";

const OUTPUT_RULE: &str = "Output only the reply text, no JSON formatting.";

/// Full prompt for one category, with the post quoted verbatim
pub fn build_prompt(request: &ReplyRequest) -> String {
    format!(
        "{PERSONA}\n\n{}\n\nPost: \"{}\"\n\n{OUTPUT_RULE}",
        request.category.instruction(),
        request.source_text
    )
}

#[derive(Clone)]
pub struct Orchestrator {
    generator: Arc<dyn ReplyGenerator>,
    pace: Duration,
}

struct StreamState {
    generator: Arc<dyn ReplyGenerator>,
    source_text: String,
    pace: Duration,
    next: usize,
    pause_pending: bool,
    halted: bool,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn ReplyGenerator>, pace: Duration) -> Self {
        Self { generator, pace }
    }

    /// Lazily rolls the three replies for `source_text`.
    ///
    /// Returns `None` for blank input; nothing is requested in that case. The
    /// stream yields one item per category in [`Category::ALL`] order and ends
    /// after the first error. Nothing happens until it is polled.
    pub fn generate(&self, source_text: &str) -> Option<ReplyStream> {
        if source_text.trim().is_empty() {
            return None;
        }

        let state = StreamState {
            generator: Arc::clone(&self.generator),
            source_text: source_text.to_string(),
            pace: self.pace,
            next: 0,
            pause_pending: false,
            halted: false,
        };

        Some(Box::pin(stream::unfold(state, |mut state| async move {
            if state.halted {
                return None;
            }

            if state.pause_pending {
                tokio::time::sleep(state.pace).await;
                state.pause_pending = false;
            }

            let category = *Category::ALL.get(state.next)?;
            let request = ReplyRequest::new(category, state.source_text.clone());
            let prompt = build_prompt(&request);

            debug!(category = ?category, "requesting reply");

            let item = match state.generator.generate(&prompt).await {
                Ok(text) if text.trim().is_empty() => Err(GenerationError::EmptyReply),
                Ok(text) => Ok(ReplyResult::new(category, &text)),
                Err(e) => Err(e),
            };

            if item.is_ok() {
                state.next += 1;
                state.pause_pending = true;
            } else {
                state.halted = true;
            }

            Some((item, state))
        })))
    }
}

/// Drives one session to its end, reporting progress on `events`.
///
/// Every event carries `session` so the receiver can drop results from a
/// session it has since discarded. Errors are logged and reported, never returned.
pub async fn run_session(
    orchestrator: Orchestrator,
    session: Uuid,
    source_text: String,
    events: mpsc::UnboundedSender<AppEvent>,
) -> SessionStatus {
    let Some(mut replies) = orchestrator.generate(&source_text) else {
        debug!(session = %session, "blank input, nothing to generate");
        return SessionStatus::Idle;
    };

    info!(session = %session, "generation started");

    let mut status = SessionStatus::Complete;

    while let Some(item) = replies.next().await {
        match item {
            Ok(result) => {
                debug!(session = %session, category = ?result.category, "reply ready");
                if events.send(AppEvent::ReplyReady { session, result }).is_err() {
                    debug!(session = %session, "event receiver gone, stopping");
                    return SessionStatus::Idle;
                }
            }
            Err(e) => {
                error!(session = %session, error = %e, "error generating replies");
                let message = e.to_string();
                let _ = events.send(AppEvent::GenerationFailed {
                    session,
                    error: message.clone(),
                });
                status = SessionStatus::Failed(message);
            }
        }
    }

    let _ = events.send(AppEvent::GenerationFinished { session });
    info!(session = %session, status = ?status, "generation finished");

    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockReplyGenerator;
    use async_trait::async_trait;
    use mockall::Sequence;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const POST: &str = "I think pineapple belongs on pizza.";

    fn orchestrator(generator: impl ReplyGenerator + 'static) -> Orchestrator {
        Orchestrator::new(Arc::new(generator), Duration::from_millis(800))
    }

    fn quota_error() -> GenerationError {
        GenerationError::Api {
            status: 429,
            body: "quota exceeded".to_string(),
        }
    }

    /// Answers from a script and records how many calls overlapped
    struct ScriptedGenerator {
        replies: Mutex<Vec<Result<String, GenerationError>>>,
        prompts: Arc<Mutex<Vec<String>>>,
        in_flight: AtomicUsize,
        max_in_flight: Arc<AtomicUsize>,
    }

    impl ScriptedGenerator {
        fn new(mut replies: Vec<Result<String, GenerationError>>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                prompts: Arc::new(Mutex::new(Vec::new())),
                in_flight: AtomicUsize::new(0),
                max_in_flight: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl ReplyGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());

            tokio::time::sleep(Duration::from_millis(50)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(GenerationError::EmptyReply))
        }
    }

    #[test]
    fn test_prompt_embeds_post_verbatim() {
        let prompt = build_prompt(&ReplyRequest::new(Category::Curious, POST));
        assert!(prompt.starts_with("You are a clever reply sniper"));
        assert!(prompt.contains("Post: \"I think pineapple belongs on pizza.\""));
        assert!(prompt.contains("makes people curious"));
        assert!(prompt.ends_with("Output only the reply text, no JSON formatting."));
    }

    #[test]
    fn test_prompts_differ_per_category() {
        let prompts: Vec<String> = Category::ALL
            .into_iter()
            .map(|c| build_prompt(&ReplyRequest::new(c, POST)))
            .collect();
        assert_ne!(prompts[0], prompts[1]);
        assert_ne!(prompts[1], prompts[2]);
        assert_ne!(prompts[0], prompts[2]);
    }

    #[test]
    fn test_blank_input_is_a_no_op() {
        let mut mock = MockReplyGenerator::new();
        mock.expect_generate().never();
        let orchestrator = orchestrator(mock);

        assert!(orchestrator.generate("").is_none());
        assert!(orchestrator.generate("  \n\t").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_replies_in_fixed_order() {
        let mut mock = MockReplyGenerator::new();
        let mut seq = Sequence::new();

        for (category, reply) in [
            (Category::Conversational, "  witty  "),
            (Category::Curious, "thoughtful"),
            (Category::Provocative, "\nspicy\n"),
        ] {
            let instruction = category.instruction();
            mock.expect_generate()
                .withf(move |prompt| prompt.contains(instruction) && prompt.contains(POST))
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_| Ok(reply.to_string()));
        }

        let replies: Vec<_> = orchestrator(mock).generate(POST).unwrap().collect().await;

        assert_eq!(replies.len(), 3);
        let results: Vec<ReplyResult> = replies.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            results,
            vec![
                ReplyResult::new(Category::Conversational, "witty"),
                ReplyResult::new(Category::Curious, "thoughtful"),
                ReplyResult::new(Category::Provocative, "spicy"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_on_second_call_stops_the_stream() {
        let mut mock = MockReplyGenerator::new();
        let mut seq = Sequence::new();

        mock.expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok("first".to_string()));
        mock.expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(quota_error()));

        let mut replies = orchestrator(mock).generate(POST).unwrap();

        let first = replies.next().await.unwrap().unwrap();
        assert_eq!(first.category, Category::Conversational);
        assert!(matches!(
            replies.next().await,
            Some(Err(GenerationError::Api { status: 429, .. }))
        ));
        // The mock would panic on a third call
        assert!(replies.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_on_third_call_keeps_two_replies() {
        let mut mock = MockReplyGenerator::new();
        let mut seq = Sequence::new();

        for reply in ["first", "second"] {
            mock.expect_generate()
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_| Ok(reply.to_string()));
        }
        mock.expect_generate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(quota_error()));

        let mut replies = orchestrator(mock).generate(POST).unwrap();

        let first = replies.next().await.unwrap().unwrap();
        let second = replies.next().await.unwrap().unwrap();
        assert_eq!(first, ReplyResult::new(Category::Conversational, "first"));
        assert_eq!(second, ReplyResult::new(Category::Curious, "second"));
        assert!(matches!(
            replies.next().await,
            Some(Err(GenerationError::Api { status: 429, .. }))
        ));
        assert!(replies.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_on_first_call_retains_nothing() {
        let mut mock = MockReplyGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(|_| Err(GenerationError::MissingApiKey));

        let replies: Vec<_> = orchestrator(mock).generate(POST).unwrap().collect().await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_model_output_counts_as_failure() {
        let mut mock = MockReplyGenerator::new();
        mock.expect_generate()
            .times(1)
            .returning(|_| Ok("   ".to_string()));

        let replies: Vec<_> = orchestrator(mock).generate(POST).unwrap().collect().await;
        assert_eq!(replies.len(), 1);
        assert!(matches!(replies[0], Err(GenerationError::EmptyReply)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_is_lazy() {
        let mut mock = MockReplyGenerator::new();
        mock.expect_generate().never();

        let replies = orchestrator(mock).generate(POST);
        assert!(replies.is_some());
        drop(replies);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_follows_each_reply() {
        let mut mock = MockReplyGenerator::new();
        mock.expect_generate()
            .times(3)
            .returning(|_| Ok("reply".to_string()));

        let start = tokio::time::Instant::now();
        let mut replies = orchestrator(mock).generate(POST).unwrap();

        replies.next().await.unwrap().unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);

        replies.next().await.unwrap().unwrap();
        let after_second = start.elapsed();
        assert!(after_second >= Duration::from_millis(800));
        assert!(after_second < Duration::from_millis(1600));

        replies.next().await.unwrap().unwrap();
        let after_third = start.elapsed();
        assert!(after_third >= Duration::from_millis(1600));
        assert!(after_third < Duration::from_millis(2400));

        // One more pause before the stream reports completion
        assert!(replies.next().await.is_none());
        assert!(start.elapsed() >= Duration::from_millis(2400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_calls_never_overlap() {
        let generator = ScriptedGenerator::new(vec![
            Ok("a".to_string()),
            Ok("b".to_string()),
            Ok("c".to_string()),
        ]);
        let prompts = Arc::clone(&generator.prompts);
        let max_in_flight = Arc::clone(&generator.max_in_flight);

        let replies: Vec<_> = orchestrator(generator).generate(POST).unwrap().collect().await;

        assert_eq!(replies.len(), 3);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);

        let prompts = prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        for (prompt, category) in prompts.iter().zip(Category::ALL) {
            assert!(prompt.contains(category.instruction()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_session_reports_each_reply() {
        let mut mock = MockReplyGenerator::new();
        mock.expect_generate()
            .times(3)
            .returning(|_| Ok("reply".to_string()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Uuid::new_v4();

        let status = run_session(orchestrator(mock), session, POST.to_string(), tx).await;
        assert_eq!(status, SessionStatus::Complete);

        let mut categories = Vec::new();
        let mut finished = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::ReplyReady { session: id, result } => {
                    assert_eq!(id, session);
                    assert!(!finished);
                    categories.push(result.category);
                }
                AppEvent::GenerationFinished { session: id } => {
                    assert_eq!(id, session);
                    finished = true;
                }
                other => panic!("unexpected event {other:?}"),
            }
        }

        assert!(finished);
        assert_eq!(categories, Category::ALL.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_session_reports_failure() {
        let generator = ScriptedGenerator::new(vec![Ok("first".to_string()), Err(quota_error())]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Uuid::new_v4();

        let status = run_session(orchestrator(generator), session, POST.to_string(), tx).await;
        assert!(matches!(status, SessionStatus::Failed(ref msg) if msg.contains("429")));

        let events: Vec<AppEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], AppEvent::ReplyReady { .. }));
        assert!(matches!(events[1], AppEvent::GenerationFailed { .. }));
        assert!(matches!(events[2], AppEvent::GenerationFinished { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_session_failure_on_third_call() {
        let generator = ScriptedGenerator::new(vec![
            Ok("first".to_string()),
            Ok("second".to_string()),
            Err(quota_error()),
        ]);
        let prompts = Arc::clone(&generator.prompts);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Uuid::new_v4();

        let status = run_session(orchestrator(generator), session, POST.to_string(), tx).await;
        assert!(matches!(status, SessionStatus::Failed(ref msg) if msg.contains("429")));

        let events: Vec<AppEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(
            events[0],
            AppEvent::ReplyReady { ref result, .. } if result.category == Category::Conversational
        ));
        assert!(matches!(
            events[1],
            AppEvent::ReplyReady { ref result, .. } if result.category == Category::Curious
        ));
        assert!(matches!(events[2], AppEvent::GenerationFailed { .. }));
        assert!(matches!(events[3], AppEvent::GenerationFinished { .. }));
        assert_eq!(prompts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_run_session_blank_input() {
        let mut mock = MockReplyGenerator::new();
        mock.expect_generate().never();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let status = run_session(orchestrator(mock), Uuid::new_v4(), "   ".to_string(), tx).await;

        assert_eq!(status, SessionStatus::Idle);
        assert!(rx.try_recv().is_err());
    }
}
