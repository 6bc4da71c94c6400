use std::sync::{Arc, Mutex};

use mockall::Sequence;
use move_dataset::generate::{GenerateError, MockPromptGenerator};
use move_dataset::prompt::{resolve_prompt, PromptError, PRE_REQUEST_DELAY};
use move_dataset::retry::{MockSleeper, RetryPolicy};

const UNMARKED_CODE: &str = "module examples::escrow {\n    public fun lock() {}\n}";

/// Sleeper that accepts any number of sleeps without waiting.
fn noop_sleeper() -> MockSleeper {
    let mut sleeper = MockSleeper::new();
    sleeper.expect_sleep().returning(|_| ());
    sleeper
}

#[tokio::test]
async fn marker_prompt_never_calls_generator() {
    let code = "/// @prompt do A\nmodule examples::a {}";
    let mut generator = MockPromptGenerator::new();
    generator.expect_generate().times(0);
    let mut sleeper = MockSleeper::new();
    sleeper.expect_sleep().times(0);

    let prompt = resolve_prompt(
        code,
        "module examples::a {}",
        &generator,
        &sleeper,
        RetryPolicy::default(),
    )
    .await
    .expect("marker resolution should succeed");

    assert_eq!(prompt, "do A");
}

#[tokio::test]
async fn generated_prompt_is_taken_from_tag() {
    let mut generator = MockPromptGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Ok("Here is a summary.\n<prompt>\ndo B\n</prompt>".to_string()));
    let sleeper = noop_sleeper();

    let prompt = resolve_prompt(
        UNMARKED_CODE,
        UNMARKED_CODE,
        &generator,
        &sleeper,
        RetryPolicy::default(),
    )
    .await
    .expect("generation should succeed");

    assert_eq!(prompt, "do B");
}

#[tokio::test]
async fn missing_tag_falls_back_to_whole_response() {
    let mut generator = MockPromptGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .returning(|_| Ok("A bare description with no tags".to_string()));
    let sleeper = noop_sleeper();

    let prompt = resolve_prompt(
        UNMARKED_CODE,
        UNMARKED_CODE,
        &generator,
        &sleeper,
        RetryPolicy::default(),
    )
    .await
    .expect("fallback should succeed");

    assert_eq!(prompt, "A bare description with no tags");
}

#[tokio::test]
async fn generator_only_runs_after_pre_request_delay() {
    let events = Arc::new(Mutex::new(Vec::new()));

    let mut generator = MockPromptGenerator::new();
    {
        let events = events.clone();
        generator.expect_generate().times(1).returning(move |_| {
            events.lock().unwrap().push("generate".to_string());
            Ok("<prompt>ok</prompt>".to_string())
        });
    }
    let mut sleeper = MockSleeper::new();
    {
        let events = events.clone();
        sleeper.expect_sleep().times(1).returning(move |duration| {
            events
                .lock()
                .unwrap()
                .push(format!("sleep {}s", duration.as_secs()));
        });
    }

    resolve_prompt(
        UNMARKED_CODE,
        UNMARKED_CODE,
        &generator,
        &sleeper,
        RetryPolicy::default(),
    )
    .await
    .expect("generation should succeed");

    let recorded = events.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec![
            format!("sleep {}s", PRE_REQUEST_DELAY.as_secs()),
            "generate".to_string()
        ]
    );
}

#[tokio::test]
async fn rate_limit_on_every_attempt_gives_up_after_three() {
    let events = Arc::new(Mutex::new(Vec::new()));

    let mut generator = MockPromptGenerator::new();
    {
        let events = events.clone();
        generator.expect_generate().times(3).returning(move |_| {
            events.lock().unwrap().push("generate".to_string());
            Err(GenerateError::RateLimited)
        });
    }
    let mut sleeper = MockSleeper::new();
    {
        let events = events.clone();
        sleeper.expect_sleep().returning(move |duration| {
            events
                .lock()
                .unwrap()
                .push(format!("sleep {}s", duration.as_secs()));
        });
    }

    let result = resolve_prompt(
        UNMARKED_CODE,
        UNMARKED_CODE,
        &generator,
        &sleeper,
        RetryPolicy::default(),
    )
    .await;

    match result {
        Err(PromptError::RetriesExhausted { attempts }) => assert_eq!(attempts, 3),
        other => panic!("expected retries to be exhausted, got {:?}", other),
    }

    // 1s pre-call delay before every attempt, linear backoff between
    // attempts, and no sleep after the final failure.
    let recorded = events.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec![
            "sleep 1s", "generate", "sleep 5s", "sleep 1s", "generate", "sleep 10s", "sleep 1s",
            "generate",
        ]
    );
}

#[tokio::test]
async fn rate_limit_then_success_recovers() {
    let mut seq = Sequence::new();
    let mut generator = MockPromptGenerator::new();
    generator
        .expect_generate()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(GenerateError::RateLimited));
    generator
        .expect_generate()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok("<prompt>second try</prompt>".to_string()));
    let sleeper = noop_sleeper();

    let prompt = resolve_prompt(
        UNMARKED_CODE,
        UNMARKED_CODE,
        &generator,
        &sleeper,
        RetryPolicy::default(),
    )
    .await
    .expect("second attempt should succeed");

    assert_eq!(prompt, "second try");
}

#[tokio::test]
async fn non_rate_limit_error_is_not_retried() {
    let mut generator = MockPromptGenerator::new();
    generator.expect_generate().times(1).returning(|_| {
        Err(GenerateError::Api {
            status: 500,
            body: "internal error".to_string(),
        })
    });
    let sleeper = noop_sleeper();

    let result = resolve_prompt(
        UNMARKED_CODE,
        UNMARKED_CODE,
        &generator,
        &sleeper,
        RetryPolicy::default(),
    )
    .await;

    assert!(matches!(
        result,
        Err(PromptError::Generate(GenerateError::Api { status: 500, .. }))
    ));
}
