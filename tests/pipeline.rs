//! Answerer and voice pipeline integration tests

use std::time::Duration;

use voicemate::agent::{ANSWER_ERROR_REPLY, INVALID_QUESTION_REPLY, NO_RESPONSE_REPLY};
use voicemate::pipeline::{
    NOT_UNDERSTOOD_REPLY, SPEECH_FAILED_REPLY, TECHNICAL_ERROR_REPLY, UNPROCESSABLE_REPLY,
};
use voicemate::{ConversationMemory, Error};

mod common;

use common::{
    FakeChat, FakeRecognizer, FakeSpeech, answerer, pipeline, read_wav, silence_wav, sine_wav,
};

#[tokio::test]
async fn test_answer_grounded_in_knowledge() {
    let chat = FakeChat::answering("I studied computer science at Riverside University.");
    let answerer = answerer(chat.clone()).await;
    let mut memory = ConversationMemory::default();

    let answer = answerer.answer("Where did you study?", &mut memory).await;

    assert_eq!(answer, "I studied computer science at Riverside University.");
    assert_eq!(memory.len(), 1);

    let request = chat.last_request();
    assert_eq!(request.user, "Where did you study?");
    assert!(request.system.starts_with("You are Sam."));
    assert!(request.system.contains("<knowledge>"));
    assert!(request.system.contains("Riverside University"));
    assert!(!request.system.contains("<conversation-history>"));
    assert!((request.temperature - 0.7).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_follow_up_sees_history() {
    let chat = FakeChat::answering("Computer science.");
    let answerer = answerer(chat.clone()).await;
    let mut memory = ConversationMemory::default();

    answerer.answer("What did you study?", &mut memory).await;
    answerer.answer("Did you enjoy it?", &mut memory).await;

    let request = chat.last_request();
    assert!(request.system.contains(
        "<conversation-history>\nHuman: What did you study?\nAI: Computer science.\n</conversation-history>"
    ));
    assert_eq!(memory.len(), 2);
}

#[tokio::test]
async fn test_blank_question_skips_model() {
    let chat = FakeChat::answering("unused");
    let answerer = answerer(chat.clone()).await;
    let mut memory = ConversationMemory::default();

    assert_eq!(answerer.answer("   ", &mut memory).await, INVALID_QUESTION_REPLY);
    assert!(matches!(
        answerer.try_answer("", &mut memory).await,
        Err(Error::EmptyQuery)
    ));
    assert_eq!(chat.request_count(), 0);
    assert!(memory.is_empty());
}

#[tokio::test]
async fn test_model_failure_leaves_memory_unchanged() {
    let answerer = answerer(FakeChat::failing()).await;
    let mut memory = ConversationMemory::default();
    memory.push("Hi", "Hello!");

    let answer = answerer.answer("What are your hobbies?", &mut memory).await;

    assert_eq!(answer, ANSWER_ERROR_REPLY);
    assert_eq!(memory.len(), 1);
    assert_eq!(memory.transcript(), "Human: Hi\nAI: Hello!");
}

#[tokio::test]
async fn test_missing_answer() {
    let answerer = answerer(FakeChat::empty()).await;
    let mut memory = ConversationMemory::default();

    assert_eq!(answerer.answer("What are your hobbies?", &mut memory).await, NO_RESPONSE_REPLY);
    assert!(matches!(
        answerer.try_answer("What are your hobbies?", &mut memory).await,
        Err(Error::EmptyAnswer)
    ));
    assert!(memory.is_empty());
}

#[tokio::test]
async fn test_memory_stays_bounded() {
    let answerer = answerer(FakeChat::answering("Sure.")).await;
    let mut memory = ConversationMemory::new(10);

    for i in 0..12 {
        answerer.answer(&format!("Question {i}?"), &mut memory).await;
    }

    assert_eq!(memory.len(), 10);
    assert_eq!(memory.turns().next().unwrap().user, "Question 2?");
    assert_eq!(memory.turns().last().unwrap().user, "Question 11?");
}

#[tokio::test]
async fn test_clear_memory_starts_fresh() {
    let chat = FakeChat::answering("Sure.");
    let answerer = answerer(chat.clone()).await;
    let mut memory = ConversationMemory::default();

    answerer.answer("First question?", &mut memory).await;
    memory.clear();
    memory.clear();
    answerer.answer("Second question?", &mut memory).await;

    assert!(!chat.last_request().system.contains("First question"));
    assert_eq!(memory.len(), 1);
}

#[tokio::test]
async fn test_end_to_end_voice_query() {
    let recognizer = FakeRecognizer::hearing("Where did you study?");
    let chat = FakeChat::answering("I studied **computer science** at Riverside University.");
    let speech = FakeSpeech::new();
    let pipeline = pipeline(recognizer, chat, speech.clone()).await;
    let mut memory = ConversationMemory::default();

    let reply = pipeline.process(&sine_wav(0.5, 0.5), &mut memory).await;

    assert_eq!(reply.text, "I studied **computer science** at Riverside University.");
    assert!(!reply.audio.is_empty());
    let (spec, _) = read_wav(&reply.audio);
    assert_eq!(spec.channels, 1);
    assert_eq!(speech.spoken(), vec!["I studied computer science at Riverside University."]);
    assert_eq!(memory.len(), 1);
}

#[tokio::test]
async fn test_quiet_audio_not_understood() {
    let recognizer = FakeRecognizer::hearing("unused");
    let chat = FakeChat::answering("unused");
    let speech = FakeSpeech::new();
    let pipeline = pipeline(recognizer.clone(), chat.clone(), speech.clone()).await;
    let mut memory = ConversationMemory::default();

    let reply = pipeline.process(&silence_wav(1.0), &mut memory).await;

    assert_eq!(reply.text, NOT_UNDERSTOOD_REPLY);
    assert!(!reply.audio.is_empty());
    assert_eq!(recognizer.call_count(), 0);
    assert_eq!(chat.request_count(), 0);
    assert!(memory.is_empty());
}

#[tokio::test]
async fn test_recognizer_failure_not_understood() {
    let pipeline = pipeline(
        FakeRecognizer::failing(),
        FakeChat::answering("unused"),
        FakeSpeech::new(),
    )
    .await;
    let mut memory = ConversationMemory::default();

    let reply = pipeline.process(&sine_wav(0.5, 0.5), &mut memory).await;
    assert_eq!(reply.text, NOT_UNDERSTOOD_REPLY);
}

#[tokio::test]
async fn test_model_failure_is_technical_error() {
    let pipeline = pipeline(
        FakeRecognizer::hearing("What are your hobbies?"),
        FakeChat::failing(),
        FakeSpeech::new(),
    )
    .await;
    let mut memory = ConversationMemory::default();

    let reply = pipeline.process(&sine_wav(0.5, 0.5), &mut memory).await;

    assert_eq!(reply.text, TECHNICAL_ERROR_REPLY);
    assert!(!reply.audio.is_empty());
    assert!(memory.is_empty());
}

#[tokio::test]
async fn test_empty_answer_is_unprocessable() {
    let pipeline = pipeline(
        FakeRecognizer::hearing("What are your hobbies?"),
        FakeChat::empty(),
        FakeSpeech::new(),
    )
    .await;
    let mut memory = ConversationMemory::default();

    let reply = pipeline.process(&sine_wav(0.5, 0.5), &mut memory).await;
    assert_eq!(reply.text, UNPROCESSABLE_REPLY);
}

#[tokio::test]
async fn test_speech_failure_keeps_answer_text() {
    let speech = FakeSpeech::failing();
    let pipeline = pipeline(
        FakeRecognizer::hearing("What are your hobbies?"),
        FakeChat::answering("I play chess."),
        speech.clone(),
    )
    .await;
    let mut memory = ConversationMemory::default();

    let reply = pipeline.process(&sine_wav(0.5, 0.5), &mut memory).await;

    assert_eq!(reply.text, "I play chess.");
    assert!(reply.audio.is_empty());
    assert_eq!(speech.spoken(), vec!["I play chess.", SPEECH_FAILED_REPLY]);
    assert_eq!(memory.len(), 1);
}

#[tokio::test]
async fn test_sampleless_speech_is_speech_failure() {
    let speech = FakeSpeech::silent();
    let pipeline = pipeline(
        FakeRecognizer::hearing("What are your hobbies?"),
        FakeChat::answering("I play chess."),
        speech.clone(),
    )
    .await;
    let mut memory = ConversationMemory::default();

    let reply = pipeline.process(&sine_wav(0.5, 0.5), &mut memory).await;

    assert_eq!(reply.text, "I play chess.");
    assert!(reply.audio.is_empty());
    assert_eq!(speech.spoken(), vec!["I play chess.", SPEECH_FAILED_REPLY]);
}

#[tokio::test]
async fn test_unspeakable_answer_speaks_failure_notice() {
    let speech = FakeSpeech::new();
    let pipeline = pipeline(
        FakeRecognizer::hearing("Show me a divider"),
        FakeChat::answering("-----"),
        speech.clone(),
    )
    .await;
    let mut memory = ConversationMemory::default();

    let reply = pipeline.process(&sine_wav(0.5, 0.5), &mut memory).await;

    assert_eq!(reply.text, "-----");
    assert!(!reply.audio.is_empty());
    assert_eq!(speech.spoken(), vec![SPEECH_FAILED_REPLY]);
}

#[tokio::test]
async fn test_panic_is_contained() {
    let pipeline = pipeline(
        FakeRecognizer::hearing("What are your hobbies?"),
        FakeChat::panicking(),
        FakeSpeech::new(),
    )
    .await;
    let mut memory = ConversationMemory::default();

    let reply = pipeline.process(&sine_wav(0.5, 0.5), &mut memory).await;

    assert_eq!(reply.text, TECHNICAL_ERROR_REPLY);
    assert!(memory.is_empty());
}

#[tokio::test]
async fn test_stage_timeout() {
    let pipeline = pipeline(
        FakeRecognizer::hearing("What are your hobbies?"),
        FakeChat::stalling(Duration::from_secs(5)),
        FakeSpeech::new(),
    )
    .await
    .with_stage_timeout(Duration::from_millis(50));
    let mut memory = ConversationMemory::default();

    let reply = pipeline.process(&sine_wav(0.5, 0.5), &mut memory).await;

    assert_eq!(reply.text, TECHNICAL_ERROR_REPLY);
    assert!(memory.is_empty());
}

#[tokio::test]
async fn test_reply_text_never_empty() {
    let pipeline = pipeline(
        FakeRecognizer::failing(),
        FakeChat::failing(),
        FakeSpeech::failing(),
    )
    .await;
    let mut memory = ConversationMemory::default();

    for audio in [Vec::new(), b"garbage".to_vec(), silence_wav(0.5), sine_wav(0.5, 0.5)] {
        let reply = pipeline.process(&audio, &mut memory).await;
        assert!(!reply.text.is_empty());
    }
}
