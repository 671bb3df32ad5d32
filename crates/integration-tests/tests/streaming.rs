mod harness;

use futures::StreamExt;
use harness::config::{azure_endpoint, minimax_endpoint, openai_endpoint};
use harness::mock_provider::MockProvider;
use lmkit_llm::{ChatParameters, HttpChatModel, LlmError, Message, StreamEvent};

#[tokio::test]
async fn openai_stream_emits_start_continue_finish() {
    let mock = MockProvider::start().await.unwrap();
    let model = HttpChatModel::from_config(&openai_endpoint(&mock)).unwrap();

    let mut stream = model
        .stream(&[Message::user("Hello there")], &ChatParameters::default())
        .await
        .unwrap();

    let mut outputs = Vec::new();
    while let Some(item) = stream.next().await {
        outputs.push(item.unwrap());
    }

    assert_eq!(outputs.first().unwrap().event, StreamEvent::Start);
    assert_eq!(outputs.iter().filter(|o| o.event == StreamEvent::Start).count(), 1);
    let last = outputs.last().unwrap();
    assert!(matches!(last.event, StreamEvent::Finish { ref finish_reason, .. } if finish_reason.as_deref() == Some("stop")));
    assert_eq!(last.reply, "echo: Hello there");

    // accumulated reply equals the concatenated deltas at every step
    let mut accumulated = String::new();
    for output in &outputs {
        accumulated.push_str(output.event.delta());
        assert_eq!(output.reply, accumulated);
    }
    assert_eq!(mock.last_request().unwrap()["stream"], true);
}

#[tokio::test]
async fn collected_stream_matches_completion() {
    let mock = MockProvider::start().await.unwrap();
    let model = HttpChatModel::from_config(&openai_endpoint(&mock)).unwrap();
    let messages = [Message::user("one two three")];

    let streamed = model
        .stream(&messages, &ChatParameters::default())
        .await
        .unwrap()
        .collect_output()
        .await
        .unwrap();

    assert_eq!(streamed.reply(), "echo: one two three");
    assert_eq!(streamed.finish_reason.as_deref(), Some("stop"));
}

#[tokio::test]
async fn minimax_line_stream_finishes_with_cost() {
    let mock = MockProvider::start().await.unwrap();
    let model = HttpChatModel::from_config(&minimax_endpoint(&mock)).unwrap();

    let output = model
        .stream(&[Message::user("流式 回复")], &ChatParameters::default())
        .await
        .unwrap()
        .collect_output()
        .await
        .unwrap();

    assert_eq!(output.reply(), "echo: 流式 回复");
    assert_eq!(output.usage.unwrap().total_tokens, 1000);
    assert!((output.cost.unwrap() - 0.015).abs() < 1e-9);
}

#[tokio::test]
async fn azure_stream_is_unsupported() {
    let mock = MockProvider::start().await.unwrap();
    let model = HttpChatModel::from_config(&azure_endpoint(&mock)).unwrap();

    let err = model
        .stream(&[Message::user("hi")], &ChatParameters::default())
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Unsupported { feature: "streaming", .. }));
    assert_eq!(mock.request_count(), 0);
}
