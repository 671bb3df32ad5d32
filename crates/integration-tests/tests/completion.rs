mod harness;

use harness::config::{azure_endpoint, minimax_endpoint, openai_endpoint};
use harness::mock_provider::MockProvider;
use lmkit_llm::types::HTTP_RESPONSE_KEY;
use lmkit_llm::{ChatModel, ChatParameters, HttpChatModel, LlmError, Message};

#[tokio::test]
async fn openai_completion_returns_reply_and_usage() {
    let mock = MockProvider::start().await.unwrap();
    let model = HttpChatModel::from_config(&openai_endpoint(&mock)).unwrap();

    let output = model.completion("Hello", &ChatParameters::default()).await.unwrap();

    assert_eq!(output.model_id, "openai/mock-model-1");
    assert_eq!(output.reply(), "echo: Hello");
    assert_eq!(output.finish_reason.as_deref(), Some("stop"));
    assert_eq!(output.usage.unwrap().total_tokens, 15);
    assert!(!output.is_cache);
    assert!(output.extra.contains_key(HTTP_RESPONSE_KEY));
}

#[tokio::test]
async fn openai_request_carries_merged_parameters() {
    let mock = MockProvider::start().await.unwrap();
    let mut config = openai_endpoint(&mock);
    config.system_prompt = Some("be brief".to_owned());
    config
        .parameters
        .insert("temperature".to_owned(), serde_json::json!(0.3));
    let model = HttpChatModel::from_config(&config).unwrap();

    model
        .complete(&[Message::user("hi")], &ChatParameters::default().with_max_tokens(64))
        .await
        .unwrap();

    let body = mock.last_request().unwrap();
    assert_eq!(body["model"], "mock-model-1");
    assert_eq!(body["temperature"], 0.3);
    assert_eq!(body["max_tokens"], 64);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "be brief");
    assert_eq!(body["messages"][1]["content"], "hi");
}

#[tokio::test]
async fn azure_completion_uses_deployment_url() {
    let mock = MockProvider::start().await.unwrap();
    let model = HttpChatModel::from_config(&azure_endpoint(&mock)).unwrap();

    let output = model.completion("Hello", &ChatParameters::default()).await.unwrap();

    assert_eq!(output.model_id, "azure/mock-deployment");
    assert_eq!(output.reply(), "echo: Hello");
}

#[tokio::test]
async fn minimax_completion_reports_cost() {
    let mock = MockProvider::start().await.unwrap();
    let model = HttpChatModel::from_config(&minimax_endpoint(&mock)).unwrap();

    let output = model.completion("你好", &ChatParameters::default()).await.unwrap();

    assert_eq!(output.model_id, "minimax_pro/abab5.5-chat");
    assert_eq!(output.reply(), "echo: 你好");
    assert!((output.cost.unwrap() - 0.03).abs() < 1e-9);

    let body = mock.last_request().unwrap();
    assert_eq!(body["messages"][0]["sender_type"], "USER");
    assert_eq!(body["bot_setting"][0]["bot_name"], body["reply_constraints"]["sender_name"]);
}

#[tokio::test]
async fn minimax_zero_temperature_is_raised_to_floor() {
    let mock = MockProvider::start().await.unwrap();
    let model = HttpChatModel::from_config(&minimax_endpoint(&mock)).unwrap();

    model
        .completion("hi", &ChatParameters::default().with_temperature(0.0))
        .await
        .unwrap();

    assert_eq!(mock.last_request().unwrap()["temperature"], 0.01);
}

#[tokio::test]
async fn minimax_bad_status_is_unexpected_response() {
    let mock = MockProvider::start().await.unwrap();
    let mut config = minimax_endpoint(&mock);
    config.group_id = Some("wrong-group".to_owned());
    let model = HttpChatModel::from_config(&config).unwrap();

    let err = model.completion("hi", &ChatParameters::default()).await.unwrap_err();
    assert!(matches!(err, LlmError::UnexpectedResponse { ref body, .. } if body.contains("invalid group id")));
}

#[tokio::test]
async fn rejected_request_is_upstream_error() {
    let mock = MockProvider::start().await.unwrap();
    let model = HttpChatModel::from_config(&openai_endpoint(&mock)).unwrap();

    let err = model.completion("please explode", &ChatParameters::default()).await.unwrap_err();
    assert!(matches!(err, LlmError::Upstream { status, .. } if status.as_u16() == 400));
}

#[tokio::test]
async fn system_message_is_rejected_before_minimax_request() {
    let mock = MockProvider::start().await.unwrap();
    let model = HttpChatModel::from_config(&minimax_endpoint(&mock)).unwrap();

    let err = model
        .complete(&[Message::system("rules"), Message::user("hi")], &ChatParameters::default())
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::Message(_)));
    assert_eq!(mock.request_count(), 0);
}
