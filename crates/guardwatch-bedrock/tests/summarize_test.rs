use async_trait::async_trait;
use guardwatch_bedrock::{
    BedrockError, ChatRequest, ModelInvoker, ModelSettings, PromptComposer, Summarizer,
    SYSTEM_PROMPT,
};
use guardwatch_core::{decode_alarm, CloudWatchAlarmPayload, ModelInvocationLog};
use std::sync::Mutex;

// records every request body and answers with a canned reply
struct CannedInvoker {
    reply: Result<Vec<u8>, String>,
    requests: Mutex<Vec<(String, Vec<u8>)>>,
}

impl CannedInvoker {
    fn replying(body: &[u8]) -> Self {
        Self {
            reply: Ok(body.to_vec()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ModelInvoker for CannedInvoker {
    async fn invoke(&self, model_id: &str, body: Vec<u8>) -> Result<Vec<u8>, BedrockError> {
        self.requests.lock().unwrap().push((model_id.to_string(), body));
        self.reply.clone().map_err(BedrockError::Invocation)
    }

    fn provider(&self) -> &str {
        "canned"
    }
}

fn alarm() -> CloudWatchAlarmPayload {
    decode_alarm(include_str!("fixtures/alarm.json")).unwrap()
}

fn blocked_record() -> ModelInvocationLog {
    ModelInvocationLog::from_json(
        r#"{
            "modelId": "anthropic.claude-3-haiku-20240307-v1:0",
            "region": "us-west-2",
            "input": {"inputBodyJson": {"messages": [{"role": "user", "content": [{"text": "You are a worthless idiot."}]}]}},
            "output": {"outputBodyJson": {"stopReason": "guardrail_intervened"}}
        }"#,
    )
    .unwrap()
}

#[tokio::test]
async fn test_summarize_returns_first_text() {
    let reply = std::fs::read("tests/fixtures/nova_response.json").expect("fixture not found");
    let invoker = CannedInvoker::replying(&reply);
    let composer = PromptComposer::new().unwrap();
    let settings = ModelSettings::default();

    let summarizer = Summarizer::new(&composer, &invoker, &settings);
    let summary = summarizer.summarize(&alarm(), &[blocked_record()]).await.unwrap();

    assert_eq!(summary, "summary text");
}

#[tokio::test]
async fn test_request_carries_system_and_single_user_turn() {
    let invoker = CannedInvoker::replying(
        br#"{"output": {"message": {"role": "assistant", "content": [{"text": "ok"}]}}}"#,
    );
    let composer = PromptComposer::new().unwrap();
    let settings = ModelSettings {
        max_tokens: Some(1024),
        ..Default::default()
    };

    Summarizer::new(&composer, &invoker, &settings)
        .summarize(&alarm(), &[blocked_record()])
        .await
        .unwrap();

    let requests = invoker.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (model_id, body) = &requests[0];
    assert_eq!(model_id, "us.amazon.nova-pro-v1:0");

    let request: ChatRequest = serde_json::from_slice(body).unwrap();
    assert_eq!(request.system.len(), 1);
    assert_eq!(request.messages.len(), 1);
    assert_eq!(
        serde_json::to_value(&request.system[0]).unwrap()["text"],
        SYSTEM_PROMPT
    );

    let prompt = serde_json::to_value(&request.messages[0]).unwrap();
    let prompt = prompt["content"][0]["text"].as_str().unwrap().to_string();
    assert!(prompt.contains("GuardrailIntervenedAlarm"));
    assert!(prompt.contains("You are a worthless idiot."));
    assert_eq!(prompt.matches("<event>").count(), 1);
    assert_eq!(request.inference_config.unwrap().max_tokens, Some(1024));
}

#[tokio::test]
async fn test_upstream_failure_is_propagated() {
    let invoker = CannedInvoker::failing("ThrottlingException: Too many requests");
    let composer = PromptComposer::new().unwrap();
    let settings = ModelSettings::default();

    let result = Summarizer::new(&composer, &invoker, &settings)
        .summarize(&alarm(), &[])
        .await;

    match result {
        Err(BedrockError::Invocation(message)) => assert!(message.contains("ThrottlingException")),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(invoker.requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_reply_is_an_error() {
    let invoker = CannedInvoker::replying(br#"{"output": {"message": {"role": "assistant", "content": []}}}"#);
    let composer = PromptComposer::new().unwrap();
    let settings = ModelSettings::default();

    let result = Summarizer::new(&composer, &invoker, &settings)
        .summarize(&alarm(), &[])
        .await;

    assert!(matches!(result, Err(BedrockError::EmptyResponse)));
}
