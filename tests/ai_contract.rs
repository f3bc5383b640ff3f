//! Contract tests for the AI gateway surface: output parsing and the
//! trait seam the router depends on.

use async_trait::async_trait;
use OrderBuddy::services::ai::{parse_ai_output, AiGateway, AiRequest, AiResponse};
use OrderBuddy::utils::errors::{AiError, OrderBuddyError};

struct ScriptedGateway {
    stdout: String,
}

#[async_trait]
impl AiGateway for ScriptedGateway {
    async fn invoke(&self, _request: AiRequest) -> Result<AiResponse, OrderBuddyError> {
        Ok(parse_ai_output(&self.stdout))
    }
}

struct TimeoutGateway;

#[async_trait]
impl AiGateway for TimeoutGateway {
    async fn invoke(&self, _request: AiRequest) -> Result<AiResponse, OrderBuddyError> {
        Err(AiError::Timeout { seconds: 120 }.into())
    }
}

fn request(message: &str) -> AiRequest {
    AiRequest {
        system_prompt: "assistant".to_string(),
        context: String::new(),
        history: Vec::new(),
        speaker_name: "Ana".to_string(),
        message: message.to_string(),
    }
}

#[tokio::test]
async fn scripted_reply_with_actions_round_trips() {
    let gateway = ScriptedGateway {
        stdout: r#"Sure thing!
```json
{"message": "Added 2 fried rice for Ana.", "actions": [{"type": "create_order", "items": [{"name": "Fried Rice", "quantity": 2}]}]}
```"#
            .to_string(),
    };

    let response = gateway.invoke(request("two fried rice")).await.unwrap();
    assert_eq!(response.message, "Added 2 fried rice for Ana.");
    assert_eq!(response.actions.len(), 1);
    assert_eq!(response.actions[0].kind, "create_order");
    assert_eq!(response.actions[0].data["items"][0]["quantity"], 2);
}

#[tokio::test]
async fn empty_reply_means_stay_silent() {
    let gateway = ScriptedGateway {
        stdout: r#"{"message": "", "actions": []}"#.to_string(),
    };

    let response = gateway.invoke(request("unrelated chatter")).await.unwrap();
    assert!(response.is_empty());
}

#[tokio::test]
async fn timeout_surfaces_as_user_recoverable_ai_error() {
    let err = TimeoutGateway.invoke(request("hello")).await.unwrap_err();
    match err {
        OrderBuddyError::Ai(AiError::Timeout { seconds }) => assert_eq!(seconds, 120),
        other => panic!("expected timeout, got {other}"),
    }
    // The router replies with an apology for recoverable AI failures.
    let err: OrderBuddyError = AiError::Timeout { seconds: 120 }.into();
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn freeform_output_falls_back_to_plain_message() {
    let gateway = ScriptedGateway {
        stdout: "I could not find that item on the menu.".to_string(),
    };

    let response = gateway.invoke(request("order a unicorn")).await.unwrap();
    assert_eq!(response.message, "I could not find that item on the menu.");
    assert!(response.actions.is_empty());
}
