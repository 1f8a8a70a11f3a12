//! Chat completion task

use tracing::warn;

use promptwire_core::decoder::{decode_chat_fragment, decode_chat_stream};
use promptwire_core::prelude::*;

use crate::events::TaskEvent;
use crate::models::CompletionRequest;
use crate::task::{RequestTask, TaskContext, TaskCore, TaskHandle, TaskState};
use crate::transport::HttpResponse;

pub type ChatEvent = TaskEvent<ChatResponse>;

/// Handle to a chat completion task
pub type ChatRequest = TaskHandle<ChatTask>;

/// Sends a message list to a completion model
pub struct ChatTask {
    core: TaskCore<ChatResponse>,
    messages: Vec<Message>,
    options: ChatOptions,
}

impl ChatTask {
    pub(crate) fn new(
        messages: Vec<Message>,
        common: CommonOptions,
        options: ChatOptions,
        context: &TaskContext,
    ) -> Self {
        Self {
            core: TaskCore::new("chat", common, context),
            messages,
            options,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }
}

impl RequestTask for ChatTask {
    type Response = ChatResponse;

    fn core(&self) -> &TaskCore<ChatResponse> {
        &self.core
    }

    fn check_preconditions(&self) -> Result<(), ActivationError> {
        if self.messages.is_empty() {
            return Err(ActivationError::EmptyMessages);
        }
        Ok(())
    }

    fn binds_progress(&self) -> bool {
        self.options.stream
    }

    fn endpoint_url(&self) -> Option<String> {
        self.core.common().chat_url(self.options.model)
    }

    fn request_body(&self) -> serde_json::Result<String> {
        serde_json::to_string(&CompletionRequest::new(
            &self.messages,
            &self.options,
            self.core.common(),
        ))
    }

    fn on_progress(&self, content: &str, state: &mut TaskState<ChatResponse>) -> Vec<ChatEvent> {
        if content.is_empty() {
            return Vec::new();
        }

        let decoded = decode_chat_stream(content, &mut state.response);
        if decoded == 0 || !state.response.success {
            return Vec::new();
        }

        let snapshot = state.response.clone();
        if self.core.begin_progress() {
            vec![TaskEvent::ProgressStarted(snapshot)]
        } else {
            vec![TaskEvent::ProgressUpdated(snapshot)]
        }
    }

    fn on_complete(&self, response: &HttpResponse, state: &mut TaskState<ChatResponse>) -> Vec<ChatEvent> {
        if response.body.trim().is_empty() {
            warn!(task = %self.core.id(), status = response.status, "Empty response body");
            return vec![TaskEvent::RequestFailed];
        }

        let decoded = if self.options.stream {
            decode_chat_stream(&response.body, &mut state.response) > 0
        } else {
            decode_chat_fragment(&response.body, &mut state.response)
        };

        let snapshot = state.response.clone();
        if snapshot.error.is_some() {
            return vec![TaskEvent::ErrorReceived(snapshot)];
        }

        if !decoded || !snapshot.success || !response.is_success() {
            warn!(
                task = %self.core.id(),
                status = response.status,
                "Response could not be decoded into a completion"
            );
            return vec![TaskEvent::RequestFailed];
        }

        if self.options.stream {
            vec![TaskEvent::ProcessCompleted(snapshot)]
        } else {
            vec![TaskEvent::ProgressStarted(snapshot.clone()), TaskEvent::ProcessCompleted(snapshot)]
        }
    }
}

impl ChatRequest {
    pub fn messages(&self) -> &[Message] {
        self.task().messages()
    }

    pub fn chat_options(&self) -> &ChatOptions {
        self.task().options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::main_context::MainQueue;
    use crate::testing::{ScriptedTransport, Step};
    use std::sync::Arc;
    use tokio::runtime::Handle;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Fixture {
        transport: Arc<ScriptedTransport>,
        queue: Arc<MainQueue>,
    }

    impl Fixture {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                transport: Arc::new(ScriptedTransport::new(steps)),
                queue: Arc::new(MainQueue::new()),
            }
        }

        fn chat(&self, messages: Vec<Message>, options: ChatOptions) -> ChatRequest {
            let context = TaskContext {
                transport: self.transport.clone(),
                main: self.queue.clone(),
                runtime: Handle::current(),
                host: None,
                internal_logs: false,
            };
            let common = CommonOptions::default().with_api_key("sk-test");
            TaskHandle::create(ChatTask::new(messages, common, options, &context), None, true)
        }

        async fn run(&self, task: &ChatRequest) -> Vec<ChatEvent> {
            let mut events = task.events();
            task.activate().unwrap();
            task.finished().await;
            self.drain(&mut events)
        }

        fn drain(&self, events: &mut UnboundedReceiver<ChatEvent>) -> Vec<ChatEvent> {
            self.queue.pump();
            let mut received = Vec::new();
            while let Ok(event) = events.try_recv() {
                received.push(event);
            }
            received
        }
    }

    fn names(events: &[ChatEvent]) -> Vec<&'static str> {
        events.iter().map(TaskEvent::name).collect()
    }

    #[tokio::test]
    async fn test_non_streaming_completion() {
        let body = r#"{"id":"x","object":"chat.completion","created":1,"choices":[{"index":0,"message":{"role":"assistant","content":"Hi"},"finish_reason":"stop"}],"usage":{"prompt_tokens":5,"completion_tokens":1,"total_tokens":6}}"#;
        let fixture = Fixture::new(vec![Step::Complete(Ok(HttpResponse::new(200, body)))]);
        let task = fixture.chat(
            vec![Message::user("Hello")],
            ChatOptions::default().with_stream(false).with_choices(1),
        );

        let events = fixture.run(&task).await;
        assert_eq!(names(&events), vec!["RequestSent", "ProgressStarted", "ProcessCompleted"]);
        assert_eq!(events.iter().filter(|e| e.name() == "ProcessCompleted").count(), 1);

        let response = events.last().and_then(TaskEvent::response).unwrap();
        assert!(response.success);
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.content, "Hi");
        assert_eq!(response.choices[0].message.role, Role::Assistant);
        assert_eq!(response.choices[0].finish_reason.as_deref(), Some("stop"));
        assert_eq!(response.usage, Usage::new(5, 1, 6));
        assert_eq!(response.id, "x");

        let request = &fixture.transport.requests()[0];
        assert_eq!(request.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(request.header("Authorization"), Some("Bearer sk-test"));
        assert!(!request.stream_progress);
    }

    #[tokio::test]
    async fn test_streaming_completion() {
        let role = "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n";
        let hel = "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"}}]}\n\n";
        let lo = "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"}}]}\n\n";
        let first = role.to_string();
        let second = format!("{}{}", role, hel);
        let third = format!("{}{}{}", role, hel, lo);
        let complete = format!("{}data: [DONE]\n\n", third);

        let fixture = Fixture::new(vec![
            Step::Progress(first),
            Step::Progress(second),
            Step::Progress(third),
            Step::Complete(Ok(HttpResponse::new(200, complete))),
        ]);
        let task = fixture.chat(vec![Message::user("Hello")], ChatOptions::default());

        let events = fixture.run(&task).await;
        assert_eq!(
            names(&events),
            vec![
                "RequestSent",
                "ProgressStarted",
                "ProgressUpdated",
                "ProgressUpdated",
                "ProcessCompleted"
            ]
        );

        let response = events.last().and_then(TaskEvent::response).unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.content, "Hello");
        assert_eq!(task.response().first_content(), Some("Hello"));
        assert!(fixture.transport.requests()[0].stream_progress);
    }

    #[tokio::test]
    async fn test_api_error() {
        let body = r#"{"error":{"code":"invalid_api_key","type":"invalid_request_error","message":"bad key"}}"#;
        let fixture = Fixture::new(vec![Step::Complete(Ok(HttpResponse::new(401, body)))]);
        let task = fixture.chat(vec![Message::user("Hello")], ChatOptions::default().with_stream(false));

        let events = fixture.run(&task).await;
        assert_eq!(names(&events), vec!["RequestSent", "ErrorReceived"]);

        let response = events[1].response().unwrap();
        assert!(!response.success);
        let error = response.error.as_ref().unwrap();
        assert_eq!(error.code, "invalid_api_key");
        assert_eq!(error.r#type, "invalid_request_error");
        assert_eq!(error.message, "bad key");
    }

    #[tokio::test]
    async fn test_streamed_api_error() {
        let body = r#"{"error":{"code":null,"type":"server_error","message":"overloaded"}}"#;
        let fixture = Fixture::new(vec![
            Step::Progress(body.to_string()),
            Step::Complete(Ok(HttpResponse::new(503, body))),
        ]);
        let task = fixture.chat(vec![Message::user("Hello")], ChatOptions::default());

        let events = fixture.run(&task).await;
        assert_eq!(names(&events), vec!["RequestSent", "ErrorReceived"]);
    }

    #[tokio::test]
    async fn test_empty_messages_fail_without_network() {
        let fixture = Fixture::new(vec![]);
        let task = fixture.chat(Vec::new(), ChatOptions::default());
        let mut events = task.events();

        let failed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = failed.clone();
        task.subscribe(move |event| {
            if *event == TaskEvent::RequestFailed {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        });

        assert_eq!(task.activate(), Err(ActivationError::EmptyMessages));
        assert_eq!(failed.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(task.is_ready_to_destroy());
        assert!(fixture.transport.requests().is_empty());

        // Delivered synchronously; nothing further arrives through the main context
        assert_eq!(names(&fixture.drain(&mut events)), vec!["RequestFailed"]);
        assert_eq!(fixture.queue.pump(), 0);
    }

    #[tokio::test]
    async fn test_empty_body_is_request_failed() {
        let fixture = Fixture::new(vec![Step::Complete(Ok(HttpResponse::new(200, "")))]);
        let task = fixture.chat(vec![Message::user("Hi")], ChatOptions::default().with_stream(false));
        assert_eq!(names(&fixture.run(&task).await), vec!["RequestSent", "RequestFailed"]);
    }

    #[tokio::test]
    async fn test_error_status_without_error_object() {
        let fixture = Fixture::new(vec![Step::Complete(Ok(HttpResponse::new(502, "<html>Bad gateway</html>")))]);
        let task = fixture.chat(vec![Message::user("Hi")], ChatOptions::default().with_stream(false));
        assert_eq!(names(&fixture.run(&task).await), vec!["RequestSent", "RequestFailed"]);
    }

    #[tokio::test]
    async fn test_legacy_model_uses_completions_route() {
        let body = r#"{"choices":[{"index":0,"text":"\n\nfour","finish_reason":"stop"}]}"#;
        let fixture = Fixture::new(vec![Step::Complete(Ok(HttpResponse::new(200, body)))]);
        let task = fixture.chat(
            vec![Message::user("2+2=")],
            ChatOptions::default()
                .with_model(ChatModel::TextDavinci003)
                .with_stream(false),
        );

        let events = fixture.run(&task).await;
        assert_eq!(names(&events), vec!["RequestSent", "ProgressStarted", "ProcessCompleted"]);
        assert_eq!(task.response().first_content(), Some("four"));

        let request = &fixture.transport.requests()[0];
        assert_eq!(request.url, "https://api.openai.com/v1/completions");
        let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(body["prompt"], "2+2=");
    }

    #[tokio::test]
    async fn test_accessors() {
        let fixture = Fixture::new(vec![]);
        let options = ChatOptions::default().with_model(ChatModel::Gpt4);
        let task = fixture.chat(vec![Message::system("sys"), Message::user("Hi")], options.clone());

        assert_eq!(task.messages().len(), 2);
        assert_eq!(task.chat_options(), &options);
        assert_eq!(task.common_options().api_key, "sk-test");
        assert_eq!(task.kind(), "chat");
        assert!(!task.is_active());
        assert!(task.is_still_valid());
    }
}
