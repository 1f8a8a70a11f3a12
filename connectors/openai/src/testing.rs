//! Scripted transport replaying exact callback sequences

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use promptwire_core::errors::LlmError;

use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ResponseHandler};

/// One scripted exchange step
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Report this cumulative body, if the request binds progress
    Progress(String),
    /// Finish the exchange
    Complete(Result<HttpResponse, String>),
    /// Never finish; only cancellation ends the exchange
    Hang,
}

/// Sets a flag when dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<HttpRequest>>,
    hang_started: Arc<AtomicBool>,
    hang_dropped: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Self::default()
        }
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn hang_started(&self) -> bool {
        self.hang_started.load(Ordering::SeqCst)
    }

    pub(crate) fn hang_dropped(&self) -> bool {
        self.hang_dropped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest, handler: Arc<dyn ResponseHandler>) {
        let stream_progress = request.stream_progress;
        self.requests.lock().unwrap().push(request);
        handler.on_sent();

        loop {
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Progress(content)) => {
                    if stream_progress {
                        handler.on_progress(&content, content.len() as u64);
                    }
                }
                Some(Step::Complete(outcome)) => {
                    handler.on_complete(outcome.map_err(LlmError::NetworkError));
                    return;
                }
                Some(Step::Hang) => {
                    let _guard = DropFlag(self.hang_dropped.clone());
                    self.hang_started.store(true, Ordering::SeqCst);
                    std::future::pending::<()>().await;
                }
                None => {
                    handler.on_complete(Err(LlmError::NetworkError("script exhausted".to_string())));
                    return;
                }
            }
        }
    }
}
