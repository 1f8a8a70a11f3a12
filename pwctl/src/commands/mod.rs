//! Command implementations

pub mod chat;
pub mod history;
pub mod image;
pub mod models;

use promptwire_connector_openai::{MainQueue, RequestTask, TaskEvent, TaskHandle};
use promptwire_core::errors::{CoreError, CoreResult, LlmError};
use std::time::Duration;
use tracing::{debug, warn};

/// How often the main context is pumped
const PUMP_INTERVAL: Duration = Duration::from_millis(16);

/// Activate `task` and pump `queue` until a terminal event arrives.
///
/// `on_event` sees every event, terminal one included. Ctrl-C cancels the
/// task.
pub async fn drive<T: RequestTask>(
    task: &TaskHandle<T>,
    queue: &MainQueue,
    mut on_event: impl FnMut(&TaskEvent<T::Response>),
) -> CoreResult<TaskEvent<T::Response>> {
    let mut events = task.events();
    task.activate()?;
    debug!("Activated {} task {}", task.kind(), task.id());

    let mut tick = tokio::time::interval(PUMP_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                queue.pump();
                while let Ok(event) = events.try_recv() {
                    on_event(&event);
                    if event.is_terminal() {
                        return Ok(event);
                    }
                }
                if task.is_ready_to_destroy() && queue.is_empty() {
                    return Err(CoreError::Internal("Task ended without a result".to_string()));
                }
            }
            _ = &mut ctrl_c => {
                warn!("Interrupted, cancelling request");
                task.cancel();
                return Err(CoreError::Llm(LlmError::InternalError("Request cancelled".to_string())));
            }
        }
    }
}
