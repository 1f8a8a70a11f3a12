//! Observable task events and listener registration

use std::sync::{Arc, Mutex, PoisonError};

/// Signals emitted by a task over its lifetime
///
/// `R` is the response type of the task kind. Events after the request was
/// sent carry a snapshot of the response as it stood when the event fired.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent<R> {
    /// The request was handed to the transport
    RequestSent,
    /// Generic failure: precondition, transport, status or undecodable body
    RequestFailed,
    /// First successful decode of streamed content
    ProgressStarted(R),
    /// Every later successful decode of streamed content
    ProgressUpdated(R),
    /// Terminal success
    ProcessCompleted(R),
    /// Terminal failure carrying the decoded API error
    ErrorReceived(R),
}

impl<R> TaskEvent<R> {
    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::RequestSent => "RequestSent",
            TaskEvent::RequestFailed => "RequestFailed",
            TaskEvent::ProgressStarted(_) => "ProgressStarted",
            TaskEvent::ProgressUpdated(_) => "ProgressUpdated",
            TaskEvent::ProcessCompleted(_) => "ProcessCompleted",
            TaskEvent::ErrorReceived(_) => "ErrorReceived",
        }
    }

    pub fn response(&self) -> Option<&R> {
        match self {
            TaskEvent::RequestSent | TaskEvent::RequestFailed => None,
            TaskEvent::ProgressStarted(response)
            | TaskEvent::ProgressUpdated(response)
            | TaskEvent::ProcessCompleted(response)
            | TaskEvent::ErrorReceived(response) => Some(response),
        }
    }

    /// Whether no further events follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskEvent::RequestFailed | TaskEvent::ProcessCompleted(_) | TaskEvent::ErrorReceived(_)
        )
    }
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Multicast listener list
pub struct Listeners<E> {
    listeners: Mutex<Vec<Listener<E>>>,
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, listener: impl Fn(&E) + Send + Sync + 'static) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Deliver `event` to every listener registered so far.
    ///
    /// Listeners may subscribe further listeners while being notified; those
    /// only see later events.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for listener in snapshot {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners").field("count", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_accessors() {
        let event: TaskEvent<u32> = TaskEvent::ProgressUpdated(7);
        assert_eq!(event.name(), "ProgressUpdated");
        assert_eq!(event.response(), Some(&7));
        assert!(!event.is_terminal());

        let failed: TaskEvent<u32> = TaskEvent::RequestFailed;
        assert!(failed.response().is_none());
        assert!(failed.is_terminal());
        assert!(TaskEvent::ErrorReceived(1).is_terminal());
    }

    #[test]
    fn test_emit_reaches_every_listener() {
        let listeners: Listeners<u32> = Listeners::new();
        let total = Arc::new(Mutex::new(0));

        for _ in 0..2 {
            let total = total.clone();
            listeners.add(move |value| *total.lock().unwrap() += *value);
        }

        listeners.emit(&5);
        assert_eq!(*total.lock().unwrap(), 10);
        assert_eq!(listeners.len(), 2);
    }

    #[test]
    fn test_subscribe_during_emit() {
        let listeners: Arc<Listeners<u32>> = Arc::new(Listeners::new());
        let inner = listeners.clone();
        listeners.add(move |_| inner.add(|_| {}));

        listeners.emit(&1);
        assert_eq!(listeners.len(), 2);
    }
}
