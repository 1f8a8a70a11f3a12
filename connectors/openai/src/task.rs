//! Task lifecycle controller
//!
//! A task is created inert, dispatches its request on the background runtime
//! once activated, and ends through [`TaskCore::mark_ready_to_destroy`] no
//! matter which path finished it: success, failure, cancellation or host
//! teardown.
//!
//! The in-flight request keeps its task alive until the exchange ends, so a
//! caller may drop every handle after activation. Transport callbacks only
//! hold a weak reference to the task, never block on its state lock, and
//! post every observable event to the main context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use promptwire_core::errors::{ActivationError, LlmError, LlmResult};
use promptwire_core::options::CommonOptions;

use crate::events::{Listeners, TaskEvent};
use crate::host::{HostContext, WeakHost};
use crate::main_context::MainContext;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ResponseHandler};

/// Delay between attempts to apply a completion that found the task busy
const COMPLETION_RETRY: Duration = Duration::from_millis(5);

/// Mutable per-task state, guarded by the task mutex
#[derive(Debug, Default)]
pub struct TaskState<R> {
    /// Accumulated response
    pub response: R,
}

/// Collaborators a task needs to run
#[derive(Clone)]
pub(crate) struct TaskContext {
    pub transport: Arc<dyn HttpTransport>,
    pub main: Arc<dyn MainContext>,
    pub runtime: Handle,
    pub host: Option<HostContext>,
    pub internal_logs: bool,
}

/// State and lifecycle flags shared by every task kind
pub struct TaskCore<R> {
    id: Uuid,
    kind: &'static str,
    common: CommonOptions,
    internal_logs: bool,
    transport: Arc<dyn HttpTransport>,
    main: Arc<dyn MainContext>,
    runtime: Handle,
    host: Option<WeakHost>,
    listeners: Arc<Listeners<TaskEvent<R>>>,
    activated: AtomicBool,
    active: AtomicBool,
    ready_to_destroy: AtomicBool,
    ending_host: AtomicBool,
    initialized: AtomicBool,
    state: Mutex<TaskState<R>>,
    // Only ever held to store or take the handle
    in_flight: Mutex<Option<AbortHandle>>,
    finished: watch::Sender<bool>,
}

impl<R> TaskCore<R>
where
    R: Clone + Default + Send + 'static,
{
    pub(crate) fn new(kind: &'static str, common: CommonOptions, context: &TaskContext) -> Self {
        let (finished, _) = watch::channel(false);
        let id = Uuid::new_v4();
        debug!(task = %id, kind, "Created task");

        Self {
            id,
            kind,
            common,
            internal_logs: context.internal_logs,
            transport: context.transport.clone(),
            main: context.main.clone(),
            runtime: context.runtime.clone(),
            host: context.host.as_ref().map(HostContext::downgrade),
            listeners: Arc::new(Listeners::new()),
            activated: AtomicBool::new(false),
            active: AtomicBool::new(false),
            ready_to_destroy: AtomicBool::new(false),
            ending_host: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            state: Mutex::new(TaskState::default()),
            in_flight: Mutex::new(None),
            finished,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn common(&self) -> &CommonOptions {
        &self.common
    }

    pub fn internal_logs(&self) -> bool {
        self.internal_logs
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn is_ready_to_destroy(&self) -> bool {
        self.ready_to_destroy.load(Ordering::SeqCst)
    }

    /// Not yet ready to destroy and not being torn down by its host
    pub fn is_still_valid(&self) -> bool {
        !self.is_ready_to_destroy() && !self.ending_host.load(Ordering::SeqCst)
    }

    /// Record a progress event, returning true for the first one
    pub fn begin_progress(&self) -> bool {
        !self.initialized.swap(true, Ordering::SeqCst)
    }

    /// Abort the in-flight exchange and end the task. No-op unless active.
    pub fn cancel(&self) {
        if !self.is_active() {
            debug!(task = %self.id, kind = self.kind, "Cancel ignored, task is not active");
            return;
        }

        info!(task = %self.id, kind = self.kind, "Cancelling task");
        self.mark_ready_to_destroy();
    }

    /// Terminal transition. Only the first call has any effect.
    ///
    /// Never waits on the state lock, so transport callbacks may call it.
    pub fn mark_ready_to_destroy(&self) {
        if self.ready_to_destroy.swap(true, Ordering::SeqCst) {
            trace!(task = %self.id, "Already ready to destroy");
            return;
        }

        self.active.store(false, Ordering::SeqCst);
        self.initialized.store(false, Ordering::SeqCst);
        self.abort_in_flight();

        if let Some(host) = &self.host {
            host.release(self.id);
        }

        self.finished.send_replace(true);
        info!(task = %self.id, kind = self.kind, "Task ready to destroy");
    }

    pub(crate) fn begin_host_teardown(&self) {
        self.ending_host.store(true, Ordering::SeqCst);
        self.cancel();
        self.mark_ready_to_destroy();
    }

    fn abort_in_flight(&self) {
        let handle = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    fn store_in_flight(&self, handle: AbortHandle) {
        *self.in_flight.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        // Ended while the handle was being stored
        if self.is_ready_to_destroy() {
            self.abort_in_flight();
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, TaskState<R>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_lock_state(&self) -> Option<MutexGuard<'_, TaskState<R>>> {
        match self.state.try_lock() {
            Ok(state) => Some(state),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Queue `event` for delivery on the main context
    fn post(&self, event: TaskEvent<R>) {
        debug!(task = %self.id, kind = self.kind, event = event.name(), "Posting event");
        let listeners = self.listeners.clone();
        self.main.post(Box::new(move || listeners.emit(&event)));
    }

    fn check_common(&self) -> Result<(), ActivationError> {
        if self.common.api_key.trim().is_empty() {
            return Err(ActivationError::MissingApiKey);
        }
        if self.common.normalized_endpoint().is_none() {
            return Err(ActivationError::MissingEndpoint);
        }
        Ok(())
    }
}

impl<R> Drop for TaskCore<R> {
    fn drop(&mut self) {
        let in_flight = self.in_flight.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = in_flight.take() {
            handle.abort();
        }
    }
}

/// A request kind: what it sends and how it decodes what comes back
pub trait RequestTask: Send + Sync + Sized + 'static {
    type Response: Clone + Default + Send + Sync + 'static;

    fn core(&self) -> &TaskCore<Self::Response>;

    /// Kind-specific activation checks, run before the credential checks
    fn check_preconditions(&self) -> Result<(), ActivationError>;

    /// Whether the progress callback is bound for this request
    fn binds_progress(&self) -> bool {
        false
    }

    fn endpoint_url(&self) -> Option<String>;

    fn request_body(&self) -> serde_json::Result<String>;

    /// Decode the cumulative body received so far
    fn on_progress(
        &self,
        _content: &str,
        _state: &mut TaskState<Self::Response>,
    ) -> Vec<TaskEvent<Self::Response>> {
        Vec::new()
    }

    /// Decode the final response into terminal events
    fn on_complete(
        &self,
        response: &HttpResponse,
        state: &mut TaskState<Self::Response>,
    ) -> Vec<TaskEvent<Self::Response>>;
}

fn activate<T: RequestTask>(task: &Arc<T>) -> Result<(), ActivationError> {
    let core = task.core();
    if core.activated.swap(true, Ordering::SeqCst) || !core.is_still_valid() {
        warn!(task = %core.id, kind = core.kind, "Activation rejected, task already used");
        return Err(ActivationError::AlreadyActivated);
    }

    core.active.store(true, Ordering::SeqCst);

    if let Err(reason) = task.check_preconditions().and_then(|_| core.check_common()) {
        warn!(task = %core.id, kind = core.kind, "Activation failed: {}", reason);
        core.listeners.emit(&TaskEvent::RequestFailed);
        core.mark_ready_to_destroy();
        return Err(reason);
    }

    info!(task = %core.id, kind = core.kind, "Activating task");

    let join = core.runtime.spawn(send_request(task.clone()));
    core.store_in_flight(join.abort_handle());
    Ok(())
}

fn build_request<T: RequestTask>(task: &T) -> LlmResult<HttpRequest> {
    let core = task.core();
    let url = task
        .endpoint_url()
        .ok_or_else(|| LlmError::ConfigError("endpoint is empty".to_string()))?;
    let body = task
        .request_body()
        .map_err(|e| LlmError::InternalError(format!("Failed to serialize request: {}", e)))?;

    if core.internal_logs {
        debug!(task = %core.id, "Request to {}: {}", url, body);
    }

    Ok(HttpRequest::json_post(url, &core.common.api_key, body).with_progress(task.binds_progress()))
}

/// Runs the exchange. Holding `task` keeps it alive until the exchange ends
/// or is aborted, even when every caller handle is gone.
async fn send_request<T: RequestTask>(task: Arc<T>) {
    let core = task.core();
    if !core.is_active() {
        return;
    }

    let request = match build_request(&*task) {
        Ok(request) => request,
        Err(e) => {
            error!(task = %core.id, kind = core.kind, "Failed to build request: {}", e);
            core.post(TaskEvent::RequestFailed);
            core.mark_ready_to_destroy();
            return;
        }
    };

    let transport = core.transport.clone();
    let handler: Arc<dyn ResponseHandler> = Arc::new(Callbacks {
        task: Arc::downgrade(&task),
    });

    transport.execute(request, handler).await;
}

/// Decode a completion and end the task.
///
/// Hands the outcome back when the state lock is busy.
fn try_complete<T: RequestTask>(
    task: &T,
    outcome: Result<HttpResponse, LlmError>,
) -> Result<(), Result<HttpResponse, LlmError>> {
    let core = task.core();
    let Some(mut state) = core.try_lock_state() else {
        return Err(outcome);
    };

    if !core.is_active() || !core.is_still_valid() {
        return Ok(());
    }

    let events = match outcome {
        Ok(response) => {
            if core.internal_logs {
                debug!(task = %core.id, status = response.status, "Response content: {}", response.body);
            }
            task.on_complete(&response, &mut state)
        }
        Err(e) => {
            warn!(task = %core.id, kind = core.kind, "Request failed: {}", e);
            vec![TaskEvent::RequestFailed]
        }
    };
    drop(state);

    for event in events {
        core.post(event);
    }
    core.mark_ready_to_destroy();
    Ok(())
}

/// Apply a deferred completion once the state lock is free
async fn retry_completion<T: RequestTask>(task: Arc<T>, mut outcome: Result<HttpResponse, LlmError>) {
    loop {
        tokio::time::sleep(COMPLETION_RETRY).await;
        if !task.core().is_still_valid() {
            trace!(task = %task.core().id, "Task ended before deferred completion");
            return;
        }
        match try_complete(&*task, outcome) {
            Ok(()) => return,
            Err(pending) => outcome = pending,
        }
    }
}

/// Transport callbacks bound to one task
struct Callbacks<T> {
    task: Weak<T>,
}

impl<T: RequestTask> ResponseHandler for Callbacks<T> {
    fn on_sent(&self) {
        let Some(task) = self.task.upgrade() else {
            return;
        };

        let core = task.core();
        if core.is_active() && core.is_still_valid() {
            core.post(TaskEvent::RequestSent);
        }
    }

    fn on_progress(&self, content: &str, bytes_received: u64) {
        let Some(task) = self.task.upgrade() else {
            return;
        };

        let core = task.core();
        let Some(mut state) = core.try_lock_state() else {
            trace!(task = %core.id, "Task busy, skipping progress");
            return;
        };

        if !core.is_active() || !core.is_still_valid() {
            return;
        }

        if core.internal_logs {
            debug!(task = %core.id, bytes_received, "Progress content: {}", content);
        }

        let events = task.on_progress(content, &mut state);
        drop(state);

        for event in events {
            core.post(event);
        }
    }

    fn on_complete(&self, outcome: Result<HttpResponse, LlmError>) {
        let Some(task) = self.task.upgrade() else {
            return;
        };

        let core = task.core();
        if let Err(outcome) = try_complete(&*task, outcome) {
            if core.is_active() && core.is_still_valid() {
                debug!(task = %core.id, kind = core.kind, "Task busy at completion, deferring");
                core.runtime.spawn(retry_completion(task.clone(), outcome));
            }
        }
    }
}

/// Caller-facing handle to a task
///
/// Handles are cheap to clone; all clones refer to the same task.
pub struct TaskHandle<T: RequestTask> {
    task: Arc<T>,
}

impl<T: RequestTask> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
        }
    }
}

impl<T: RequestTask> TaskHandle<T> {
    /// Wrap a freshly created task, registering it with the host if any
    pub(crate) fn create(task: T, host: Option<&HostContext>, teardown_hook: bool) -> Self {
        let task = Arc::new(task);
        if let Some(host) = host {
            host.register(task.clone(), teardown_hook);
        }
        Self { task }
    }

    pub fn id(&self) -> Uuid {
        self.core().id()
    }

    pub fn kind(&self) -> &'static str {
        self.core().kind()
    }

    /// Validate preconditions and dispatch the request.
    ///
    /// On a failed precondition `RequestFailed` is delivered to current
    /// listeners before this returns, and the task is ended.
    pub fn activate(&self) -> Result<(), ActivationError> {
        activate(&self.task)
    }

    pub fn cancel(&self) {
        self.core().cancel();
    }

    pub fn mark_ready_to_destroy(&self) {
        self.core().mark_ready_to_destroy();
    }

    pub fn is_active(&self) -> bool {
        self.core().is_active()
    }

    pub fn is_ready_to_destroy(&self) -> bool {
        self.core().is_ready_to_destroy()
    }

    pub fn is_still_valid(&self) -> bool {
        self.core().is_still_valid()
    }

    pub fn common_options(&self) -> &CommonOptions {
        self.core().common()
    }

    /// Snapshot of the response accumulated so far
    pub fn response(&self) -> T::Response {
        self.core().lock_state().response.clone()
    }

    /// Register a listener. Listeners run on the main context.
    pub fn subscribe(&self, listener: impl Fn(&TaskEvent<T::Response>) + Send + Sync + 'static) {
        self.core().listeners.add(listener);
    }

    /// Channel receiving every event from now on
    pub fn events(&self) -> mpsc::UnboundedReceiver<TaskEvent<T::Response>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(move |event| {
            let _ = tx.send(event.clone());
        });
        rx
    }

    /// Resolves once the task is ready to destroy
    pub async fn finished(&self) {
        let mut finished = self.core().finished.subscribe();
        let _ = finished.wait_for(|done| *done).await;
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    fn core(&self) -> &TaskCore<T::Response> {
        self.task.core()
    }
}

impl<T: RequestTask> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("active", &self.is_active())
            .field("ready_to_destroy", &self.is_ready_to_destroy())
            .finish()
    }
}
