//! DAP client: request correlation, inbound dispatch and the command facade.
//!
//! A [`DapClient`] owns one [`DebugSession`]. Commands allocate a `seq`,
//! register a pending entry and hand the encoded request to the
//! [`Transport`]; the host feeds every inbound frame to
//! [`DapClient::handle_frame`] in arrival order, which completes the
//! matching command or dispatches the event. Session-wide happenings are
//! broadcast to [`DapClient::subscribe`]rs.
//!
//! The client is a cheap handle around shared state; clone it to issue
//! commands from several tasks at once.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{broadcast, oneshot, Mutex};

use crate::breakpoint::{BreakpointConfig, BreakpointSpec, BreakpointUpdate};
use crate::capabilities::DapCapabilities;
use crate::codec;
use crate::dispatcher::{EventDispatcher, FollowUp};
use crate::error::DapError;
use crate::events::SessionEvent;
use crate::pending::{PendingItem, PendingRequests};
use crate::protocol::{
    Capabilities, ContinueArguments, DisconnectArguments, EvaluateArguments,
    EvaluateResponseBody, Event, ExceptionInfoArguments, ExceptionInfoResponseBody,
    InitializeRequestArguments, Message, PauseArguments, Request, Response, Scope,
    ScopesArguments, ScopesResponseBody, SetBreakpointsArguments, SetBreakpointsResponseBody,
    SetVariableArguments, SetVariableResponseBody, Source, StackFrame, StackTraceArguments,
    StackTraceResponseBody, StepArguments, TerminateArguments, Thread, ThreadsResponseBody,
    Variable, VariablesArguments, VariablesResponseBody,
};
use crate::session::{ConsoleOutputEntry, DebugSession, ExceptionInfo, SessionState, Transition};
use crate::transport::Transport;

/// How long a command waits for its response.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Capacity of the session event channel. Slow subscribers lag rather
/// than block dispatch.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Client identity sent with `initialize`, and the request timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// `clientID`.
    pub client_id: String,
    /// `clientName`.
    pub client_name: String,
    /// `adapterID`.
    pub adapter_id: String,
    /// `locale`, if any.
    pub locale: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            client_id: "sling".into(),
            client_name: "Sling".into(),
            adapter_id: "debug".into(),
            locale: None,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

/// Outbound side: everything that must change together when a request is
/// put on the wire.
struct Wire {
    next_seq: i64,
    transport: Box<dyn Transport>,
    pending: PendingRequests,
    closed: bool,
}

struct Inbound {
    session: DebugSession,
    dispatcher: EventDispatcher,
}

struct Shared {
    options: ClientOptions,
    wire: Mutex<Wire>,
    inbound: Mutex<Inbound>,
    events: broadcast::Sender<SessionEvent>,
}

/// A Debug Adapter Protocol client bound to one transport.
#[derive(Clone)]
pub struct DapClient {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for DapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DapClient")
            .field("options", &self.shared.options)
            .finish_non_exhaustive()
    }
}

impl DapClient {
    /// Create a client with default options.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_options(transport, ClientOptions::default())
    }

    /// Create a client with the given options.
    pub fn with_options(transport: impl Transport + 'static, options: ClientOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                options,
                wire: Mutex::new(Wire {
                    next_seq: 1,
                    transport: Box::new(transport),
                    pending: PendingRequests::new(),
                    closed: false,
                }),
                inbound: Mutex::new(Inbound {
                    session: DebugSession::new(),
                    dispatcher: EventDispatcher::new(),
                }),
                events,
            }),
        }
    }

    /// The options this client was built with.
    pub fn options(&self) -> &ClientOptions {
        &self.shared.options
    }

    /// Receive every [`SessionEvent`] dispatched after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Correlation
    // -----------------------------------------------------------------------

    /// Send a request and wait for its response.
    ///
    /// Resolves with the response when the adapter reports success, and
    /// fails with [`DapError::RequestFailed`] when it does not. Fails with
    /// [`DapError::Timeout`] if nothing arrives within the request timeout,
    /// and with [`DapError::Transport`] if the channel is or becomes closed.
    pub async fn send_request(
        &self,
        command: &str,
        arguments: Option<serde_json::Value>,
    ) -> Result<Response, DapError> {
        let (tx, mut rx) = oneshot::channel();
        let item = PendingItem::Command {
            command: command.to_string(),
            responder: tx,
        };
        let seq = self.register(command, arguments, item).await?;

        tokio::select! {
            outcome = &mut rx => return complete(command, outcome),
            _ = tokio::time::sleep(self.shared.options.request_timeout) => {}
        }

        if self.shared.wire.lock().await.pending.take(seq).is_some() {
            tracing::warn!(command, seq, "request timed out");
            return Err(DapError::Timeout {
                command: command.to_string(),
                seq,
            });
        }
        // The entry was claimed by a response or by close while the timer
        // fired; its completion is already on the way.
        complete(command, rx.await)
    }

    /// Allocate a `seq`, track the request and put it on the wire.
    async fn register(
        &self,
        command: &str,
        arguments: Option<serde_json::Value>,
        item: PendingItem,
    ) -> Result<i64, DapError> {
        let mut wire = self.shared.wire.lock().await;
        if wire.closed {
            return Err(DapError::Transport("transport closed".into()));
        }
        let seq = wire.next_seq;
        let frame = codec::encode(&Request {
            seq,
            command: command.to_string(),
            arguments,
        })?;
        wire.next_seq += 1;
        wire.pending.insert(seq, item);
        if let Err(e) = wire.transport.send(frame) {
            wire.pending.take(seq);
            return Err(e);
        }
        tracing::trace!(seq, command, "request sent");
        Ok(seq)
    }

    /// Number of requests still waiting for a response.
    pub async fn pending_count(&self) -> usize {
        self.shared.wire.lock().await.pending.len()
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Process one inbound text frame.
    ///
    /// Malformed frames are logged and dropped; nothing here fails.
    pub async fn handle_frame(&self, text: &str) {
        match codec::decode(text) {
            Ok(Message::Response(response)) => self.on_response(response).await,
            Ok(Message::Event(event)) => self.on_event(event).await,
            Ok(Message::Request(request)) => {
                tracing::debug!(
                    seq = request.seq,
                    command = %request.command,
                    "ignoring reverse request"
                );
            }
            Err(e) => tracing::warn!(error = %e, "dropping malformed frame"),
        }
    }

    /// The channel reported an error. Closing is signalled separately via
    /// [`handle_close`](Self::handle_close).
    pub fn handle_error(&self, message: &str) {
        tracing::error!(error = message, "debug adapter transport error");
    }

    /// The channel closed: reject every outstanding command, move the
    /// session to `Disconnected` for good and tell observers.
    pub async fn handle_close(&self) {
        let drained = {
            let mut wire = self.shared.wire.lock().await;
            if wire.closed {
                return;
            }
            wire.closed = true;
            wire.pending.drain()
        };
        tracing::info!(outstanding = drained.len(), "debug adapter transport closed");
        for (seq, item) in drained {
            if let PendingItem::Command { command, responder } = item {
                tracing::debug!(seq, command = %command, "rejecting request on close");
                let _ = responder.send(Err(DapError::Transport("transport closed".into())));
            }
        }
        self.transition(Transition::TransportClosed).await;
        self.notify(SessionEvent::Disconnected);
    }

    /// Whether the transport has closed.
    pub async fn is_closed(&self) -> bool {
        self.shared.wire.lock().await.closed
    }

    async fn on_response(&self, response: Response) {
        let item = self.shared.wire.lock().await.pending.take(response.request_seq);
        match item {
            Some(PendingItem::Command { responder, .. }) => {
                if responder.send(Ok(response)).is_err() {
                    tracing::trace!("response arrived after the caller went away");
                }
            }
            Some(PendingItem::FollowUp(FollowUp::RefreshThreads)) => {
                self.refresh_threads(response).await;
            }
            None => tracing::debug!(
                request_seq = response.request_seq,
                command = %response.command,
                "response matches no pending request"
            ),
        }
    }

    async fn on_event(&self, event: Event) {
        let dispatch = {
            let mut inbound = self.shared.inbound.lock().await;
            let Inbound {
                session,
                dispatcher,
            } = &mut *inbound;
            dispatcher.dispatch(session, &event)
        };
        for notification in dispatch.notifications {
            self.notify(notification);
        }
        if let Some(follow_up) = dispatch.follow_up {
            let command = match follow_up {
                FollowUp::RefreshThreads => "threads",
            };
            let item = PendingItem::FollowUp(follow_up);
            if let Err(e) = self.register(command, None, item).await {
                tracing::warn!(error = %e, "could not issue {command} refresh");
            }
        }
    }

    async fn refresh_threads(&self, response: Response) {
        if !response.success {
            tracing::warn!(message = ?response.message, "threads refresh failed");
            return;
        }
        match parse_body::<ThreadsResponseBody>(&response) {
            Ok(body) => {
                self.shared.inbound.lock().await.session.set_threads(body.threads);
                self.notify(SessionEvent::ThreadsChanged);
            }
            Err(e) => tracing::warn!(error = %e, "threads refresh returned a bad body"),
        }
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.shared.events.send(event);
    }

    async fn transition(&self, transition: Transition) {
        let changed = self.shared.inbound.lock().await.session.apply(transition);
        if let Some(state) = changed {
            self.notify(SessionEvent::StateChanged(state));
        }
    }

    // -----------------------------------------------------------------------
    // Session reads
    // -----------------------------------------------------------------------

    /// A point-in-time copy of the session.
    pub async fn session(&self) -> DebugSession {
        self.shared.inbound.lock().await.session.clone()
    }

    /// Current session state.
    pub async fn state(&self) -> SessionState {
        self.shared.inbound.lock().await.session.state()
    }

    /// Console log so far.
    pub async fn console(&self) -> Vec<ConsoleOutputEntry> {
        self.shared.inbound.lock().await.session.console().to_vec()
    }

    /// Select the current thread.
    pub async fn select_thread(&self, thread_id: i64) {
        self.shared
            .inbound
            .lock()
            .await
            .session
            .select_thread(thread_id);
    }

    /// Select one of the frames from the last stack trace.
    pub async fn select_frame(&self, frame_id: i64) -> bool {
        self.shared.inbound.lock().await.session.select_frame(frame_id)
    }

    // -----------------------------------------------------------------------
    // Breakpoints (local only; push with `set_breakpoints_for_file`)
    // -----------------------------------------------------------------------

    /// Add a breakpoint.
    pub async fn add_breakpoint(&self, spec: BreakpointSpec) -> BreakpointConfig {
        self.shared.inbound.lock().await.session.breakpoints_mut().add(spec)
    }

    /// Remove a breakpoint.
    pub async fn remove_breakpoint(&self, id: &str) -> Option<BreakpointConfig> {
        self.shared.inbound.lock().await.session.breakpoints_mut().remove(id)
    }

    /// Change a breakpoint. Returns the updated record.
    pub async fn update_breakpoint(
        &self,
        id: &str,
        update: BreakpointUpdate,
    ) -> Option<BreakpointConfig> {
        let mut inbound = self.shared.inbound.lock().await;
        inbound.session.breakpoints_mut().update(id, update).cloned()
    }

    /// Flip a breakpoint's `enabled` flag. Returns the new value.
    pub async fn toggle_breakpoint(&self, id: &str) -> Option<bool> {
        let mut inbound = self.shared.inbound.lock().await;
        inbound.session.breakpoints_mut().toggle_enabled(id)
    }

    /// Breakpoints of one file.
    pub async fn breakpoints_for_file(&self, path: &Path) -> Vec<BreakpointConfig> {
        let inbound = self.shared.inbound.lock().await;
        inbound
            .session
            .breakpoints()
            .list_for_file(path)
            .into_iter()
            .cloned()
            .collect()
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Send `initialize` and record the adapter's capabilities.
    pub async fn initialize(&self) -> Result<DapCapabilities, DapError> {
        let options = &self.shared.options;
        let args = InitializeRequestArguments {
            client_id: Some(options.client_id.clone()),
            client_name: Some(options.client_name.clone()),
            adapter_id: options.adapter_id.clone(),
            locale: options.locale.clone(),
            lines_start_at1: Some(true),
            columns_start_at1: Some(true),
            path_format: Some("path".into()),
            supports_variable_type: Some(true),
            supports_variable_paging: Some(true),
            supports_run_in_terminal_request: Some(false),
        };
        self.transition(Transition::InitializeSent).await;
        let response = self.send_request("initialize", Some(to_args(&args)?)).await?;
        let caps: Capabilities = match response.body {
            Some(_) => parse_body(&response)?,
            None => Capabilities::default(),
        };
        let mut inbound = self.shared.inbound.lock().await;
        inbound.session.set_capabilities(&caps);
        Ok(inbound.session.capabilities().clone())
    }

    /// Send `launch` with adapter-specific arguments.
    pub async fn launch(&self, arguments: serde_json::Value) -> Result<(), DapError> {
        self.send_request("launch", Some(arguments)).await?;
        Ok(())
    }

    /// Send `attach` with adapter-specific arguments.
    pub async fn attach(&self, arguments: serde_json::Value) -> Result<(), DapError> {
        self.send_request("attach", Some(arguments)).await?;
        Ok(())
    }

    /// Send the enabled breakpoints of `path` and reconcile the adapter's
    /// answer into the manager. Returns the file's breakpoints afterwards.
    pub async fn set_breakpoints_for_file(
        &self,
        path: &Path,
    ) -> Result<Vec<BreakpointConfig>, DapError> {
        let (ids, breakpoints) = self
            .shared
            .inbound
            .lock()
            .await
            .session
            .breakpoints()
            .source_breakpoints_for_file(path);
        let args = SetBreakpointsArguments {
            source: Source {
                name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
                path: Some(path.to_string_lossy().into_owned()),
                source_reference: None,
            },
            breakpoints: Some(breakpoints),
        };
        let response = self
            .send_request("setBreakpoints", Some(to_args(&args)?))
            .await?;
        let body: SetBreakpointsResponseBody = parse_body(&response)?;

        let (updated, current) = {
            let mut inbound = self.shared.inbound.lock().await;
            let manager = inbound.session.breakpoints_mut();
            let updated = manager.apply_set_breakpoints_response(&ids, &body.breakpoints);
            let current: Vec<BreakpointConfig> =
                manager.list_for_file(path).into_iter().cloned().collect();
            (updated, current)
        };
        for id in updated {
            self.notify(SessionEvent::BreakpointChanged(id));
        }
        Ok(current)
    }

    /// Send `configurationDone`.
    pub async fn configuration_done(&self) -> Result<(), DapError> {
        self.send_request("configurationDone", None).await?;
        Ok(())
    }

    /// Resume a thread. The session goes to `Running` optimistically when
    /// the request is issued; a later `stopped` event overrides it and a
    /// failed request does not undo it.
    pub async fn continue_(&self, thread_id: i64) -> Result<(), DapError> {
        let args = ContinueArguments {
            thread_id,
            single_thread: None,
        };
        self.resume("continue", to_args(&args)?).await
    }

    /// Step over (`next`).
    pub async fn next(&self, thread_id: i64) -> Result<(), DapError> {
        self.resume("next", step_args(thread_id)?).await
    }

    /// Step into (`stepIn`).
    pub async fn step_in(&self, thread_id: i64) -> Result<(), DapError> {
        self.resume("stepIn", step_args(thread_id)?).await
    }

    /// Step out (`stepOut`).
    pub async fn step_out(&self, thread_id: i64) -> Result<(), DapError> {
        self.resume("stepOut", step_args(thread_id)?).await
    }

    async fn resume(&self, command: &str, arguments: serde_json::Value) -> Result<(), DapError> {
        self.transition(Transition::ResumeIssued).await;
        self.send_request(command, Some(arguments)).await?;
        Ok(())
    }

    /// Ask the adapter to pause a thread. State changes on the `stopped`
    /// event.
    pub async fn pause(&self, thread_id: i64) -> Result<(), DapError> {
        let args = PauseArguments { thread_id };
        self.send_request("pause", Some(to_args(&args)?)).await?;
        Ok(())
    }

    /// Fetch all threads and store them in the session.
    pub async fn threads(&self) -> Result<Vec<Thread>, DapError> {
        let response = self.send_request("threads", None).await?;
        let body: ThreadsResponseBody = parse_body(&response)?;
        self.shared
            .inbound
            .lock()
            .await
            .session
            .set_threads(body.threads.clone());
        self.notify(SessionEvent::ThreadsChanged);
        Ok(body.threads)
    }

    /// Fetch a thread's stack and store it; the first frame becomes current.
    pub async fn stack_trace(
        &self,
        thread_id: i64,
        start_frame: Option<i64>,
        levels: Option<i64>,
    ) -> Result<Vec<StackFrame>, DapError> {
        let args = StackTraceArguments {
            thread_id,
            start_frame,
            levels,
        };
        let generation = self.resume_generation().await;
        let response = self
            .send_request("stackTrace", Some(to_args(&args)?))
            .await?;
        let body: StackTraceResponseBody = parse_body(&response)?;
        let mut inbound = self.shared.inbound.lock().await;
        if inbound.session.resume_generation() == generation {
            inbound.session.set_stack_frames(body.stack_frames.clone());
        } else {
            tracing::debug!(thread_id, "debuggee resumed during stackTrace; frames not cached");
        }
        Ok(body.stack_frames)
    }

    /// Fetch a frame's scopes and store them.
    pub async fn scopes(&self, frame_id: i64) -> Result<Vec<Scope>, DapError> {
        let args = ScopesArguments { frame_id };
        let generation = self.resume_generation().await;
        let response = self.send_request("scopes", Some(to_args(&args)?)).await?;
        let body: ScopesResponseBody = parse_body(&response)?;
        let mut inbound = self.shared.inbound.lock().await;
        if inbound.session.resume_generation() == generation {
            inbound.session.set_scopes(body.scopes.clone());
        } else {
            tracing::debug!(frame_id, "debuggee resumed during scopes; scopes not cached");
        }
        Ok(body.scopes)
    }

    async fn resume_generation(&self) -> u64 {
        self.shared.inbound.lock().await.session.resume_generation()
    }

    /// Fetch the children of a variables reference and cache them.
    pub async fn variables(&self, variables_reference: i64) -> Result<Vec<Variable>, DapError> {
        let args = VariablesArguments {
            variables_reference,
            start: None,
            count: None,
        };
        let response = self
            .send_request("variables", Some(to_args(&args)?))
            .await?;
        let body: VariablesResponseBody = parse_body(&response)?;
        self.shared
            .inbound
            .lock()
            .await
            .session
            .set_variables(variables_reference, body.variables.clone());
        Ok(body.variables)
    }

    /// Evaluate an expression, optionally in a frame and context
    /// (`watch`, `repl`, `hover`).
    pub async fn evaluate(
        &self,
        expression: &str,
        frame_id: Option<i64>,
        context: Option<&str>,
    ) -> Result<EvaluateResponseBody, DapError> {
        let args = EvaluateArguments {
            expression: expression.to_string(),
            frame_id,
            context: context.map(str::to_string),
        };
        let response = self.send_request("evaluate", Some(to_args(&args)?)).await?;
        parse_body(&response)
    }

    /// Assign a variable and update the cached copy.
    pub async fn set_variable(
        &self,
        variables_reference: i64,
        name: &str,
        value: &str,
    ) -> Result<SetVariableResponseBody, DapError> {
        let args = SetVariableArguments {
            variables_reference,
            name: name.to_string(),
            value: value.to_string(),
        };
        let response = self
            .send_request("setVariable", Some(to_args(&args)?))
            .await?;
        let body: SetVariableResponseBody = parse_body(&response)?;
        self.shared.inbound.lock().await.session.update_variable(
            variables_reference,
            name,
            &body.value,
            body.variable_type.as_deref(),
            body.variables_reference,
        );
        Ok(body)
    }

    /// Fetch details of the exception a thread stopped on.
    pub async fn exception_info(&self, thread_id: i64) -> Result<ExceptionInfo, DapError> {
        let args = ExceptionInfoArguments { thread_id };
        let response = self
            .send_request("exceptionInfo", Some(to_args(&args)?))
            .await?;
        let body: ExceptionInfoResponseBody = parse_body(&response)?;
        let info = ExceptionInfo {
            exception_id: Some(body.exception_id),
            description: body.description,
            break_mode: body.break_mode,
        };
        self.shared
            .inbound
            .lock()
            .await
            .session
            .set_exception_info(info.clone());
        Ok(info)
    }

    /// Send `restart`, optionally with new launch/attach arguments.
    pub async fn restart(&self, arguments: Option<serde_json::Value>) -> Result<(), DapError> {
        let args = arguments.map(|a| serde_json::json!({ "arguments": a }));
        self.send_request("restart", args).await?;
        Ok(())
    }

    /// Ask the adapter to end the debuggee gracefully.
    pub async fn terminate(&self) -> Result<(), DapError> {
        let args = TerminateArguments { restart: None };
        self.send_request("terminate", Some(to_args(&args)?)).await?;
        Ok(())
    }

    /// End the debug session.
    pub async fn disconnect(&self, terminate_debuggee: Option<bool>) -> Result<(), DapError> {
        let args = DisconnectArguments {
            restart: None,
            terminate_debuggee,
            suspend_debuggee: None,
        };
        self.send_request("disconnect", Some(to_args(&args)?))
            .await?;
        Ok(())
    }
}

/// Turn a completion into the caller's result.
fn complete(
    command: &str,
    outcome: Result<Result<Response, DapError>, oneshot::error::RecvError>,
) -> Result<Response, DapError> {
    let response = outcome
        .map_err(|_| DapError::Transport(format!("{command} request was dropped")))??;
    if response.success {
        Ok(response)
    } else {
        Err(DapError::RequestFailed {
            command: command.to_string(),
            message: response
                .message
                .unwrap_or_else(|| format!("{command} request failed")),
        })
    }
}

fn to_args<T: Serialize>(args: &T) -> Result<serde_json::Value, DapError> {
    serde_json::to_value(args).map_err(|e| DapError::Serialization(e.to_string()))
}

fn step_args(thread_id: i64) -> Result<serde_json::Value, DapError> {
    to_args(&StepArguments {
        thread_id,
        granularity: None,
    })
}

fn parse_body<T: DeserializeOwned>(response: &Response) -> Result<T, DapError> {
    let body = response.body.clone().unwrap_or(serde_json::Value::Null);
    serde_json::from_value(body)
        .map_err(|e| DapError::InvalidResponse(format!("{}: {e}", response.command)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use tokio::sync::mpsc;

    fn client() -> (DapClient, mpsc::UnboundedReceiver<String>) {
        let (transport, rx) = ChannelTransport::channel();
        (DapClient::new(transport), rx)
    }

    async fn sent(rx: &mut mpsc::UnboundedReceiver<String>) -> Request {
        let frame = rx.recv().await.expect("a request frame");
        match codec::decode(&frame).unwrap() {
            Message::Request(r) => r,
            other => panic!("expected request, got {other:?}"),
        }
    }

    fn reply(request: &Request, success: bool, body: serde_json::Value) -> String {
        serde_json::json!({
            "seq": 1000 + request.seq,
            "type": "response",
            "request_seq": request.seq,
            "success": success,
            "command": request.command,
            "body": body
        })
        .to_string()
    }

    #[tokio::test]
    async fn client_seq_starts_at_one_and_increases() {
        let (client, mut rx) = client();
        for _ in 0..3 {
            let c = client.clone();
            tokio::spawn(async move { c.configuration_done().await });
        }
        let mut seqs = Vec::new();
        for _ in 0..3 {
            seqs.push(sent(&mut rx).await.seq);
        }
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn client_initialize_sends_identity_and_stores_capabilities() {
        let (client, mut rx) = client();
        let c = client.clone();
        let task = tokio::spawn(async move { c.initialize().await });

        let request = sent(&mut rx).await;
        assert_eq!(request.command, "initialize");
        let args = request.arguments.clone().unwrap();
        assert_eq!(args["clientID"], "sling");
        assert_eq!(args["adapterID"], "debug");
        assert_eq!(args["pathFormat"], "path");
        assert_eq!(args["linesStartAt1"], true);
        assert_eq!(args["supportsVariablePaging"], true);
        assert_eq!(client.state().await, SessionState::Initializing);

        client
            .handle_frame(&reply(
                &request,
                true,
                serde_json::json!({"supportsConfigurationDoneRequest": true}),
            ))
            .await;
        let caps = task.await.unwrap().unwrap();
        assert!(caps.supports_configuration_done_request);
        assert!(
            client
                .session()
                .await
                .capabilities()
                .supports_configuration_done_request
        );
    }

    #[tokio::test]
    async fn client_failed_response_carries_message() {
        let (client, mut rx) = client();
        let c = client.clone();
        let task = tokio::spawn(async move { c.launch(serde_json::json!({})).await });
        let request = sent(&mut rx).await;
        let frame = serde_json::json!({
            "seq": 9, "type": "response", "request_seq": request.seq,
            "success": false, "command": "launch", "message": "program not found"
        })
        .to_string();
        client.handle_frame(&frame).await;
        match task.await.unwrap() {
            Err(DapError::RequestFailed { command, message }) => {
                assert_eq!(command, "launch");
                assert_eq!(message, "program not found");
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_failed_response_without_message_gets_default() {
        let (client, mut rx) = client();
        let c = client.clone();
        let task = tokio::spawn(async move { c.pause(1).await });
        let request = sent(&mut rx).await;
        let frame = serde_json::json!({
            "seq": 9, "type": "response", "request_seq": request.seq,
            "success": false, "command": "pause"
        })
        .to_string();
        client.handle_frame(&frame).await;
        match task.await.unwrap() {
            Err(DapError::RequestFailed { message, .. }) => {
                assert_eq!(message, "pause request failed")
            }
            other => panic!("expected RequestFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn client_read_commands_write_session() {
        let (client, mut rx) = client();

        let c = client.clone();
        let task = tokio::spawn(async move { c.stack_trace(1, None, None).await });
        let request = sent(&mut rx).await;
        client
            .handle_frame(&reply(
                &request,
                true,
                serde_json::json!({"stackFrames": [
                    {"id": 10, "name": "main", "line": 3, "column": 1},
                    {"id": 11, "name": "start", "line": 1, "column": 1}
                ]}),
            ))
            .await;
        assert_eq!(task.await.unwrap().unwrap().len(), 2);

        let c = client.clone();
        let task = tokio::spawn(async move { c.scopes(10).await });
        let request = sent(&mut rx).await;
        assert_eq!(request.arguments.as_ref().unwrap()["frameId"], 10);
        client
            .handle_frame(&reply(
                &request,
                true,
                serde_json::json!({"scopes": [{"name": "Locals", "variablesReference": 5}]}),
            ))
            .await;
        task.await.unwrap().unwrap();

        let c = client.clone();
        let task = tokio::spawn(async move { c.variables(5).await });
        let request = sent(&mut rx).await;
        client
            .handle_frame(&reply(
                &request,
                true,
                serde_json::json!({"variables": [{"name": "x", "value": "1", "variablesReference": 0}]}),
            ))
            .await;
        task.await.unwrap().unwrap();

        let session = client.session().await;
        assert_eq!(session.current_frame_id(), Some(10));
        assert_eq!(session.scopes()[0].variables_reference, 5);
        assert_eq!(session.variables(5).unwrap()[0].value, "1");
    }

    #[tokio::test]
    async fn client_set_variable_updates_cache() {
        let (client, mut rx) = client();
        let c = client.clone();
        let task = tokio::spawn(async move { c.variables(5).await });
        let request = sent(&mut rx).await;
        client
            .handle_frame(&reply(
                &request,
                true,
                serde_json::json!({"variables": [{"name": "x", "value": "1", "variablesReference": 0}]}),
            ))
            .await;
        task.await.unwrap().unwrap();

        let c = client.clone();
        let task = tokio::spawn(async move { c.set_variable(5, "x", "42").await });
        let request = sent(&mut rx).await;
        assert_eq!(request.arguments.as_ref().unwrap()["value"], "42");
        client
            .handle_frame(&reply(&request, true, serde_json::json!({"value": "42"})))
            .await;
        task.await.unwrap().unwrap();
        assert_eq!(client.session().await.variables(5).unwrap()[0].value, "42");
    }

    #[tokio::test]
    async fn client_bad_body_is_invalid_response() {
        let (client, mut rx) = client();
        let c = client.clone();
        let task = tokio::spawn(async move { c.threads().await });
        let request = sent(&mut rx).await;
        client
            .handle_frame(&reply(&request, true, serde_json::json!({"threads": 3})))
            .await;
        assert!(matches!(
            task.await.unwrap(),
            Err(DapError::InvalidResponse(_))
        ));
        assert!(client.session().await.threads().is_empty());
    }

    #[tokio::test]
    async fn client_resume_is_optimistic_and_not_reverted() {
        let (client, mut rx) = client();
        client
            .handle_frame(r#"{"seq":1,"type":"event","event":"initialized"}"#)
            .await;
        client
            .handle_frame(
                r#"{"seq":2,"type":"event","event":"stopped","body":{"reason":"step","threadId":1}}"#,
            )
            .await;
        assert_eq!(client.state().await, SessionState::Stopped);

        let c = client.clone();
        let task = tokio::spawn(async move { c.next(1).await });
        let request = sent(&mut rx).await;
        assert_eq!(request.command, "next");
        assert_eq!(client.state().await, SessionState::Running);

        let frame = serde_json::json!({
            "seq": 3, "type": "response", "request_seq": request.seq,
            "success": false, "command": "next"
        })
        .to_string();
        client.handle_frame(&frame).await;
        assert!(task.await.unwrap().is_err());
        assert_eq!(client.state().await, SessionState::Running);
    }

    #[tokio::test]
    async fn client_send_failure_removes_entry() {
        let (client, rx) = client();
        drop(rx);
        assert!(matches!(
            client.threads().await,
            Err(DapError::Transport(_))
        ));
        assert_eq!(client.pending_count().await, 0);
    }

    #[tokio::test]
    async fn client_requests_after_close_fail_immediately() {
        let (client, mut rx) = client();
        client.handle_close().await;
        assert!(matches!(
            client.threads().await,
            Err(DapError::Transport(_))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn client_close_is_broadcast_once() {
        let (client, _rx) = client();
        let mut events = client.subscribe();
        client.handle_close().await;
        client.handle_close().await;
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Disconnected);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn client_reverse_request_is_ignored() {
        let (client, mut rx) = client();
        client
            .handle_frame(
                r#"{"seq":1,"type":"request","command":"runInTerminal","arguments":{}}"#,
            )
            .await;
        assert!(rx.try_recv().is_err());
        assert_eq!(client.state().await, SessionState::Disconnected);
    }

    #[tokio::test]
    async fn client_restart_wraps_arguments() {
        let (client, mut rx) = client();
        let c = client.clone();
        tokio::spawn(async move { c.restart(Some(serde_json::json!({"program": "a"}))).await });
        let request = sent(&mut rx).await;
        assert_eq!(request.command, "restart");
        assert_eq!(request.arguments.unwrap()["arguments"]["program"], "a");
    }

    #[tokio::test]
    async fn client_disconnect_arguments() {
        let (client, mut rx) = client();
        let c = client.clone();
        tokio::spawn(async move { c.disconnect(Some(true)).await });
        let request = sent(&mut rx).await;
        assert_eq!(request.command, "disconnect");
        assert_eq!(request.arguments.unwrap()["terminateDebuggee"], true);
    }
}
