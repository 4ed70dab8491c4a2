//! Debug session state: the state machine and the execution-context cache.
//!
//! [`DebugSession`] is the authoritative record for one debug target. It is
//! mutated only through the setters below, from the client's dispatch
//! path and from the client facade when a read command succeeds.

use std::collections::HashMap;
use std::time::SystemTime;

use crate::breakpoint::BreakpointManager;
use crate::capabilities::DapCapabilities;
use crate::protocol::{Capabilities, Scope, StackFrame, Thread, Variable};

/// The current state of a debug session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No handshake yet, or the transport has gone away.
    Disconnected,
    /// `initialize` has been sent; waiting for the `initialized` event.
    Initializing,
    /// The debuggee is running (or assumed to be, see [`Transition::ResumeIssued`]).
    Running,
    /// The debuggee is stopped (e.g. at a breakpoint).
    Stopped,
    /// The adapter reported `terminated`.
    Terminated,
}

/// What can move the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The client sent `initialize`.
    InitializeSent,
    /// `initialized` event.
    Initialized,
    /// `stopped` event.
    Stopped,
    /// `continued` event.
    Continued,
    /// The client issued `continue` or a step. Optimistic: the adapter is
    /// authoritative and a later `stopped` event overrides it.
    ResumeIssued,
    /// `terminated` event.
    Terminated,
    /// The transport closed.
    TransportClosed,
}

impl SessionState {
    /// The state reached from `self` on `transition`, or `None` when the
    /// transition is not accepted in this state.
    pub fn next(self, transition: Transition) -> Option<SessionState> {
        use SessionState::*;
        match (self, transition) {
            (_, Transition::TransportClosed) => Some(Disconnected),
            (Terminated, _) => None,
            (_, Transition::Terminated) => Some(Terminated),
            (Disconnected, Transition::InitializeSent) => Some(Initializing),
            (Disconnected | Initializing, Transition::Initialized) => Some(Running),
            (Initializing | Running | Stopped, Transition::Stopped) => Some(Stopped),
            (Running | Stopped, Transition::Continued | Transition::ResumeIssued) => Some(Running),
            _ => None,
        }
    }
}

/// Where a line of console output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCategory {
    /// Debuggee standard output.
    Stdout,
    /// Debuggee standard error.
    Stderr,
    /// Messages from the adapter itself.
    Console,
}

impl ConsoleCategory {
    /// Map an `output` event category. Absent or unrecognised values
    /// (including `telemetry` and `important`) count as stdout.
    pub fn from_category(category: Option<&str>) -> Self {
        match category {
            Some("stderr") => ConsoleCategory::Stderr,
            Some("console") => ConsoleCategory::Console,
            _ => ConsoleCategory::Stdout,
        }
    }
}

/// One entry of the append-only console log.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleOutputEntry {
    /// Output category.
    pub category: ConsoleCategory,
    /// The text, exactly as the adapter sent it.
    pub text: String,
    /// When the entry was recorded.
    pub timestamp: SystemTime,
}

/// Details of the exception the debuggee stopped on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExceptionInfo {
    /// Exception identifier, if the adapter provided one.
    pub exception_id: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
    /// Break mode reported by `exceptionInfo`.
    pub break_mode: Option<String>,
}

/// Per-session debug state.
#[derive(Debug, Clone)]
pub struct DebugSession {
    id: String,
    state: SessionState,
    closed: bool,
    capabilities: DapCapabilities,
    threads: Vec<Thread>,
    current_thread_id: Option<i64>,
    stack_frames: Vec<StackFrame>,
    current_frame_id: Option<i64>,
    scopes: Vec<Scope>,
    variables: HashMap<i64, Vec<Variable>>,
    breakpoints: BreakpointManager,
    stopped_reason: Option<String>,
    exception_info: Option<ExceptionInfo>,
    exit_code: Option<i64>,
    console: Vec<ConsoleOutputEntry>,
    resume_generation: u64,
}

impl DebugSession {
    /// Create a new session in the [`Disconnected`](SessionState::Disconnected) state.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            state: SessionState::Disconnected,
            closed: false,
            capabilities: DapCapabilities::default(),
            threads: Vec::new(),
            current_thread_id: None,
            stack_frames: Vec::new(),
            current_frame_id: None,
            scopes: Vec::new(),
            variables: HashMap::new(),
            breakpoints: BreakpointManager::new(),
            stopped_reason: None,
            exception_info: None,
            exit_code: None,
            console: Vec::new(),
            resume_generation: 0,
        }
    }

    /// Opaque session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return the current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True once the transport has closed. A closed session accepts no
    /// further transitions.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Apply a transition. Returns the new state if it changed.
    pub fn apply(&mut self, transition: Transition) -> Option<SessionState> {
        if self.closed {
            return None;
        }
        let next = self.state.next(transition)?;
        if transition == Transition::TransportClosed {
            self.closed = true;
        }
        if next == self.state {
            return None;
        }
        tracing::debug!(from = ?self.state, to = ?next, ?transition, "session state change");
        if self.state == SessionState::Stopped {
            self.stopped_reason = None;
            self.exception_info = None;
        }
        if next == SessionState::Running {
            self.resume_generation += 1;
            self.stack_frames.clear();
            self.current_frame_id = None;
            self.scopes.clear();
        }
        self.state = next;
        Some(next)
    }

    /// Bumped on every entry into [`Running`](SessionState::Running).
    /// Frames or scopes fetched under an older generation are stale.
    pub fn resume_generation(&self) -> u64 {
        self.resume_generation
    }

    /// Record a `stopped` event. Returns false when the state machine
    /// rejected the transition (e.g. after termination).
    pub fn record_stop(
        &mut self,
        reason: &str,
        thread_id: Option<i64>,
        exception: Option<ExceptionInfo>,
    ) -> bool {
        self.apply(Transition::Stopped);
        if self.state != SessionState::Stopped {
            return false;
        }
        self.stopped_reason = Some(reason.to_string());
        self.exception_info = exception;
        if thread_id.is_some() {
            self.current_thread_id = thread_id;
        }
        true
    }

    /// Why the debuggee stopped. Only set while stopped.
    pub fn stopped_reason(&self) -> Option<&str> {
        self.stopped_reason.as_deref()
    }

    /// The exception the debuggee stopped on. Only set while stopped.
    pub fn exception_info(&self) -> Option<&ExceptionInfo> {
        self.exception_info.as_ref()
    }

    /// Replace the exception details. Ignored unless stopped.
    pub fn set_exception_info(&mut self, info: ExceptionInfo) -> bool {
        if self.state != SessionState::Stopped {
            return false;
        }
        self.exception_info = Some(info);
        true
    }

    /// Adapter capabilities.
    pub fn capabilities(&self) -> &DapCapabilities {
        &self.capabilities
    }

    /// Store the capabilities from the `initialize` response.
    pub fn set_capabilities(&mut self, caps: &Capabilities) {
        self.capabilities = DapCapabilities::from_initialize_response(caps);
    }

    /// Apply a `capabilities` event.
    pub fn merge_capabilities(&mut self, caps: &Capabilities) {
        self.capabilities = self.capabilities.merged(caps);
    }

    /// Known threads, in adapter order.
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    /// Replace the thread list wholesale.
    pub fn set_threads(&mut self, threads: Vec<Thread>) {
        self.threads = threads;
    }

    /// The selected thread.
    pub fn current_thread_id(&self) -> Option<i64> {
        self.current_thread_id
    }

    /// Select a thread manually.
    pub fn select_thread(&mut self, thread_id: i64) {
        self.current_thread_id = Some(thread_id);
    }

    /// Frames from the last `stackTrace`.
    pub fn stack_frames(&self) -> &[StackFrame] {
        &self.stack_frames
    }

    /// Replace the frames; the current frame becomes the first one.
    pub fn set_stack_frames(&mut self, frames: Vec<StackFrame>) {
        self.current_frame_id = frames.first().map(|f| f.id);
        self.stack_frames = frames;
    }

    /// The selected frame.
    pub fn current_frame_id(&self) -> Option<i64> {
        self.current_frame_id
    }

    /// The selected frame's record.
    pub fn current_frame(&self) -> Option<&StackFrame> {
        let id = self.current_frame_id?;
        self.stack_frames.iter().find(|f| f.id == id)
    }

    /// Select one of the known frames. Returns false for an unknown id.
    pub fn select_frame(&mut self, frame_id: i64) -> bool {
        if self.stack_frames.iter().any(|f| f.id == frame_id) {
            self.current_frame_id = Some(frame_id);
            true
        } else {
            false
        }
    }

    /// Scopes from the last `scopes` call.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Replace the scopes.
    pub fn set_scopes(&mut self, scopes: Vec<Scope>) {
        self.scopes = scopes;
    }

    /// Cached variables for a reference.
    pub fn variables(&self, reference: i64) -> Option<&[Variable]> {
        self.variables.get(&reference).map(|v| v.as_slice())
    }

    /// Cache the variables of a reference, replacing earlier entries for
    /// the same reference. Other references are kept.
    pub fn set_variables(&mut self, reference: i64, variables: Vec<Variable>) {
        self.variables.insert(reference, variables);
    }

    /// Update one cached variable after a successful `setVariable`.
    pub fn update_variable(
        &mut self,
        reference: i64,
        name: &str,
        value: &str,
        variable_type: Option<&str>,
        child_reference: Option<i64>,
    ) -> bool {
        let Some(var) = self
            .variables
            .get_mut(&reference)
            .and_then(|vars| vars.iter_mut().find(|v| v.name == name))
        else {
            return false;
        };
        var.value = value.to_string();
        if let Some(ty) = variable_type {
            var.variable_type = Some(ty.to_string());
        }
        if let Some(child) = child_reference {
            var.variables_reference = child;
        }
        true
    }

    /// The session's breakpoints.
    pub fn breakpoints(&self) -> &BreakpointManager {
        &self.breakpoints
    }

    /// Mutable access to the session's breakpoints.
    pub fn breakpoints_mut(&mut self) -> &mut BreakpointManager {
        &mut self.breakpoints
    }

    /// Exit code from the `exited` event.
    pub fn exit_code(&self) -> Option<i64> {
        self.exit_code
    }

    /// Record the debuggee's exit code.
    pub fn set_exit_code(&mut self, code: i64) {
        self.exit_code = Some(code);
    }

    /// The console log, oldest first.
    pub fn console(&self) -> &[ConsoleOutputEntry] {
        &self.console
    }

    /// Append to the console log.
    pub fn push_output(
        &mut self,
        category: ConsoleCategory,
        text: impl Into<String>,
    ) -> ConsoleOutputEntry {
        let entry = ConsoleOutputEntry {
            category,
            text: text.into(),
            timestamp: SystemTime::now(),
        };
        self.console.push(entry.clone());
        entry
    }
}

impl Default for DebugSession {
    fn default() -> Self {
        Self::new()
    }
}
