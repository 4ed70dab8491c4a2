//! Event dispatcher: applies adapter events to the session.
//!
//! Dispatch is total over [`DapEvent`]. Handlers only go through the
//! session's setters, and every state handler is set-style so delivering
//! the same event twice leaves the session as delivering it once.

use crate::events::{DapEvent, SessionEvent};
use crate::protocol::Event;
use crate::session::{ConsoleCategory, DebugSession, ExceptionInfo, SessionState, Transition};

/// Work the client must do on behalf of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// Send `threads` and replace the session's thread list with the result.
    RefreshThreads,
}

/// Outcome of dispatching one event.
#[derive(Debug, Default, PartialEq)]
pub struct Dispatch {
    /// Notifications for session observers, in order.
    pub notifications: Vec<SessionEvent>,
    /// Request the client should issue.
    pub follow_up: Option<FollowUp>,
}

/// Routes events into session state, dropping redelivered frames.
#[derive(Debug, Default)]
pub struct EventDispatcher {
    last_event_seq: Option<i64>,
}

impl EventDispatcher {
    /// Create a new dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch a wire event. A frame whose non-zero `seq` equals the
    /// previous event's is treated as a redelivery and ignored.
    pub fn dispatch(&mut self, session: &mut DebugSession, event: &Event) -> Dispatch {
        if event.seq != 0 && self.last_event_seq == Some(event.seq) {
            tracing::debug!(seq = event.seq, event = %event.event, "dropping redelivered event");
            return Dispatch::default();
        }
        self.last_event_seq = Some(event.seq);
        dispatch(session, DapEvent::from_event(event))
    }
}

/// Apply one typed event to the session.
pub fn dispatch(session: &mut DebugSession, event: DapEvent) -> Dispatch {
    let mut out = Dispatch::default();
    match event {
        DapEvent::Initialized => {
            if let Some(state) = session.apply(Transition::Initialized) {
                out.notifications.push(SessionEvent::StateChanged(state));
            }
        }
        DapEvent::Stopped(body) => {
            let was_stopped = session.state() == SessionState::Stopped;
            let exception = (body.reason == "exception").then(|| ExceptionInfo {
                exception_id: body.text.clone(),
                description: body.description.clone(),
                break_mode: None,
            });
            if session.record_stop(&body.reason, body.thread_id, exception) {
                if !was_stopped {
                    out.notifications
                        .push(SessionEvent::StateChanged(SessionState::Stopped));
                }
                out.notifications.push(SessionEvent::Stopped {
                    reason: body.reason,
                    thread_id: body.thread_id,
                });
            } else {
                tracing::debug!(state = ?session.state(), "stopped event ignored");
            }
        }
        DapEvent::Continued(body) => {
            tracing::trace!(thread_id = body.thread_id, "continued");
            if let Some(state) = session.apply(Transition::Continued) {
                out.notifications.push(SessionEvent::StateChanged(state));
            }
        }
        DapEvent::Exited(body) => {
            session.set_exit_code(body.exit_code);
            out.notifications.push(SessionEvent::Exited(body.exit_code));
        }
        DapEvent::Terminated(_) => {
            if let Some(state) = session.apply(Transition::Terminated) {
                out.notifications.push(SessionEvent::StateChanged(state));
                out.notifications.push(SessionEvent::Terminated);
            }
        }
        DapEvent::Output(body) => {
            let category = ConsoleCategory::from_category(body.category.as_deref());
            let entry = session.push_output(category, body.output);
            out.notifications.push(SessionEvent::Output(entry));
        }
        DapEvent::Thread(body) => {
            tracing::debug!(reason = %body.reason, thread_id = body.thread_id, "thread event");
            out.follow_up = Some(FollowUp::RefreshThreads);
        }
        DapEvent::Breakpoint(body) => match session.breakpoints_mut().reconcile_event(&body.breakpoint) {
            Some(id) => out.notifications.push(SessionEvent::BreakpointChanged(id)),
            None => tracing::debug!(
                line = ?body.breakpoint.line,
                "breakpoint event matches no local breakpoint"
            ),
        },
        DapEvent::Capabilities(body) => session.merge_capabilities(&body.capabilities),
        DapEvent::Module(_) | DapEvent::Process(_) => {}
        DapEvent::Unknown { name, .. } => {
            tracing::debug!(event = %name, "ignoring unknown event");
        }
    }
    out
}
