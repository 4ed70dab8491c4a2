//! Typed adapter events and the session event stream.

use crate::protocol::{
    BreakpointEventBody, CapabilitiesEventBody, ContinuedEventBody, Event, ExitedEventBody,
    OutputEventBody, StoppedEventBody, TerminatedEventBody, ThreadEventBody,
};
use crate::session::{ConsoleOutputEntry, SessionState};

/// An adapter event, parsed into its body type.
///
/// Names the client does not know become [`DapEvent::Unknown`]; so does a
/// known name whose body does not parse.
#[derive(Debug, Clone, PartialEq)]
pub enum DapEvent {
    /// The adapter is ready to accept configuration requests.
    Initialized,
    /// Execution stopped.
    Stopped(StoppedEventBody),
    /// Execution resumed.
    Continued(ContinuedEventBody),
    /// The debuggee exited.
    Exited(ExitedEventBody),
    /// The debug session ended.
    Terminated(TerminatedEventBody),
    /// Console output.
    Output(OutputEventBody),
    /// A thread started or exited.
    Thread(ThreadEventBody),
    /// A breakpoint changed on the adapter side.
    Breakpoint(BreakpointEventBody),
    /// A module was loaded, changed or removed.
    Module(serde_json::Value),
    /// The debuggee process was started or attached.
    Process(serde_json::Value),
    /// Adapter capabilities changed.
    Capabilities(CapabilitiesEventBody),
    /// Any other event.
    Unknown {
        /// Event name.
        name: String,
        /// Raw body.
        body: Option<serde_json::Value>,
    },
}

impl DapEvent {
    /// Parse a wire event.
    pub fn from_event(event: &Event) -> Self {
        let body = event.body.clone();
        let parsed = match event.event.as_str() {
            "initialized" => Ok(DapEvent::Initialized),
            "stopped" => parse_body(&body).map(DapEvent::Stopped),
            "continued" => parse_body(&body).map(DapEvent::Continued),
            "exited" => parse_body(&body).map(DapEvent::Exited),
            // the terminated body is optional
            "terminated" => match &body {
                Some(_) => parse_body(&body).map(DapEvent::Terminated),
                None => Ok(DapEvent::Terminated(TerminatedEventBody::default())),
            },
            "output" => parse_body(&body).map(DapEvent::Output),
            "thread" => parse_body(&body).map(DapEvent::Thread),
            "breakpoint" => parse_body(&body).map(DapEvent::Breakpoint),
            "module" => Ok(DapEvent::Module(body.clone().unwrap_or_default())),
            "process" => Ok(DapEvent::Process(body.clone().unwrap_or_default())),
            "capabilities" => parse_body(&body).map(DapEvent::Capabilities),
            _ => {
                return DapEvent::Unknown {
                    name: event.event.clone(),
                    body,
                }
            }
        };
        parsed.unwrap_or_else(|e| {
            tracing::warn!(event = %event.event, error = %e, "event body did not parse");
            DapEvent::Unknown {
                name: event.event.clone(),
                body,
            }
        })
    }
}

fn parse_body<T: serde::de::DeserializeOwned>(
    body: &Option<serde_json::Value>,
) -> Result<T, serde_json::Error> {
    serde_json::from_value(body.clone().unwrap_or(serde_json::Value::Null))
}

/// What observers of a session learn about, in dispatch order.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The session state changed.
    StateChanged(SessionState),
    /// The debuggee stopped.
    Stopped {
        /// Stop reason as sent by the adapter.
        reason: String,
        /// Thread that stopped, if reported.
        thread_id: Option<i64>,
    },
    /// A console entry was appended.
    Output(ConsoleOutputEntry),
    /// The thread list was refreshed.
    ThreadsChanged,
    /// A local breakpoint's verification changed.
    BreakpointChanged(String),
    /// The debuggee exited with this code.
    Exited(i64),
    /// The adapter ended the session.
    Terminated,
    /// The transport closed.
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(name: &str, body: Option<serde_json::Value>) -> Event {
        Event {
            seq: 1,
            event: name.into(),
            body,
        }
    }

    #[test]
    fn event_stopped_parses() {
        let parsed = DapEvent::from_event(&event(
            "stopped",
            Some(serde_json::json!({"reason": "breakpoint", "threadId": 1})),
        ));
        match parsed {
            DapEvent::Stopped(body) => {
                assert_eq!(body.reason, "breakpoint");
                assert_eq!(body.thread_id, Some(1));
            }
            other => panic!("expected stopped, got {other:?}"),
        }
    }

    #[test]
    fn event_terminated_without_body() {
        assert_eq!(
            DapEvent::from_event(&event("terminated", None)),
            DapEvent::Terminated(TerminatedEventBody::default())
        );
    }

    #[test]
    fn event_unknown_name_is_kept() {
        let parsed = DapEvent::from_event(&event(
            "progressStart",
            Some(serde_json::json!({"progressId": "p1"})),
        ));
        match parsed {
            DapEvent::Unknown { name, body } => {
                assert_eq!(name, "progressStart");
                assert_eq!(body.unwrap()["progressId"], "p1");
            }
            other => panic!("expected unknown, got {other:?}"),
        }
    }

    #[test]
    fn event_malformed_body_degrades_to_unknown() {
        let parsed = DapEvent::from_event(&event("stopped", Some(serde_json::json!({"threadId": 1}))));
        assert!(matches!(parsed, DapEvent::Unknown { ref name, .. } if name == "stopped"));

        let parsed = DapEvent::from_event(&event("output", None));
        assert!(matches!(parsed, DapEvent::Unknown { ref name, .. } if name == "output"));
    }

    #[test]
    fn event_initialized_ignores_body() {
        assert_eq!(
            DapEvent::from_event(&event("initialized", Some(serde_json::json!({})))),
            DapEvent::Initialized
        );
    }
}
