//! DAP capabilities tracking.

use crate::protocol::Capabilities;

/// Resolved capabilities of the debug adapter, stored as plain booleans.
///
/// These are recorded for the host to consult; the client itself never
/// refuses a command based on them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DapCapabilities {
    /// Whether the adapter supports `configurationDone`.
    pub supports_configuration_done_request: bool,
    /// Whether the adapter supports conditional breakpoints.
    pub supports_conditional_breakpoints: bool,
    /// Whether the adapter supports hit-count breakpoints.
    pub supports_hit_conditional_breakpoints: bool,
    /// Whether the adapter supports log points.
    pub supports_log_points: bool,
    /// Whether the adapter supports `evaluate` for hovers.
    pub supports_evaluate_for_hovers: bool,
    /// Whether the adapter supports setting variable values.
    pub supports_set_variable: bool,
    /// Whether the adapter supports the `restart` request.
    pub supports_restart_request: bool,
    /// Whether the adapter supports the `terminate` request.
    pub supports_terminate_request: bool,
    /// Whether the adapter supports the `exceptionInfo` request.
    pub supports_exception_info_request: bool,
}

impl DapCapabilities {
    /// Build [`DapCapabilities`] from the protocol-level [`Capabilities`]
    /// returned by the adapter in the `initialize` response.
    pub fn from_initialize_response(caps: &Capabilities) -> Self {
        Self::default().merged(caps)
    }

    /// Apply a `capabilities` event: fields the adapter sent override the
    /// current values, absent fields are left alone.
    pub fn merged(&self, caps: &Capabilities) -> Self {
        let pick = |new: Option<bool>, old: bool| new.unwrap_or(old);
        Self {
            supports_configuration_done_request: pick(
                caps.supports_configuration_done_request,
                self.supports_configuration_done_request,
            ),
            supports_conditional_breakpoints: pick(
                caps.supports_conditional_breakpoints,
                self.supports_conditional_breakpoints,
            ),
            supports_hit_conditional_breakpoints: pick(
                caps.supports_hit_conditional_breakpoints,
                self.supports_hit_conditional_breakpoints,
            ),
            supports_log_points: pick(caps.supports_log_points, self.supports_log_points),
            supports_evaluate_for_hovers: pick(
                caps.supports_evaluate_for_hovers,
                self.supports_evaluate_for_hovers,
            ),
            supports_set_variable: pick(caps.supports_set_variable, self.supports_set_variable),
            supports_restart_request: pick(
                caps.supports_restart_request,
                self.supports_restart_request,
            ),
            supports_terminate_request: pick(
                caps.supports_terminate_request,
                self.supports_terminate_request,
            ),
            supports_exception_info_request: pick(
                caps.supports_exception_info_request,
                self.supports_exception_info_request,
            ),
        }
    }
}
