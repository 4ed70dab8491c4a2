//! Breakpoint management for DAP sessions.
//!
//! Breakpoints are client-side records owned by the session. `enabled` is
//! a purely local toggle; pushing the file's breakpoints to the adapter is
//! an explicit `setBreakpoints` call made by the host. `verified` is only
//! ever written by reconciliation against adapter reports.

use std::path::{Path, PathBuf};

use crate::protocol::{Breakpoint, SourceBreakpoint};

/// A client-side breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointConfig {
    /// Opaque client-generated identifier.
    pub id: String,
    /// Source file path.
    pub file_path: PathBuf,
    /// Line number (1-based).
    pub line: i64,
    /// Optional column (1-based).
    pub column: Option<i64>,
    /// Optional condition expression.
    pub condition: Option<String>,
    /// Optional hit condition expression.
    pub hit_condition: Option<String>,
    /// Optional log message (logpoint).
    pub log_message: Option<String>,
    /// Local toggle; disabled breakpoints are left out of `setBreakpoints`.
    pub enabled: bool,
    /// Whether the adapter has verified this breakpoint.
    pub verified: bool,
    /// Adapter-assigned ID (set after adapter response).
    pub adapter_id: Option<i64>,
    /// Adapter's explanation, typically why the breakpoint is unverified.
    pub message: Option<String>,
}

/// What the host asks for when creating a breakpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointSpec {
    /// Source file path.
    pub file_path: PathBuf,
    /// Line number (1-based).
    pub line: i64,
    /// Optional column.
    pub column: Option<i64>,
    /// Optional condition expression.
    pub condition: Option<String>,
    /// Optional hit condition expression.
    pub hit_condition: Option<String>,
    /// Optional log message.
    pub log_message: Option<String>,
}

impl BreakpointSpec {
    /// A plain line breakpoint.
    pub fn new(file_path: impl Into<PathBuf>, line: i64) -> Self {
        Self {
            file_path: file_path.into(),
            line,
            column: None,
            condition: None,
            hit_condition: None,
            log_message: None,
        }
    }

    /// Set the column.
    pub fn with_column(mut self, column: i64) -> Self {
        self.column = Some(column);
        self
    }

    /// Make it conditional.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    /// Add a hit condition.
    pub fn with_hit_condition(mut self, hit_condition: impl Into<String>) -> Self {
        self.hit_condition = Some(hit_condition.into());
        self
    }

    /// Make it a logpoint.
    pub fn with_log_message(mut self, msg: impl Into<String>) -> Self {
        self.log_message = Some(msg.into());
        self
    }
}

/// A partial update. `None` leaves a field unchanged; for the optional
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreakpointUpdate {
    /// New line.
    pub line: Option<i64>,
    /// New column.
    pub column: Option<Option<i64>>,
    /// New condition.
    pub condition: Option<Option<String>>,
    /// New hit condition.
    pub hit_condition: Option<Option<String>>,
    /// New log message.
    pub log_message: Option<Option<String>>,
    /// New enabled flag.
    pub enabled: Option<bool>,
}

/// Manages the breakpoints of one debug session.
#[derive(Debug, Clone, Default)]
pub struct BreakpointManager {
    breakpoints: Vec<BreakpointConfig>,
}

impl BreakpointManager {
    /// Create a new empty breakpoint manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a breakpoint. It starts enabled and unverified.
    pub fn add(&mut self, spec: BreakpointSpec) -> BreakpointConfig {
        let bp = BreakpointConfig {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: spec.file_path,
            line: spec.line,
            column: spec.column,
            condition: spec.condition,
            hit_condition: spec.hit_condition,
            log_message: spec.log_message,
            enabled: true,
            verified: false,
            adapter_id: None,
            message: None,
        };
        self.breakpoints.push(bp.clone());
        bp
    }

    /// Remove a breakpoint by id, returning it if it existed.
    pub fn remove(&mut self, id: &str) -> Option<BreakpointConfig> {
        let index = self.breakpoints.iter().position(|bp| bp.id == id)?;
        Some(self.breakpoints.remove(index))
    }

    /// Apply a partial update.
    ///
    /// Changing where or when the breakpoint fires clears `verified`, since
    /// the adapter has not yet seen the new configuration.
    pub fn update(&mut self, id: &str, update: BreakpointUpdate) -> Option<&BreakpointConfig> {
        let bp = self.breakpoints.iter_mut().find(|bp| bp.id == id)?;
        let mut placement_changed = false;
        if let Some(line) = update.line {
            placement_changed |= bp.line != line;
            bp.line = line;
        }
        if let Some(column) = update.column {
            placement_changed |= bp.column != column;
            bp.column = column;
        }
        if let Some(condition) = update.condition {
            placement_changed |= bp.condition != condition;
            bp.condition = condition;
        }
        if let Some(hit_condition) = update.hit_condition {
            placement_changed |= bp.hit_condition != hit_condition;
            bp.hit_condition = hit_condition;
        }
        if let Some(log_message) = update.log_message {
            placement_changed |= bp.log_message != log_message;
            bp.log_message = log_message;
        }
        if let Some(enabled) = update.enabled {
            bp.enabled = enabled;
        }
        if placement_changed {
            bp.verified = false;
        }
        Some(bp)
    }

    /// Flip `enabled`, returning the new value.
    pub fn toggle_enabled(&mut self, id: &str) -> Option<bool> {
        let bp = self.breakpoints.iter_mut().find(|bp| bp.id == id)?;
        bp.enabled = !bp.enabled;
        Some(bp.enabled)
    }

    /// Look up a breakpoint by id.
    pub fn get(&self, id: &str) -> Option<&BreakpointConfig> {
        self.breakpoints.iter().find(|bp| bp.id == id)
    }

    /// All breakpoints in a file, in creation order.
    pub fn list_for_file(&self, path: &Path) -> Vec<&BreakpointConfig> {
        self.breakpoints
            .iter()
            .filter(|bp| bp.file_path == path)
            .collect()
    }

    /// Distinct files that have at least one breakpoint.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = Vec::new();
        for bp in &self.breakpoints {
            if !files.contains(&bp.file_path) {
                files.push(bp.file_path.clone());
            }
        }
        files
    }

    /// Return an iterator over all breakpoints.
    pub fn all(&self) -> impl Iterator<Item = &BreakpointConfig> {
        self.breakpoints.iter()
    }

    /// The enabled breakpoints of a file in wire form, paired with their
    /// ids so the response can be matched back by index.
    pub fn source_breakpoints_for_file(&self, path: &Path) -> (Vec<String>, Vec<SourceBreakpoint>) {
        self.breakpoints
            .iter()
            .filter(|bp| bp.enabled && bp.file_path == path)
            .map(|bp| {
                (
                    bp.id.clone(),
                    SourceBreakpoint {
                        line: bp.line,
                        column: bp.column,
                        condition: bp.condition.clone(),
                        hit_condition: bp.hit_condition.clone(),
                        log_message: bp.log_message.clone(),
                    },
                )
            })
            .unzip()
    }

    /// Reconcile a `setBreakpoints` response. The adapter answers in
    /// request order, so `ids[i]` pairs with `reported[i]`. Returns the ids
    /// that were updated.
    pub fn apply_set_breakpoints_response(
        &mut self,
        ids: &[String],
        reported: &[Breakpoint],
    ) -> Vec<String> {
        let mut updated = Vec::new();
        for (id, remote) in ids.iter().zip(reported) {
            if let Some(bp) = self.breakpoints.iter_mut().find(|bp| &bp.id == id) {
                apply_remote(bp, remote);
                updated.push(id.clone());
            }
        }
        updated
    }

    /// Reconcile a `breakpoint` event.
    ///
    /// Matches the first local breakpoint whose line equals the reported
    /// line, regardless of file. When the adapter omits the line, falls
    /// back to the adapter-assigned id. Returns the id that was updated.
    pub fn reconcile_event(&mut self, remote: &Breakpoint) -> Option<String> {
        let bp = match remote.line {
            Some(line) => self.breakpoints.iter_mut().find(|bp| bp.line == line),
            None => {
                let adapter_id = remote.id?;
                self.breakpoints
                    .iter_mut()
                    .find(|bp| bp.adapter_id == Some(adapter_id))
            }
        }?;
        bp.verified = remote.verified;
        if remote.id.is_some() {
            bp.adapter_id = remote.id;
        }
        bp.message = remote.message.clone();
        Some(bp.id.clone())
    }
}

fn apply_remote(bp: &mut BreakpointConfig, remote: &Breakpoint) {
    bp.verified = remote.verified;
    bp.adapter_id = remote.id;
    bp.message = remote.message.clone();
    if let Some(line) = remote.line {
        // the adapter may move a breakpoint to the nearest valid line
        bp.line = line;
    }
}
