use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    Configuration,
    ExternalTool,
    SpacingExhausted,
    Collision,
    ContainmentViolation,
    Compaction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub phase: String,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseReport {
    pub name: String,
    pub status: PhaseStatus,
    pub diagnostics: Vec<Diagnostic>,
}

impl PhaseReport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: PhaseStatus::Completed,
            diagnostics: Vec::new(),
        }
    }

    pub fn skipped(name: &str) -> Self {
        Self {
            status: PhaseStatus::Skipped,
            ..Self::new(name)
        }
    }

    pub fn push(
        &mut self,
        severity: Severity,
        kind: DiagnosticKind,
        message: impl Into<String>,
        ids: Vec<String>,
    ) {
        self.diagnostics.push(Diagnostic {
            phase: self.name.clone(),
            severity,
            kind,
            message: message.into(),
            ids,
        });
    }

    pub fn warn(&mut self, kind: DiagnosticKind, message: impl Into<String>, ids: Vec<String>) {
        self.push(Severity::Warning, kind, message, ids);
    }

    pub fn info(&mut self, kind: DiagnosticKind, message: impl Into<String>, ids: Vec<String>) {
        self.push(Severity::Info, kind, message, ids);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SizingStrategy {
    /// Only the sheet exists; it takes the unit square.
    Direct,
    ExternalTool,
    Proportional,
}

/// Run-level quality record, always returned with the outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub containers: usize,
    pub elements: usize,
    pub connectors: usize,
    pub sizing_strategy: Option<SizingStrategy>,
    pub external_tool_failures: usize,
    pub containers_shrunk: usize,
    pub containment_corrections: usize,
    pub placed_by_hint: usize,
    pub placed_by_search: usize,
    pub fallback_placements: usize,
    /// Containers whose requirement grew after a fallback placement.
    pub containers_flagged_for_resize: Vec<String>,
    pub collisions_resolved: usize,
    pub remaining_overlaps: usize,
    pub hooks_assigned: usize,
    pub connector_bends: usize,
    pub connector_length: f32,
    pub connector_element_crossings: usize,
    pub compaction_shifts: usize,
}

impl Default for QualityMetrics {
    fn default() -> Self {
        Self {
            containers: 0,
            elements: 0,
            connectors: 0,
            sizing_strategy: None,
            external_tool_failures: 0,
            containers_shrunk: 0,
            containment_corrections: 0,
            placed_by_hint: 0,
            placed_by_search: 0,
            fallback_placements: 0,
            containers_flagged_for_resize: Vec::new(),
            collisions_resolved: 0,
            remaining_overlaps: 0,
            hooks_assigned: 0,
            connector_bends: 0,
            connector_length: 0.0,
            connector_element_crossings: 0,
            compaction_shifts: 0,
        }
    }
}
