use serde::Serialize;
use tracing::{error, info};

use super::collision::CollisionPhase;
use super::compaction::CompactionPhase;
use super::context::LayoutContext;
use super::diagnostics::{
    Diagnostic, DiagnosticKind, PhaseReport, PhaseStatus, QualityMetrics, RunStatus, Severity,
};
use super::error::{ConfigError, LayoutError};
use super::hierarchy::{derive_connectors, extract_hierarchy};
use super::hooks::HookPhase;
use super::measure::MeasurePhase;
use super::output::{LayoutOutput, build_output};
use super::positioning::PositioningPhase;
use super::routing::RoutingPhase;
use super::sizing::{ClusterSizer, ExternalToolSizer, ProportionalSizer, SizingPhase};
use super::spatial::RequirementsPhase;
use crate::config::Config;
use crate::ir::LogicalGraph;

/// One step of the layout pipeline. Phases communicate only through the
/// run context.
pub trait LayoutPhase {
    fn name(&self) -> &'static str;

    /// Phases that must have completed before this one runs.
    fn depends_on(&self) -> &'static [&'static str];

    fn run(&self, ctx: &mut LayoutContext<'_>, report: &mut PhaseReport) -> Result<(), LayoutError>;
}

/// Phases in execution order.
pub struct Pipeline<'p> {
    phases: Vec<Box<dyn LayoutPhase + 'p>>,
}

impl<'p> Pipeline<'p> {
    /// Orders phases so every dependency runs first. Among ready phases the
    /// declaration order wins.
    pub fn new(mut pending: Vec<Box<dyn LayoutPhase + 'p>>) -> Result<Self, LayoutError> {
        let declared: Vec<&'static str> = pending.iter().map(|phase| phase.name()).collect();
        for phase in &pending {
            if let Some(missing) = phase
                .depends_on()
                .iter()
                .find(|dep| !declared.contains(dep))
            {
                return Err(LayoutError::PhaseOrder {
                    phase: phase.name().to_string(),
                    dependency: missing.to_string(),
                });
            }
        }

        let mut ordered: Vec<Box<dyn LayoutPhase + 'p>> = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let done: Vec<&'static str> = ordered.iter().map(|phase| phase.name()).collect();
            let ready = pending
                .iter()
                .position(|phase| phase.depends_on().iter().all(|dep| done.contains(dep)));
            match ready {
                Some(idx) => ordered.push(pending.remove(idx)),
                None => {
                    let blocked = &pending[0];
                    let dependency = blocked
                        .depends_on()
                        .iter()
                        .find(|dep| !done.contains(dep))
                        .map(|dep| dep.to_string())
                        .unwrap_or_default();
                    return Err(LayoutError::PhaseOrder {
                        phase: blocked.name().to_string(),
                        dependency,
                    });
                }
            }
        }
        Ok(Self { phases: ordered })
    }

    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|phase| phase.name()).collect()
    }

    /// Runs the phases one at a time. The first failure stops the run; the
    /// phases after it are reported as skipped.
    pub fn execute(&self, ctx: &mut LayoutContext<'_>) -> (RunStatus, Vec<PhaseReport>) {
        let mut reports = Vec::with_capacity(self.phases.len());
        let mut status = RunStatus::Completed;
        for phase in &self.phases {
            if status == RunStatus::Failed {
                reports.push(PhaseReport::skipped(phase.name()));
                continue;
            }
            let mut report = PhaseReport::new(phase.name());
            match phase.run(ctx, &mut report) {
                Ok(()) => {
                    info!(phase = phase.name(), diagnostics = report.diagnostics.len(), "phase completed");
                }
                Err(err) => {
                    error!(phase = phase.name(), error = %err, "phase failed");
                    report.status = PhaseStatus::Failed;
                    report.push(Severity::Error, failure_kind(&err), err.to_string(), failure_ids(&err));
                    status = RunStatus::Failed;
                }
            }
            reports.push(report);
        }
        (status, reports)
    }
}

fn failure_kind(err: &LayoutError) -> DiagnosticKind {
    match err {
        LayoutError::Containment(_) => DiagnosticKind::ContainmentViolation,
        LayoutError::Config(_) | LayoutError::PhaseOrder { .. } => DiagnosticKind::Configuration,
    }
}

fn failure_ids(err: &LayoutError) -> Vec<String> {
    match err {
        LayoutError::Containment(violation) => violation.ids(),
        LayoutError::Config(config) => config.ids(),
        LayoutError::PhaseOrder { phase, dependency } => vec![phase.clone(), dependency.clone()],
    }
}

/// Result of a run, returned whether it completed or failed.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutOutcome {
    pub status: RunStatus,
    pub phases: Vec<PhaseReport>,
    pub metrics: QualityMetrics,
    pub output: LayoutOutput,
}

impl LayoutOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.phases.iter().flat_map(|phase| phase.diagnostics.iter())
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseReport> {
        self.phases.iter().find(|phase| phase.name == name)
    }
}

/// Layout engine with its sizing strategy fixed at construction.
pub struct LayoutEngine {
    config: Config,
    sizer: Box<dyn ClusterSizer>,
}

impl LayoutEngine {
    /// Uses the external tool when it is enabled in `config`, proportional
    /// allocation otherwise.
    pub fn new(config: Config) -> Self {
        let sizer: Box<dyn ClusterSizer> = if config.layout.external_tool.enabled {
            Box::new(ExternalToolSizer::new(config.layout.external_tool.clone()))
        } else {
            Box::new(ProportionalSizer)
        };
        Self { config, sizer }
    }

    pub fn with_sizer(config: Config, sizer: Box<dyn ClusterSizer>) -> Self {
        Self { config, sizer }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sizer_name(&self) -> &'static str {
        self.sizer.name()
    }

    fn pipeline(&self) -> Result<Pipeline<'_>, LayoutError> {
        let phases: Vec<Box<dyn LayoutPhase + '_>> = vec![
            Box::new(MeasurePhase),
            Box::new(RequirementsPhase),
            Box::new(SizingPhase {
                sizer: self.sizer.as_ref(),
            }),
            Box::new(PositioningPhase),
            Box::new(CollisionPhase),
            Box::new(HookPhase),
            Box::new(RoutingPhase),
            Box::new(CompactionPhase),
        ];
        Pipeline::new(phases)
    }

    /// Lays out `graph`. Malformed input is returned as an error before any
    /// phase runs; every other outcome, failed runs included, comes back as
    /// a [`LayoutOutcome`].
    pub fn run(&self, graph: &LogicalGraph) -> Result<LayoutOutcome, ConfigError> {
        let hierarchy = extract_hierarchy(graph)?;
        let connectors = derive_connectors(graph, &hierarchy)?;
        let canvas = (self.config.render.width, self.config.render.height);
        let mut ctx = LayoutContext::new(graph, &self.config.layout, canvas, hierarchy, connectors);

        let (status, phases) = match self.pipeline() {
            Ok(pipeline) => pipeline.execute(&mut ctx),
            Err(err) => {
                let mut report = PhaseReport::new("pipeline");
                report.status = PhaseStatus::Failed;
                report.push(Severity::Error, failure_kind(&err), err.to_string(), failure_ids(&err));
                (RunStatus::Failed, vec![report])
            }
        };
        info!(status = ?status, sizer = self.sizer.name(), "layout run finished");

        let output = build_output(&ctx, &self.config.render);
        Ok(LayoutOutcome {
            status,
            phases,
            metrics: ctx.metrics,
            output,
        })
    }
}
