use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureConfig {
    pub font_size: f32,
    pub line_height: f32,
    pub vertex_diameter: f32,
    pub vertex_label_gap: f32,
    pub predicate_padding_x: f32,
    pub predicate_padding_y: f32,
    /// Horizontal clearance reserved on each side of a predicate for hooks.
    pub hook_clearance: f32,
    /// Width used for predicates without text, in characters.
    pub empty_text_chars: usize,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            font_size: 14.0,
            line_height: 1.3,
            vertex_diameter: 10.0,
            vertex_label_gap: 4.0,
            predicate_padding_x: 6.0,
            predicate_padding_y: 4.0,
            hook_clearance: 8.0,
            empty_text_chars: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    /// Share of the root's interior kept for its own elements when it also
    /// holds nested containers.
    pub root_element_reserve: f32,
    /// Containers whose area exceeds this multiple of their requirement shrink.
    pub shrink_threshold: f32,
    /// Area multiple of the requirement a shrinking container aims for.
    pub shrink_target: f32,
    /// Lower bound on the area ratio kept by the shrink pass.
    pub min_shrink_factor: f32,
    pub containment_retries: usize,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            root_element_reserve: 0.04,
            shrink_threshold: 2.0,
            shrink_target: 1.5,
            min_shrink_factor: 0.3,
            containment_retries: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementConfig {
    pub max_attempts: usize,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self { max_attempts: 256 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookConfig {
    /// Radius of the fallback hook ring around hubs without bounds.
    pub ring_offset: f32,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self { ring_offset: 12.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStyle {
    Straight,
    Rectilinear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub style: RouteStyle,
    /// Width of the corridor reserved around each routed segment.
    pub corridor_width: f32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            style: RouteStyle::Rectilinear,
            corridor_width: 6.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalToolConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    pub timeout_ms: u64,
}

impl Default for ExternalToolConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: "dot".to_string(),
            args: vec!["-Tdot".to_string()],
            timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Padding between a container's outline and its contents.
    pub padding: f32,
    /// Gap kept between neighbouring elements and sibling containers.
    pub element_gap: f32,
    pub min_container_width: f32,
    pub min_container_height: f32,
    /// Preferred size growth over the minimum requirement.
    pub growth_width: f32,
    pub growth_height: f32,
    pub measure: MeasureConfig,
    pub sizing: SizingConfig,
    pub placement: PlacementConfig,
    pub hooks: HookConfig,
    pub routing: RoutingConfig,
    pub external_tool: ExternalToolConfig,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            padding: 12.0,
            element_gap: 8.0,
            min_container_width: 60.0,
            min_container_height: 40.0,
            growth_width: 0.2,
            growth_height: 0.1,
            measure: MeasureConfig::default(),
            sizing: SizingConfig::default(),
            placement: PlacementConfig::default(),
            hooks: HookConfig::default(),
            routing: RoutingConfig::default(),
            external_tool: ExternalToolConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    Unit,
    Absolute,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub space: CoordinateSpace,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            space: CoordinateSpace::Absolute,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutFile>,
    render: Option<RenderFile>,
    external_tool: Option<ExternalToolFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LayoutFile {
    padding: Option<f32>,
    element_gap: Option<f32>,
    min_container_width: Option<f32>,
    min_container_height: Option<f32>,
    growth_width: Option<f32>,
    growth_height: Option<f32>,
    font_size: Option<f32>,
    line_height: Option<f32>,
    vertex_diameter: Option<f32>,
    hook_clearance: Option<f32>,
    root_element_reserve: Option<f32>,
    shrink_threshold: Option<f32>,
    shrink_target: Option<f32>,
    min_shrink_factor: Option<f32>,
    containment_retries: Option<usize>,
    max_attempts: Option<usize>,
    hook_ring_offset: Option<f32>,
    route_style: Option<RouteStyle>,
    corridor_width: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RenderFile {
    width: Option<f32>,
    height: Option<f32>,
    space: Option<CoordinateSpace>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ExternalToolFile {
    enabled: Option<bool>,
    command: Option<String>,
    args: Option<Vec<String>>,
    timeout_ms: Option<u64>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let is_json5 = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json5"))
        .unwrap_or(false);
    let parsed: ConfigFile = if is_json5 {
        json5::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };
    apply_config_file(&mut config, parsed);
    Ok(config)
}

fn apply_config_file(config: &mut Config, parsed: ConfigFile) {
    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.padding {
            target.padding = v.max(0.0);
        }
        if let Some(v) = layout.element_gap {
            target.element_gap = v.max(0.0);
        }
        if let Some(v) = layout.min_container_width {
            target.min_container_width = v.max(1.0);
        }
        if let Some(v) = layout.min_container_height {
            target.min_container_height = v.max(1.0);
        }
        if let Some(v) = layout.growth_width {
            target.growth_width = v.max(0.0);
        }
        if let Some(v) = layout.growth_height {
            target.growth_height = v.max(0.0);
        }
        if let Some(v) = layout.font_size {
            target.measure.font_size = v.max(1.0);
        }
        if let Some(v) = layout.line_height {
            target.measure.line_height = v.max(0.5);
        }
        if let Some(v) = layout.vertex_diameter {
            target.measure.vertex_diameter = v.max(1.0);
        }
        if let Some(v) = layout.hook_clearance {
            target.measure.hook_clearance = v.max(0.0);
        }
        if let Some(v) = layout.root_element_reserve {
            target.sizing.root_element_reserve = v.clamp(0.0, 0.5);
        }
        if let Some(v) = layout.shrink_threshold {
            target.sizing.shrink_threshold = v.max(1.0);
        }
        if let Some(v) = layout.shrink_target {
            target.sizing.shrink_target = v.max(1.0);
        }
        if let Some(v) = layout.min_shrink_factor {
            target.sizing.min_shrink_factor = v.clamp(0.01, 1.0);
        }
        if let Some(v) = layout.containment_retries {
            target.sizing.containment_retries = v;
        }
        if let Some(v) = layout.max_attempts {
            target.placement.max_attempts = v.max(1);
        }
        if let Some(v) = layout.hook_ring_offset {
            target.hooks.ring_offset = v.max(0.0);
        }
        if let Some(v) = layout.route_style {
            target.routing.style = v;
        }
        if let Some(v) = layout.corridor_width {
            target.routing.corridor_width = v.max(0.0);
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v.max(1.0);
        }
        if let Some(v) = render.height {
            config.render.height = v.max(1.0);
        }
        if let Some(v) = render.space {
            config.render.space = v;
        }
    }

    if let Some(tool) = parsed.external_tool {
        let target = &mut config.layout.external_tool;
        if let Some(v) = tool.enabled {
            target.enabled = v;
        }
        if let Some(v) = tool.command {
            target.command = v;
        }
        if let Some(v) = tool.args {
            target.args = v;
        }
        if let Some(v) = tool.timeout_ms {
            target.timeout_ms = v;
        }
    }
}
