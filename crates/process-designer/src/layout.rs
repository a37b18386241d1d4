//! Layout engine
//!
//! Position computation for inserted nodes, the coarse downward re-layout
//! applied after an insertion, connection curve geometry, and the pan/zoom
//! viewport transform.
//!
//! The re-layout is deliberately simple: everything strictly below the
//! split source moves down by a fixed amount. It assumes a top-to-bottom
//! flow and does not try to untangle siblings sharing a vertical band or
//! back-edges.

use serde::{Deserialize, Serialize};

use crate::types::{Position, ProcessNode};

/// Fixed node geometry and spacing, in logical units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutMetrics {
    pub node_width: f64,
    /// Minimum rendered height of a node
    pub node_height: f64,
    pub vertical_spacing: f64,
    /// Horizontal distance of each branch from its decision node
    pub branch_spacing: f64,
    /// Upper bound of the random offset added to palette placements
    pub palette_jitter: f64,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            node_width: 180.0,
            node_height: 70.0,
            vertical_spacing: 100.0,
            branch_spacing: 200.0,
            palette_jitter: 10.0,
        }
    }
}

impl LayoutMetrics {
    /// Downward shift applied after a single-node split
    pub fn simple_shift(&self) -> f64 {
        self.node_height + self.vertical_spacing
    }

    /// Downward shift applied after a branch split
    pub fn branch_shift(&self) -> f64 {
        (self.vertical_spacing * 2.0) + (self.node_height * 2.0)
    }

    /// Vertical distance of Bézier control points from their endpoints
    pub fn control_offset(&self) -> f64 {
        self.vertical_spacing / 1.5
    }

    /// Top-left position that centres a node on `center`
    pub fn anchor_at(&self, center: Position) -> Position {
        center.offset(-self.node_width / 2.0, -self.node_height / 2.0)
    }

    /// Bottom-centre of a node, where outgoing connections leave
    pub fn bottom_center(&self, node_position: Position) -> Position {
        node_position.offset(self.node_width / 2.0, self.node_height)
    }

    /// Top-centre of a node, where incoming connections arrive
    pub fn top_center(&self, node_position: Position) -> Position {
        node_position.offset(self.node_width / 2.0, 0.0)
    }
}

/// Midpoint between two positions
pub fn midpoint(a: Position, b: Position) -> Position {
    Position::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

/// Position for a palette-added node: the staged click point plus jitter
///
/// `jitter` components are expected in `[0, 1)` and are scaled by the
/// configured maximum.
pub fn palette_position(staged: Position, jitter: (f64, f64), metrics: &LayoutMetrics) -> Position {
    staged.offset(jitter.0 * metrics.palette_jitter, jitter.1 * metrics.palette_jitter)
}

/// Shift every node strictly below `anchor_y` down by `shift`
pub fn relayout(nodes: Vec<ProcessNode>, anchor_y: f64, shift: f64) -> Vec<ProcessNode> {
    nodes
        .into_iter()
        .map(|mut node| {
            if node.position.y > anchor_y {
                node.position.y += shift;
            }
            node
        })
        .collect()
}

/// Positions of the four nodes created by a branch insertion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchLayout {
    pub decision: Position,
    pub branch_a: Position,
    pub branch_b: Position,
    pub merge: Position,
}

impl BranchLayout {
    /// Lay out a decision/branch/merge construct around the split midpoint
    pub fn around(mid: Position, metrics: &LayoutMetrics) -> Self {
        let half_width = metrics.node_width / 2.0;
        let branch_y = mid.y + metrics.vertical_spacing;
        Self {
            decision: metrics.anchor_at(mid),
            branch_a: Position::new(mid.x - metrics.branch_spacing - half_width, branch_y),
            branch_b: Position::new(mid.x + metrics.branch_spacing - half_width, branch_y),
            merge: Position::new(
                mid.x - half_width,
                mid.y + (metrics.vertical_spacing * 2.0) + metrics.node_height,
            ),
        }
    }
}

/// Cubic Bézier curve of a rendered connection
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConnectionPath {
    pub start: Position,
    pub control1: Position,
    pub control2: Position,
    pub end: Position,
}

impl ConnectionPath {
    /// Curve from the source's bottom-centre to the target's top-centre
    pub fn between(source: Position, target: Position, metrics: &LayoutMetrics) -> Self {
        let start = metrics.bottom_center(source);
        let end = metrics.top_center(target);
        let offset = metrics.control_offset();
        Self {
            start,
            control1: start.offset(0.0, offset),
            control2: end.offset(0.0, -offset),
            end,
        }
    }

    /// Point on the curve at parameter `t` in `[0, 1]`
    pub fn point_at(&self, t: f64) -> Position {
        let u = 1.0 - t;
        let w0 = u * u * u;
        let w1 = 3.0 * u * u * t;
        let w2 = 3.0 * u * t * t;
        let w3 = t * t * t;
        Position::new(
            w0 * self.start.x + w1 * self.control1.x + w2 * self.control2.x + w3 * self.end.x,
            w0 * self.start.y + w1 * self.control1.y + w2 * self.control2.y + w3 * self.end.y,
        )
    }

    /// Where the insert-node button sits
    pub fn handle_position(&self) -> Position {
        self.point_at(0.5)
    }

    /// Where a connection label is drawn: the straight midpoint, lifted by 8
    pub fn label_position(&self) -> Position {
        midpoint(self.start, self.end).offset(0.0, -8.0)
    }

    /// SVG path data for this curve
    pub fn to_svg(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }
}

/// Zoom limits and initial viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewportSettings {
    pub initial_zoom: f64,
    pub initial_pan: Position,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            initial_zoom: 0.8,
            initial_pan: Position::new(100.0, 50.0),
            min_zoom: 0.5,
            max_zoom: 2.0,
            zoom_step: 0.1,
        }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl ViewportSettings {
    /// Describe the first setting that cannot drive a viewport
    pub fn check(&self) -> Result<(), String> {
        for (name, value) in [
            ("minZoom", self.min_zoom),
            ("maxZoom", self.max_zoom),
            ("initialZoom", self.initial_zoom),
            ("zoomStep", self.zoom_step),
        ] {
            if !positive(value) {
                return Err(format!("{} must be a positive number, got {}", name, value));
            }
        }
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "minZoom ({}) is greater than maxZoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }
        if !self.initial_pan.x.is_finite() || !self.initial_pan.y.is_finite() {
            return Err("initialPan must be finite".into());
        }
        Ok(())
    }

    /// Replace unusable values with defaults and order the zoom bounds
    pub fn normalized(self) -> Self {
        let defaults = Self::default();
        let pick = |value: f64, fallback: f64| if positive(value) { value } else { fallback };

        let a = pick(self.min_zoom, defaults.min_zoom);
        let b = pick(self.max_zoom, defaults.max_zoom);
        let (min_zoom, max_zoom) = if a <= b { (a, b) } else { (b, a) };
        let initial_pan = if self.initial_pan.x.is_finite() && self.initial_pan.y.is_finite() {
            self.initial_pan
        } else {
            defaults.initial_pan
        };

        Self {
            initial_zoom: pick(self.initial_zoom, defaults.initial_zoom).clamp(min_zoom, max_zoom),
            initial_pan,
            min_zoom,
            max_zoom,
            zoom_step: pick(self.zoom_step, defaults.zoom_step),
        }
    }
}

/// Pan/zoom transform between screen and logical coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pan: Position,
    zoom: f64,
    settings: ViewportSettings,
}

// Removes the drift accumulated by repeated 0.1 steps
fn round_zoom(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

impl Viewport {
    pub fn new(settings: ViewportSettings) -> Self {
        let settings = settings.normalized();
        Self {
            pan: settings.initial_pan,
            zoom: round_zoom(settings.initial_zoom),
            settings,
        }
    }

    pub fn pan(&self) -> Position {
        self.pan
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Zoom as a whole percentage, for display
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    pub fn zoom_in(&mut self) {
        self.zoom = round_zoom((self.zoom + self.settings.zoom_step).min(self.settings.max_zoom));
    }

    pub fn zoom_out(&mut self) {
        self.zoom = round_zoom((self.zoom - self.settings.zoom_step).max(self.settings.min_zoom));
    }

    pub fn set_pan(&mut self, pan: Position) {
        self.pan = pan;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan = self.pan.offset(dx, dy);
    }

    /// Convert a canvas-relative screen point to logical coordinates
    pub fn screen_to_logical(&self, screen: Position) -> Position {
        Position::new((screen.x - self.pan.x) / self.zoom, (screen.y - self.pan.y) / self.zoom)
    }

    /// Convert a logical point to canvas-relative screen coordinates
    pub fn logical_to_screen(&self, logical: Position) -> Position {
        Position::new(logical.x * self.zoom + self.pan.x, logical.y * self.zoom + self.pan.y)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;

    fn node_at(id: &str, y: f64) -> ProcessNode {
        ProcessNode::new(id, NodeKind::Task, id, Position::new(0.0, y))
    }

    #[test]
    fn test_relayout_shifts_only_nodes_below_anchor() {
        let nodes = vec![node_at("above", 50.0), node_at("level", 100.0), node_at("below", 300.0)];
        let shifted = relayout(nodes, 100.0, 170.0);

        assert_eq!(shifted[0].position.y, 50.0);
        assert_eq!(shifted[1].position.y, 100.0);
        assert_eq!(shifted[2].position.y, 470.0);
    }

    #[test]
    fn test_shift_amounts() {
        let metrics = LayoutMetrics::default();
        assert_eq!(metrics.simple_shift(), 170.0);
        assert_eq!(metrics.branch_shift(), 340.0);
    }

    #[test]
    fn test_branch_layout() {
        let metrics = LayoutMetrics::default();
        let layout = BranchLayout::around(Position::new(400.0, 200.0), &metrics);

        assert_eq!(layout.decision, Position::new(310.0, 165.0));
        assert_eq!(layout.branch_a, Position::new(110.0, 300.0));
        assert_eq!(layout.branch_b, Position::new(510.0, 300.0));
        assert_eq!(layout.merge, Position::new(310.0, 470.0));
    }

    #[test]
    fn test_connection_path_endpoints() {
        let metrics = LayoutMetrics::default();
        let path = ConnectionPath::between(Position::new(400.0, 100.0), Position::new(400.0, 300.0), &metrics);

        assert_eq!(path.start, Position::new(490.0, 170.0));
        assert_eq!(path.end, Position::new(490.0, 300.0));
        assert_eq!(path.point_at(0.0), path.start);
        assert_eq!(path.point_at(1.0), path.end);

        // Vertically aligned nodes: the curve midpoint is the straight midpoint
        let handle = path.handle_position();
        assert!((handle.x - 490.0).abs() < 1e-9);
        assert!((handle.y - 235.0).abs() < 1e-9);
        assert_eq!(path.label_position(), Position::new(490.0, 227.0));
        assert!(path.to_svg().starts_with("M 490 170 C 490"));
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut viewport = Viewport::default();
        assert_eq!(viewport.zoom(), 0.8);

        for _ in 0..20 {
            viewport.zoom_in();
        }
        assert_eq!(viewport.zoom(), 2.0);

        for _ in 0..30 {
            viewport.zoom_out();
        }
        assert_eq!(viewport.zoom(), 0.5);

        viewport.zoom_in();
        assert_eq!(viewport.zoom(), 0.6);
        assert_eq!(viewport.zoom_percent(), 60);
    }

    #[test]
    fn test_unusable_zoom_settings_are_normalized() {
        let inverted = ViewportSettings {
            min_zoom: 3.0,
            ..ViewportSettings::default()
        };
        assert!(inverted.check().is_err());
        let viewport = Viewport::new(inverted);
        assert_eq!(viewport.zoom(), 2.0);

        let broken = ViewportSettings {
            initial_zoom: 0.0,
            min_zoom: f64::NAN,
            max_zoom: -1.0,
            zoom_step: f64::INFINITY,
            ..ViewportSettings::default()
        };
        assert!(broken.check().is_err());
        let mut viewport = Viewport::new(broken);
        assert_eq!(viewport.zoom(), 0.8);
        viewport.zoom_in();
        assert_eq!(viewport.zoom(), 0.9);

        let logical = viewport.screen_to_logical(Position::new(190.0, 140.0));
        assert!(logical.x.is_finite() && logical.y.is_finite());
        assert!(ViewportSettings::default().check().is_ok());
    }

    #[test]
    fn test_screen_logical_round_trip() {
        let mut viewport = Viewport::default();
        viewport.pan_by(20.0, -10.0);

        let screen = Position::new(300.0, 240.0);
        let logical = viewport.screen_to_logical(screen);
        assert_eq!(logical, Position::new((300.0 - 120.0) / 0.8, (240.0 - 40.0) / 0.8));

        let back = viewport.logical_to_screen(logical);
        assert!((back.x - screen.x).abs() < 1e-9);
        assert!((back.y - screen.y).abs() < 1e-9);
    }

    #[test]
    fn test_palette_position_jitter_is_bounded() {
        let metrics = LayoutMetrics::default();
        let staged = Position::new(50.0, 60.0);
        let placed = palette_position(staged, (0.999, 0.0), &metrics);
        assert!(placed.x >= 50.0 && placed.x < 60.0);
        assert_eq!(placed.y, 60.0);
    }
}
