use serde::{Deserialize, Serialize};

/// Tunable drag policy shared by the state machine and the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragOptions {
    /// Pointer travel (in layout units) that turns an armed press into a drag.
    /// The distance must be strictly greater than this to count.
    pub threshold: f32,
    /// Fraction of a block's height, at each edge, that reorders rather than
    /// nests. Clamped to `[0, 0.5]`; at 0.5 nesting by drop is disabled.
    pub edge_band: f32,
    /// Whether dropping onto the middle of a container block may re-parent.
    pub allow_nesting: bool,
}

impl Default for DragOptions {
    fn default() -> Self {
        Self {
            threshold: 5.0,
            edge_band: 0.25,
            allow_nesting: true,
        }
    }
}

impl DragOptions {
    /// Edge band clamped to its meaningful range
    pub fn clamped_edge_band(&self) -> f32 {
        if self.edge_band.is_nan() {
            return 0.5;
        }
        self.edge_band.clamp(0.0, 0.5)
    }
}
