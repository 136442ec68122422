//! Pointer and layout geometry.
//!
//! The tree stores structure only. Bounds come from whoever renders the
//! blocks, through [`BoundsProvider`], and must reflect the layout at call
//! time; nothing here caches rectangles across ticks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tree::{BlockId, DocumentTree};

/// A pointer position in layout coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned bounding box of a rendered block
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn mid_y(&self) -> f32 {
        self.y + self.height / 2.0
    }

    /// Top edge inclusive, bottom edge exclusive, so stacked rows never overlap
    pub fn contains_y(&self, y: f32) -> bool {
        y >= self.top() && y < self.bottom()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoundsError {
    #[error("no layout for block {0}")]
    NotFound(BlockId),
}

/// Geometry lookup supplied by the rendering collaborator.
pub trait BoundsProvider {
    fn bounds(&self, id: &BlockId) -> Result<Rect, BoundsError>;
}

impl<T: BoundsProvider + ?Sized> BoundsProvider for &T {
    fn bounds(&self, id: &BlockId) -> Result<Rect, BoundsError> {
        (**self).bounds(id)
    }
}

/// Plain map of block rectangles, filled by a host after each layout pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutMap {
    rects: HashMap<BlockId, Rect>,
}

impl LayoutMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay every block out as one row, in document order, indented by depth.
    ///
    /// Rows are `row_height` tall starting at `top`; this is how list-style
    /// outliners (and the terminal host) position blocks.
    pub fn stacked(tree: &DocumentTree, top: f32, row_height: f32, indent: f32) -> Self {
        let mut layout = Self::new();
        for (row, block) in tree.document_order().into_iter().enumerate() {
            let depth = tree.depth(&block.id).unwrap_or(0);
            layout.insert(
                block.id.clone(),
                Rect::new(
                    depth as f32 * indent,
                    top + row as f32 * row_height,
                    f32::MAX,
                    row_height,
                ),
            );
        }
        layout
    }

    pub fn insert(&mut self, id: BlockId, rect: Rect) -> Option<Rect> {
        self.rects.insert(id, rect)
    }

    pub fn remove(&mut self, id: &BlockId) -> Option<Rect> {
        self.rects.remove(id)
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }
}

impl BoundsProvider for LayoutMap {
    fn bounds(&self, id: &BlockId) -> Result<Rect, BoundsError> {
        self.rects
            .get(id)
            .copied()
            .ok_or_else(|| BoundsError::NotFound(id.clone()))
    }
}
