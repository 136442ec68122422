//! # Document Tree Model
//!
//! An ordered forest of blocks keyed by stable [`BlockId`]. The tree stores
//! structure only (parent links, ordered child lists, an opaque kind and host
//! text); geometry lives with the renderer.
//!
//! ## Invariants
//!
//! - every id is unique across the tree
//! - each block sits in exactly one child list (its parent's, or the roots)
//! - a block's `parent` agrees with the list it sits in
//! - no block is its own ancestor
//!
//! [`DocumentTree::move_block`] is the only structural mutation this crate
//! performs and it either fully succeeds or leaves the tree untouched.

mod outline;
mod target;


pub use outline::format_tree;
pub use target::{DropTarget, Relation};

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{BoundsError, BoundsProvider, Rect};

/// Stable, opaque identifier of a block
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What a block is. Only [`BlockKind::accepts_children`] matters to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
    /// Bullet list item
    ListItem,
    /// Numbered list item; `start` is the number its list begins at
    OrderedItem { start: u64 },
    BlockQuote,
    CodeBlock { language: Option<String> },
    /// Raw HTML block, kept verbatim
    Html,
    ThematicBreak,
}

impl BlockKind {
    /// Whether a drop may re-parent another block into this one
    pub fn accepts_children(&self) -> bool {
        matches!(
            self,
            BlockKind::ListItem | BlockKind::OrderedItem { .. } | BlockKind::BlockQuote
        )
    }

    pub fn is_list_item(&self) -> bool {
        matches!(self, BlockKind::ListItem | BlockKind::OrderedItem { .. })
    }
}

/// A block in the document tree
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Host-owned text content, never interpreted here
    pub text: String,
    parent: Option<BlockId>,
    children: Vec<BlockId>,
}

impl Block {
    pub fn parent(&self) -> Option<&BlockId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[BlockId] {
        &self.children
    }
}

/// A slot in a sibling list: `parent` of `None` means the top level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub parent: Option<BlockId>,
    pub index: usize,
}

/// What a committed move did, in enough detail for a host undo stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub block: BlockId,
    pub from: Position,
    pub to: Position,
}

impl MoveRecord {
    /// The block ended up exactly where it started
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidTarget {
    #[error("anchor {0} does not exist")]
    AnchorMissing(BlockId),
    #[error("anchor is the dragged block itself")]
    AnchorIsDragged,
    #[error("anchor {0} lies inside the dragged subtree")]
    AnchorInsideDragged(BlockId),
    #[error("anchor {0} does not accept children")]
    AnchorRejectsChildren(BlockId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("block {0} not found")]
    BlockNotFound(BlockId),
    #[error("invalid drop target: {0}")]
    InvalidTarget(#[from] InvalidTarget),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("duplicate block id {0}")]
    DuplicateId(BlockId),
    #[error("parent block {0} not found")]
    ParentNotFound(BlockId),
    #[error("child {0} is listed but has no block")]
    DanglingChild(BlockId),
    #[error("block {0} appears in more than one child list")]
    Shared(BlockId),
    #[error("block {block} records parent {recorded:?} but is listed under {listed:?}")]
    ParentMismatch {
        block: BlockId,
        recorded: Option<BlockId>,
        listed: Option<BlockId>,
    },
    #[error("block {0} is not reachable from the roots")]
    Unreachable(BlockId),
    #[error("block {0} cannot be written as markdown without changing the outline")]
    NotRepresentable(BlockId),
}

/// Ordered forest of blocks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentTree {
    roots: Vec<BlockId>,
    blocks: HashMap<BlockId, Block>,
    /// Link reference definitions (`[label]: url`), which belong to no block
    definitions: Vec<String>,
}

impl DocumentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Top-level blocks in order
    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    pub fn definitions(&self) -> &[String] {
        &self.definitions
    }

    pub fn get(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.blocks.contains_key(id)
    }

    /// Insert a new leaf block at `index` (clamped) under `parent`.
    ///
    /// This is the host-side edit used to build documents; it does not check
    /// `accepts_children`, only identity and parent existence.
    pub fn insert(
        &mut self,
        parent: Option<&BlockId>,
        index: usize,
        id: BlockId,
        kind: BlockKind,
        text: impl Into<String>,
    ) -> Result<(), TreeError> {
        if self.blocks.contains_key(&id) {
            return Err(TreeError::DuplicateId(id));
        }

        let siblings = match parent {
            None => &mut self.roots,
            Some(parent_id) => {
                &mut self
                    .blocks
                    .get_mut(parent_id)
                    .ok_or_else(|| TreeError::ParentNotFound(parent_id.clone()))?
                    .children
            }
        };
        let index = index.min(siblings.len());
        siblings.insert(index, id.clone());

        self.blocks.insert(
            id.clone(),
            Block {
                id,
                kind,
                text: text.into(),
                parent: parent.cloned(),
                children: Vec::new(),
            },
        );
        Ok(())
    }

    /// Append a block with a freshly generated id as the last child of `parent`
    pub fn push(
        &mut self,
        parent: Option<&BlockId>,
        kind: BlockKind,
        text: impl Into<String>,
    ) -> Result<BlockId, TreeError> {
        let id = BlockId::generate();
        self.insert(parent, usize::MAX, id.clone(), kind, text)?;
        Ok(id)
    }

    /// Sibling list under `parent`, or the roots for `None`
    pub fn children_of(&self, parent: Option<&BlockId>) -> Option<&[BlockId]> {
        match parent {
            None => Some(&self.roots),
            Some(id) => self.blocks.get(id).map(|block| block.children.as_slice()),
        }
    }

    pub fn parent_of(&self, id: &BlockId) -> Option<&BlockId> {
        self.blocks.get(id).and_then(|block| block.parent.as_ref())
    }

    /// Current slot of a block
    pub fn position_of(&self, id: &BlockId) -> Option<Position> {
        let parent = self.blocks.get(id)?.parent.clone();
        let index = self
            .children_of(parent.as_ref())?
            .iter()
            .position(|sibling| sibling == id)?;
        Some(Position { parent, index })
    }

    /// Number of ancestors (0 for top-level blocks)
    pub fn depth(&self, id: &BlockId) -> Option<usize> {
        let mut block = self.blocks.get(id)?;
        let mut depth = 0;
        while let Some(parent) = block.parent.as_ref() {
            block = self.blocks.get(parent)?;
            depth += 1;
            if depth > self.blocks.len() {
                return None;
            }
        }
        Some(depth)
    }

    /// True iff `candidate` is `ancestor` or lies anywhere beneath it
    pub fn is_descendant(&self, ancestor: &BlockId, candidate: &BlockId) -> bool {
        if !self.contains(ancestor) {
            return false;
        }

        let mut current = self.blocks.get(candidate);
        let mut steps = 0;
        while let Some(block) = current {
            if &block.id == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.blocks.len() {
                return false;
            }
            current = block.parent.as_ref().and_then(|id| self.blocks.get(id));
        }
        false
    }

    /// All blocks in pre-order (parents before children, siblings in order)
    pub fn document_order(&self) -> Vec<&Block> {
        let mut ordered = Vec::with_capacity(self.blocks.len());
        let mut stack: Vec<&BlockId> = self.roots.iter().rev().collect();
        while let Some(id) = stack.pop() {
            if let Some(block) = self.blocks.get(id) {
                ordered.push(block);
                stack.extend(block.children.iter().rev());
            }
        }
        ordered
    }

    /// A block and all its descendants, in pre-order
    pub fn subtree(&self, id: &BlockId) -> Vec<BlockId> {
        let mut ids = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(block) = self.blocks.get(current) {
                ids.push(current.clone());
                stack.extend(block.children.iter().rev());
            }
        }
        ids
    }

    /// First block in document order whose text equals `text`
    pub fn find_text(&self, text: &str) -> Option<BlockId> {
        self.document_order()
            .into_iter()
            .find(|block| block.text == text)
            .map(|block| block.id.clone())
    }

    /// Bounds of a block as currently laid out by the renderer
    pub fn bounds<L: BoundsProvider + ?Sized>(
        &self,
        layout: &L,
        id: &BlockId,
    ) -> Result<Rect, BoundsError> {
        if !self.contains(id) {
            return Err(BoundsError::NotFound(id.clone()));
        }
        layout.bounds(id)
    }

    /// Build the concrete drop target for `relation` against `anchor`
    pub fn target_for(
        &self,
        anchor: &BlockId,
        relation: Relation,
    ) -> Result<DropTarget, InvalidTarget> {
        let missing = || InvalidTarget::AnchorMissing(anchor.clone());
        let anchor_block = self.blocks.get(anchor).ok_or_else(missing)?;
        let depth = self.depth(anchor).ok_or_else(missing)?;

        let (index, depth) = match relation {
            Relation::Before | Relation::After => {
                let position = self.position_of(anchor).ok_or_else(missing)?;
                let index = position.index + usize::from(relation == Relation::After);
                (index, depth)
            }
            Relation::InsertInto => {
                if !anchor_block.kind.accepts_children() {
                    return Err(InvalidTarget::AnchorRejectsChildren(anchor.clone()));
                }
                (anchor_block.children.len(), depth + 1)
            }
        };

        Ok(DropTarget {
            anchor: anchor.clone(),
            relation,
            index,
            depth,
        })
    }

    /// Move `block` (with its subtree) to `target`.
    ///
    /// Every check runs before the first mutation, so an error leaves the tree
    /// exactly as it was. The destination parent comes from the anchor and
    /// relation; `target.index` is a pre-move gap index, clamped to the list.
    pub fn move_block(
        &mut self,
        block: &BlockId,
        target: &DropTarget,
    ) -> Result<MoveRecord, MoveError> {
        let from = self
            .position_of(block)
            .ok_or_else(|| MoveError::BlockNotFound(block.clone()))?;

        let anchor = &target.anchor;
        if anchor == block {
            return Err(InvalidTarget::AnchorIsDragged.into());
        }
        let anchor_block = self
            .blocks
            .get(anchor)
            .ok_or_else(|| InvalidTarget::AnchorMissing(anchor.clone()))?;
        if self.is_descendant(block, anchor) {
            return Err(InvalidTarget::AnchorInsideDragged(anchor.clone()).into());
        }

        let parent = match target.relation {
            Relation::Before | Relation::After => anchor_block.parent.clone(),
            Relation::InsertInto => {
                if !anchor_block.kind.accepts_children() {
                    return Err(InvalidTarget::AnchorRejectsChildren(anchor.clone()).into());
                }
                Some(anchor.clone())
            }
        };

        // Both lists must be reachable before anything is detached
        if self.children_of(parent.as_ref()).is_none() {
            return Err(InvalidTarget::AnchorMissing(anchor.clone()).into());
        }

        let mut index = target.index;
        if parent == from.parent && from.index < index {
            index -= 1;
        }

        if let Some(siblings) = self.siblings_mut(from.parent.as_ref()) {
            siblings.remove(from.index);
        }
        let mut landed = 0;
        if let Some(siblings) = self.siblings_mut(parent.as_ref()) {
            landed = index.min(siblings.len());
            siblings.insert(landed, block.clone());
        }
        if let Some(moved) = self.blocks.get_mut(block) {
            moved.parent = parent.clone();
        }

        Ok(MoveRecord {
            block: block.clone(),
            from,
            to: Position {
                parent,
                index: landed,
            },
        })
    }

    /// Check every structural invariant
    pub fn validate(&self) -> Result<(), TreeError> {
        let mut seen = HashSet::with_capacity(self.blocks.len());
        let mut stack: Vec<(&BlockId, Option<&BlockId>)> =
            self.roots.iter().rev().map(|id| (id, None)).collect();

        while let Some((id, listed)) = stack.pop() {
            let block = self
                .blocks
                .get(id)
                .ok_or_else(|| TreeError::DanglingChild(id.clone()))?;
            if !seen.insert(id) {
                return Err(TreeError::Shared(id.clone()));
            }
            if block.parent.as_ref() != listed {
                return Err(TreeError::ParentMismatch {
                    block: id.clone(),
                    recorded: block.parent.clone(),
                    listed: listed.cloned(),
                });
            }
            stack.extend(block.children.iter().rev().map(|child| (child, Some(id))));
        }

        if seen.len() != self.blocks.len() {
            let mut unreachable: Vec<&BlockId> = self
                .blocks
                .keys()
                .filter(|id| !seen.contains(id))
                .collect();
            unreachable.sort();
            if let Some(id) = unreachable.first() {
                return Err(TreeError::Unreachable((*id).clone()));
            }
        }
        Ok(())
    }

    fn siblings_mut(&mut self, parent: Option<&BlockId>) -> Option<&mut Vec<BlockId>> {
        match parent {
            None => Some(&mut self.roots),
            Some(id) => self.blocks.get_mut(id).map(|block| &mut block.children),
        }
    }
}
