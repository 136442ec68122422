//! Markdown outline import/export.
//!
//! Hosts keep documents on disk as markdown; this turns the block structure
//! (headings, paragraphs, bullet and numbered list items, quotes, code and
//! HTML blocks, rules) into a [`DocumentTree`] and back. Inline markup is kept
//! as written, so links, emphasis and hard breaks survive a load/save cycle.

use std::fmt::Write;
use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

use super::{Block, BlockId, BlockKind, DocumentTree, TreeError};

/// An open markdown container while walking parser events
enum Frame {
    Block {
        id: BlockId,
        /// Code and HTML blocks collect their text verbatim
        raw: bool,
        /// Source range of the inline content seen so far
        inline: Option<Range<usize>>,
    },
    /// A list item's first paragraph, folded into the item's own text
    Merged,
    /// An open list, with its start number when numbered
    List(Option<u64>),
}

impl DocumentTree {
    /// Parse markdown into a tree, minting random block ids
    pub fn from_markdown(source: &str) -> Result<Self, TreeError> {
        Self::from_markdown_with_ids(source, BlockId::generate)
    }

    /// Parse markdown into a tree, taking ids from `next_id` in document order
    pub fn from_markdown_with_ids(
        source: &str,
        mut next_id: impl FnMut() -> BlockId,
    ) -> Result<Self, TreeError> {
        let mut tree = DocumentTree::new();
        let mut stack: Vec<Frame> = Vec::new();
        let mut parser = Parser::new(source).into_offset_iter();

        for (event, range) in parser.by_ref() {
            match event {
                Event::Start(tag) => {
                    let kind = match tag {
                        Tag::List(start) => {
                            stack.push(Frame::List(start));
                            continue;
                        }
                        Tag::Paragraph => {
                            if folds_into_item(&tree, &stack) {
                                stack.push(Frame::Merged);
                                continue;
                            }
                            BlockKind::Paragraph
                        }
                        Tag::Heading { level, .. } => BlockKind::Heading { level: level as u8 },
                        Tag::Item => match list_start(&stack) {
                            Some(start) => BlockKind::OrderedItem { start },
                            None => BlockKind::ListItem,
                        },
                        Tag::BlockQuote(_) => BlockKind::BlockQuote,
                        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => BlockKind::CodeBlock {
                            language: info.split_whitespace().next().map(str::to_string),
                        },
                        Tag::CodeBlock(CodeBlockKind::Indented) => {
                            BlockKind::CodeBlock { language: None }
                        }
                        Tag::HtmlBlock => BlockKind::Html,
                        // Emphasis, links, images: their source range is inline content
                        _ => {
                            extend_inline(&mut stack, range);
                            continue;
                        }
                    };
                    let raw = matches!(kind, BlockKind::CodeBlock { .. } | BlockKind::Html);
                    let id = next_id();
                    tree.insert(container(&stack), usize::MAX, id.clone(), kind, "")?;
                    stack.push(Frame::Block {
                        id,
                        raw,
                        inline: None,
                    });
                }
                Event::End(end) => match end {
                    TagEnd::Paragraph
                    | TagEnd::Heading(_)
                    | TagEnd::Item
                    | TagEnd::BlockQuote(_)
                    | TagEnd::CodeBlock
                    | TagEnd::HtmlBlock
                    | TagEnd::List(_) => {
                        if let Some(Frame::Block { id, inline, .. }) = stack.pop() {
                            finish_block(&mut tree, source, &id, inline);
                        }
                    }
                    _ => {}
                },
                Event::Text(text) | Event::Html(text) if in_raw_block(&stack) => {
                    append_raw(&mut tree, &stack, &text);
                }
                Event::Rule => {
                    tree.insert(
                        container(&stack),
                        usize::MAX,
                        next_id(),
                        BlockKind::ThematicBreak,
                        "",
                    )?;
                }
                _ => extend_inline(&mut stack, range),
            }
        }

        let mut spans: Vec<Range<usize>> = parser
            .reference_definitions()
            .iter()
            .map(|(_, definition)| definition.span.clone())
            .collect();
        spans.sort_by_key(|span| span.start);
        tree.definitions = spans
            .into_iter()
            .filter_map(|span| source.get(span))
            .map(inline_text)
            .collect();

        Ok(tree)
    }

    /// Render the tree back to markdown.
    ///
    /// Sibling blocks are separated by a blank line except consecutive items
    /// of one list. Reference definitions go last.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        self.write_children(&mut out, &self.roots, "");
        if !self.definitions.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            for definition in &self.definitions {
                write_text(&mut out, "", "", definition);
            }
        }
        out
    }

    /// Render to markdown, failing when reading the output back would not
    /// give this outline again (for example a list item with no text of its
    /// own whose first child is a paragraph)
    pub fn to_markdown_checked(&self) -> Result<String, TreeError> {
        let markdown = self.to_markdown();
        let reloaded = Self::from_markdown(&markdown)?;

        let ours = self.document_order();
        let theirs = reloaded.document_order();
        for (index, block) in ours.iter().enumerate() {
            let same = theirs.get(index).is_some_and(|other| {
                other.kind == block.kind
                    && other.text == block.text
                    && reloaded.depth(&other.id) == self.depth(&block.id)
            });
            if !same {
                return Err(TreeError::NotRepresentable(block.id.clone()));
            }
        }
        if let Some(last) = ours.last()
            && theirs.len() > ours.len()
        {
            return Err(TreeError::NotRepresentable(last.id.clone()));
        }
        Ok(markdown)
    }

    /// Number shown for a numbered list item: its list's start plus the
    /// directly preceding items of the same list
    pub fn list_number(&self, id: &BlockId) -> Option<u64> {
        let kind = &self.blocks.get(id)?.kind;
        let BlockKind::OrderedItem { start } = kind else {
            return None;
        };
        let position = self.position_of(id)?;
        let siblings = self.children_of(position.parent.as_ref())?;
        let preceding = siblings[..position.index]
            .iter()
            .rev()
            .take_while(|sibling| self.blocks.get(*sibling).is_some_and(|b| &b.kind == kind))
            .count();
        Some(start + preceding as u64)
    }

    fn write_children(&self, out: &mut String, ids: &[BlockId], prefix: &str) {
        let mut previous: Option<&BlockKind> = None;
        let mut delimiter = '.';
        for id in ids {
            let Some(block) = self.blocks.get(id) else {
                continue;
            };
            if let Some(previous) = previous
                && !same_list(previous, &block.kind)
            {
                write_line(out, prefix, "");
                // Adjacent numbered lists only stay apart with different delimiters
                if matches!(previous, BlockKind::OrderedItem { .. })
                    && matches!(block.kind, BlockKind::OrderedItem { .. })
                {
                    delimiter = if delimiter == '.' { ')' } else { '.' };
                }
            }
            self.write_block(out, block, prefix, delimiter);
            previous = Some(&block.kind);
        }
    }

    fn write_block(&self, out: &mut String, block: &Block, prefix: &str, delimiter: char) {
        let (marker, child_prefix) = match &block.kind {
            BlockKind::ListItem => (format!("{prefix}- "), format!("{prefix}  ")),
            BlockKind::OrderedItem { start } => {
                let number = self.list_number(&block.id).unwrap_or(*start);
                let marker = format!("{number}{delimiter} ");
                let indent = " ".repeat(marker.len());
                (format!("{prefix}{marker}"), format!("{prefix}{indent}"))
            }
            BlockKind::BlockQuote => (format!("{prefix}> "), format!("{prefix}> ")),
            _ => (prefix.to_string(), prefix.to_string()),
        };

        let wrote_text = match &block.kind {
            BlockKind::Heading { level } => {
                let hashes = "#".repeat(usize::from(*level));
                write_line(out, prefix, &format!("{hashes} {}", block.text));
                true
            }
            BlockKind::BlockQuote if block.text.is_empty() => false,
            BlockKind::Paragraph
            | BlockKind::ListItem
            | BlockKind::OrderedItem { .. }
            | BlockKind::BlockQuote => {
                write_text(out, &marker, &child_prefix, &block.text);
                !block.text.is_empty()
            }
            BlockKind::CodeBlock { language } => {
                let fence = fence_for(&block.text);
                write_line(out, prefix, &format!("{fence}{}", language.as_deref().unwrap_or("")));
                if !block.text.is_empty() {
                    write_text(out, prefix, prefix, &block.text);
                }
                write_line(out, prefix, &fence);
                true
            }
            BlockKind::Html => {
                write_text(out, prefix, prefix, &block.text);
                true
            }
            BlockKind::ThematicBreak => {
                write_line(out, prefix, "---");
                true
            }
        };

        let Some(first) = block.children.first().and_then(|id| self.blocks.get(id)) else {
            return;
        };
        if wrote_text && !interrupts_paragraph(self, first) {
            write_line(out, &child_prefix, "");
        }
        self.write_children(out, &block.children, &child_prefix);
    }
}

/// Stable textual dump of a tree: one line per block, two spaces per level
pub fn format_tree(tree: &DocumentTree) -> String {
    let mut out = String::new();
    for block in tree.document_order() {
        let indent = "  ".repeat(tree.depth(&block.id).unwrap_or(0));
        // Writing to a String cannot fail
        let _ = writeln!(out, "{indent}{} {:?} {:?}", block.id, block.kind, block.text);
    }
    out
}

fn folds_into_item(tree: &DocumentTree, stack: &[Frame]) -> bool {
    match stack.last() {
        Some(Frame::Block {
            id, inline: None, ..
        }) => tree
            .get(id)
            .is_some_and(|item| item.kind.is_list_item() && item.children.is_empty()),
        _ => false,
    }
}

/// Innermost open block, which new blocks nest under
fn container(stack: &[Frame]) -> Option<&BlockId> {
    stack.iter().rev().find_map(|frame| match frame {
        Frame::Block { id, .. } => Some(id),
        Frame::Merged | Frame::List(_) => None,
    })
}

fn list_start(stack: &[Frame]) -> Option<u64> {
    stack.iter().rev().find_map(|frame| match frame {
        Frame::List(start) => Some(*start),
        _ => None,
    })?
}

fn in_raw_block(stack: &[Frame]) -> bool {
    matches!(stack.last(), Some(Frame::Block { raw: true, .. }))
}

fn extend_inline(stack: &mut [Frame], range: Range<usize>) {
    let open = stack.iter_mut().rev().find_map(|frame| match frame {
        Frame::Block {
            raw: false, inline, ..
        } => Some(inline),
        _ => None,
    });
    if let Some(inline) = open {
        *inline = Some(match inline.take() {
            Some(span) => span.start.min(range.start)..span.end.max(range.end),
            None => range,
        });
    }
}

fn append_raw(tree: &mut DocumentTree, stack: &[Frame], text: &str) {
    if let Some(id) = container(stack)
        && let Some(block) = tree.blocks.get_mut(id)
    {
        block.text.push_str(text);
    }
}

fn finish_block(
    tree: &mut DocumentTree,
    source: &str,
    id: &BlockId,
    inline: Option<Range<usize>>,
) {
    let Some(block) = tree.blocks.get_mut(id) else {
        return;
    };
    match block.kind {
        BlockKind::CodeBlock { .. } | BlockKind::Html => {
            let trimmed = block.text.trim_end_matches('\n').len();
            block.text.truncate(trimmed);
        }
        _ => {
            let Some(raw) = inline.and_then(|span| source.get(span)) else {
                return;
            };
            let text = inline_text(raw);
            block.text = if matches!(block.kind, BlockKind::Heading { .. }) {
                text.split('\n').map(str::trim).collect::<Vec<_>>().join(" ")
            } else {
                text
            };
        }
    }
}

/// Inline source with container markers (quote `>` and indentation) removed
/// from continuation lines
fn inline_text(raw: &str) -> String {
    let mut lines = raw.split('\n');
    let mut text = lines.next().unwrap_or_default().to_string();
    for line in lines {
        let mut rest = line.trim_start();
        while let Some(inner) = rest.strip_prefix('>') {
            rest = inner.trim_start();
        }
        text.push('\n');
        text.push_str(rest);
    }
    text
}

/// Two list items of the same list sit on adjacent lines
fn same_list(previous: &BlockKind, next: &BlockKind) -> bool {
    previous.is_list_item() && previous == next
}

/// Whether `block` may start right under a line of paragraph text without
/// becoming part of it
fn interrupts_paragraph(tree: &DocumentTree, block: &Block) -> bool {
    let numbered_from_one = matches!(block.kind, BlockKind::OrderedItem { .. })
        && tree.list_number(&block.id) == Some(1);
    (block.kind == BlockKind::ListItem || numbered_from_one) && !block.text.is_empty()
}

/// A backtick fence longer than any backtick run opening a line of `code`
fn fence_for(code: &str) -> String {
    let longest = code
        .lines()
        .map(|line| line.trim_start().chars().take_while(|&c| c == '`').count())
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

fn write_text(out: &mut String, first_prefix: &str, rest_prefix: &str, text: &str) {
    let mut lines = text.split('\n');
    write_line(out, first_prefix, lines.next().unwrap_or_default());
    for line in lines {
        write_line(out, rest_prefix, line);
    }
}

/// Blank lines keep only the container markers; text lines are written as is
/// so hard breaks (trailing spaces) survive
fn write_line(out: &mut String, prefix: &str, text: &str) {
    if text.is_empty() {
        out.push_str(prefix.trim_end());
    } else {
        out.push_str(prefix);
        out.push_str(text);
    }
    out.push('\n');
}
