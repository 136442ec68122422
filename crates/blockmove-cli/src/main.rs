use anyhow::{Context, Result};
use blockmove_config::{Config, DragSettings};
use blockmove_engine::{
    BlockId, BlockKind, CancelReason, DocumentTree, DragController, DragEvent, DragOptions, Edge,
    Indicator, LayoutMap, Point, Rect as Bounds, SelectionCoordinator, hit_test,
};
use crossterm::{
    event::{
        self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture,
        Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::{
    env, fs,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
};

/// Columns at the start of each row that act as the drag handle
const GUTTER: u16 = 2;

/// Keyboard row selection; a drag clears it as soon as it arms
#[derive(Default)]
struct RowSelection {
    state: ListState,
}

impl SelectionCoordinator for RowSelection {
    fn reset_selection(&mut self) {
        self.state.select(None);
    }
}

struct App {
    path: PathBuf,
    tree: DocumentTree,
    drag: DragController<RowSelection>,
    layout: LayoutMap,
    /// Block on each visible screen row, top to bottom
    visible: Vec<BlockId>,
    /// Screen position of the first document row
    origin: (u16, u16),
    hovered: Option<BlockId>,
    status: String,
    dirty: bool,
}

impl App {
    fn new(path: PathBuf, options: DragOptions) -> Result<Self> {
        let source = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let tree = DocumentTree::from_markdown(&source)
            .with_context(|| format!("Failed to load outline from {}", path.display()))?;
        log::info!("loaded {} blocks from {}", tree.len(), path.display());

        Ok(Self {
            path,
            tree,
            drag: DragController::new(options, RowSelection::default()),
            layout: LayoutMap::new(),
            visible: Vec::new(),
            origin: (0, 0),
            hovered: None,
            status: "Drag a block by its ⠿ handle".to_string(),
            dirty: false,
        })
    }

    /// Map a terminal cell to layout coordinates. Rows are one unit tall, so
    /// the cell picks the band: the handle gutter is the top edge of its row,
    /// the text is mid-row, above the document is the top of the first row
    /// and below it is the bottom of the last.
    fn pointer(&self, column: u16, row: u16) -> Point {
        let (left, top) = self.origin;
        let rows = u16::try_from(self.visible.len()).unwrap_or(u16::MAX);
        let y = if row < top {
            f32::from(top) + 0.1
        } else if rows > 0 && row >= top + rows {
            f32::from(top + rows - 1) + 0.9
        } else if column < left + GUTTER {
            f32::from(row) + 0.1
        } else {
            f32::from(row) + 0.5
        };
        Point::new(f32::from(column), y)
    }

    fn block_at_row(&self, row: u16) -> Option<&BlockId> {
        let index = row.checked_sub(self.origin.1)?;
        self.visible.get(usize::from(index))
    }

    fn label(&self, id: &BlockId) -> String {
        let text = self
            .tree
            .get(id)
            .map(|block| block.text.lines().next().unwrap_or_default())
            .unwrap_or_default();
        if text.is_empty() {
            id.to_string()
        } else {
            format!("\"{text}\"")
        }
    }

    fn on_mouse(&mut self, mouse: MouseEvent) {
        let point = self.pointer(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Moved => {
                self.hovered = hit_test(&self.tree, &self.layout, point);
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(block) = self.block_at_row(mouse.row).cloned() else {
                    return;
                };
                let on_handle =
                    mouse.column >= self.origin.0 && mouse.column < self.origin.0 + GUTTER;
                if let Err(error) = self.drag.pointer_down(&self.tree, &block, on_handle, point) {
                    log::warn!("{error}");
                    self.status = error.to_string();
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let events = self.drag.pointer_move(&self.tree, &self.layout, point);
                self.apply(events);
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let events = self.drag.pointer_up(&mut self.tree);
                self.apply(events);
            }
            _ => {}
        }
    }

    fn cancel(&mut self, reason: CancelReason) {
        let events = self.drag.cancel(reason);
        self.apply(events);
    }

    fn apply(&mut self, events: Vec<DragEvent>) {
        for event in events {
            log::debug!("{event:?}");
            match event {
                DragEvent::DragStarted { block } => {
                    self.status = format!("Dragging {}", self.label(&block));
                }
                DragEvent::DropTargetChanged { .. } => {}
                DragEvent::MoveCommitted { block, record, .. } => {
                    if !record.is_noop() {
                        self.dirty = true;
                    }
                    log::info!("moved {block} from {:?} to {:?}", record.from, record.to);
                    self.status = format!("Moved {}", self.label(&block));
                }
                DragEvent::MoveRejected { reason, .. } => {
                    self.status = format!("Cannot drop there: {reason}");
                }
                DragEvent::DropHandled { block, .. } => {
                    self.status = format!("Drop of {} handled", self.label(&block));
                }
                DragEvent::DragCancelled { reason, .. } => {
                    self.status = format!("Drag cancelled ({reason:?})");
                }
                DragEvent::HandleClicked { block } => {
                    let index = self
                        .tree
                        .document_order()
                        .iter()
                        .position(|candidate| candidate.id == block);
                    self.drag.selection_mut().state.select(index);
                    self.status = format!("Selected {}", self.label(&block));
                }
            }
        }
    }

    /// Write the outline back, unless doing so would change its structure
    fn save(&mut self) {
        let markdown = match self.tree.to_markdown_checked() {
            Ok(markdown) => markdown,
            Err(error) => {
                log::warn!("not saving {}: {error}", self.path.display());
                self.status = format!("Not saved: {error}");
                return;
            }
        };
        match fs::write(&self.path, markdown) {
            Ok(()) => {
                self.dirty = false;
                self.status = format!("Saved {}", self.path.display());
            }
            Err(error) => {
                log::error!("saving {} failed: {error}", self.path.display());
                self.status = format!("Save failed: {error}");
            }
        }
    }

    fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let title = format!(
            " {}{} ",
            self.path.display(),
            if self.dirty { " *" } else { "" }
        );
        let outer = Block::default().borders(Borders::ALL).title(title);
        let inner = outer.inner(chunks[0]);

        let indicator = self.drag.indicator();
        let dragged = self.drag.dragged_block().cloned();
        let order = self.tree.document_order();
        let ids: Vec<BlockId> = order.iter().map(|block| block.id.clone()).collect();
        let items: Vec<ListItem> = order
            .iter()
            .map(|block| {
                self.row(
                    &block.id,
                    block.kind.clone(),
                    &block.text,
                    &indicator,
                    dragged.as_ref(),
                )
            })
            .collect();

        let list = List::new(items)
            .block(outer)
            .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
        frame.render_stateful_widget(list, chunks[0], &mut self.drag.selection_mut().state);

        let offset = self.drag.selection().state.offset();
        self.relayout(inner, offset, ids);

        let status = Line::from(vec![
            Span::styled(self.status.clone(), Style::default().fg(Color::Cyan)),
            Span::raw("  |  drop on ⠿ to place above | q: Quit | s: Save | Esc: Cancel | ↑/↓: Select"),
        ]);
        frame.render_widget(Paragraph::new(status), chunks[1]);
    }

    fn row(
        &self,
        id: &BlockId,
        kind: BlockKind,
        text: &str,
        indicator: &Indicator,
        dragged: Option<&BlockId>,
    ) -> ListItem<'static> {
        let is_dragged = dragged == Some(id);
        let handle = if is_dragged || self.hovered.as_ref() == Some(id) {
            "⠿ "
        } else {
            "  "
        };
        let depth = self.tree.depth(id).unwrap_or(0);
        let first_line = text.lines().next().unwrap_or_default();
        let content = match kind {
            BlockKind::Heading { level } => {
                format!("{} {first_line}", "#".repeat(usize::from(level)))
            }
            BlockKind::ListItem => format!("• {first_line}"),
            BlockKind::OrderedItem { start } => {
                let number = self.tree.list_number(id).unwrap_or(start);
                format!("{number}. {first_line}")
            }
            BlockKind::BlockQuote => format!("> {first_line}"),
            BlockKind::CodeBlock { language } => {
                format!("```{} {first_line}", language.unwrap_or_default())
            }
            BlockKind::Html => first_line.to_string(),
            BlockKind::ThematicBreak => "───".to_string(),
            BlockKind::Paragraph => first_line.to_string(),
        };

        let mut style = Style::default();
        if is_dragged {
            style = style.add_modifier(Modifier::DIM);
        }
        let mut spans = vec![
            Span::styled(handle, Style::default().fg(Color::DarkGray)),
            Span::raw("  ".repeat(depth)),
            Span::styled(content, style),
        ];

        let hint = Style::default().fg(Color::Magenta);
        if indicator.anchor() == Some(id) {
            match indicator.edge() {
                Some(Edge::Top) => spans.push(Span::styled("  ▲ drop above", hint)),
                Some(Edge::Bottom) => spans.push(Span::styled("  ▼ drop below", hint)),
                None => spans.push(Span::styled("  ⮑ drop inside", hint)),
            }
        }
        ListItem::new(Line::from(spans))
    }

    /// Record where each visible block landed on screen; off-screen blocks
    /// get no bounds and so cannot be drop targets
    fn relayout(&mut self, area: Rect, offset: usize, ids: Vec<BlockId>) {
        self.origin = (area.x, area.y);
        self.layout.clear();
        self.visible.clear();

        let rows = ids.into_iter().skip(offset).take(usize::from(area.height));
        for (row, id) in rows.enumerate() {
            let bounds = Bounds::new(
                f32::from(area.x),
                f32::from(area.y) + row as f32,
                f32::from(area.width),
                1.0,
            );
            self.layout.insert(id.clone(), bounds);
            self.visible.push(id);
        }
    }

    fn select_next(&mut self) {
        if self.drag.session().is_none() {
            self.drag.selection_mut().state.select_next();
        }
    }

    fn select_previous(&mut self) {
        if self.drag.session().is_none() {
            self.drag.selection_mut().state.select_previous();
        }
    }
}

/// Pointer coordinates here are terminal cells, so one cell of travel is
/// already a deliberate move
const CELL_THRESHOLD: f32 = 1.0;

/// Engine defaults, measured in cells, overridden by whatever the config sets
fn drag_options(settings: &DragSettings) -> DragOptions {
    let defaults = DragOptions {
        threshold: CELL_THRESHOLD,
        ..DragOptions::default()
    };
    DragOptions {
        threshold: settings.threshold.unwrap_or(defaults.threshold),
        edge_band: settings.edge_band.unwrap_or(defaults.edge_band),
        allow_nesting: settings.allow_nesting.unwrap_or(defaults.allow_nesting),
    }
}

/// The terminal belongs to the UI, so logs only go to a file when asked for
fn init_logging() -> Result<()> {
    if let Some(log_path) = env::var_os("BLOCKMOVE_LOG_FILE") {
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.to_string_lossy()))?;
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Info)
            .parse_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    init_logging()?;

    // Determine document path from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let document_path = match args.len() {
        2 => PathBuf::from(&args[1]),
        1 => match config.document_path.clone() {
            Some(path) => path,
            None => {
                eprintln!("Error: No document provided and none configured");
                eprintln!("Usage: {} <outline.md>", args[0]);
                eprintln!("Or set document_path in {}", config_path.display());
                process::exit(1);
            }
        },
        _ => {
            eprintln!("Usage: {} [outline.md]", args[0]);
            process::exit(1);
        }
    };

    let mut app = App::new(document_path, drag_options(&config.drag))?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }
    if app.dirty {
        println!("Unsaved changes to {} were discarded", app.path.display());
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| app.render(f))?;

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Char('s') => app.save(),
                KeyCode::Esc => app.cancel(CancelReason::Escape),
                KeyCode::Down | KeyCode::Char('j') => app.select_next(),
                KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
                _ => {}
            },
            Event::Mouse(mouse) => app.on_mouse(mouse),
            Event::FocusLost => app.cancel(CancelReason::CaptureLost),
            _ => {}
        }
    }
}
