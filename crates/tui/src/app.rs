use std::{cmp, io, sync::Arc, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use parking_lot::Mutex;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc, task::JoinHandle};
use tracing::{error, info};
use vibr_core::{
    config::AppConfig,
    preview::{spawn_preview, Rgb, FRAME_BUDGET},
    Canvas, FileStore, FrameOutcome, GameRecord, GenerationOutcome, GenerationTicket,
    LifecycleController, PreviewState, Surface,
};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_NAME_LEN: usize = 64;
const MAX_PROMPT_LEN: usize = 2000;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    success: Color,
    warning: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Create,
    Library,
    Preview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Prompt,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LibraryMode {
    Browse,
    Filter,
}

/// Single-line editable text with a character cursor.
#[derive(Debug, Clone)]
struct TextField {
    input: String,
    cursor: usize,
    max_len: usize,
}

impl TextField {
    fn new(max_len: usize) -> Self {
        Self {
            input: String::new(),
            cursor: 0,
            max_len,
        }
    }

    fn len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    fn set(&mut self, value: &str) {
        self.input = value.chars().take(self.max_len).collect();
        self.cursor = self.len();
    }

    fn move_cursor(&mut self, delta: isize) {
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, self.len() as isize) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.len();
    }

    fn insert(&mut self, ch: char) {
        if self.len() >= self.max_len || ch.is_control() {
            return;
        }
        let idx = self.byte_index();
        self.input.insert(idx, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let idx = self.byte_index();
        self.input.remove(idx);
    }

    fn delete(&mut self) {
        if self.cursor < self.len() {
            let idx = self.byte_index();
            self.input.remove(idx);
        }
    }

    /// Apply an editing key; returns true when the text changed.
    fn handle_key(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Left => self.move_cursor(-1),
            KeyCode::Right => self.move_cursor(1),
            KeyCode::Home => self.move_home(),
            KeyCode::End => self.move_end(),
            KeyCode::Backspace => {
                self.backspace();
                return true;
            }
            KeyCode::Delete => {
                self.delete();
                return true;
            }
            KeyCode::Char(ch)
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT =>
            {
                self.insert(ch);
                return true;
            }
            _ => {}
        }
        false
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    Generated {
        ticket: GenerationTicket,
        result: vibr_core::Result<String>,
    },
    PreviewEnded(FrameOutcome),
}

/// Terminal frontend around the lifecycle controller.
pub struct VibrApp {
    controller: LifecycleController<FileStore>,
    config: AppConfig,
    state: UiState,
    screen: Screen,
    focus: Focus,
    prompt: TextField,
    name: TextField,
    loaded_id: Option<String>,
    library: Vec<GameRecord>,
    canvas: Arc<Mutex<Canvas>>,
    preview_task: Option<JoinHandle<u32>>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    theme: Theme,
}

impl VibrApp {
    pub fn new(controller: LifecycleController<FileStore>, config: AppConfig) -> Self {
        let canvas = Canvas::new(config.preview.width, config.preview.height);
        Self {
            controller,
            config,
            state: UiState::default(),
            screen: Screen::Create,
            focus: Focus::Prompt,
            prompt: TextField::new(MAX_PROMPT_LEN),
            name: TextField::new(MAX_NAME_LEN),
            loaded_id: None,
            library: Vec::new(),
            canvas: Arc::new(Mutex::new(canvas)),
            preview_task: None,
            event_tx: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.refresh_library();
        self.state.set_status(format!(
            "Loaded {} saved games • generator: {}",
            self.controller.repository().len(),
            self.controller.client().describe()
        ));

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
            if self.state.should_quit {
                break;
            }
        }

        self.abort_preview_task();
        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.report_preview_end();
                true
            }
            Some(AppEvent::Generated { ticket, result }) => {
                self.handle_generated(ticket, result);
                true
            }
            Some(AppEvent::PreviewEnded(_)) => {
                self.report_preview_end();
                true
            }
            None => false,
        }
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.modifiers == KeyModifiers::CONTROL
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
        {
            self.state.should_quit = true;
            return Ok(());
        }
        match self.screen {
            Screen::Create => self.handle_create_key(key),
            Screen::Library => self.handle_library_key(key),
            Screen::Preview => self.handle_preview_key(key),
        }
        Ok(())
    }

    fn handle_create_key(&mut self, key: KeyEvent) {
        if key.modifiers == KeyModifiers::CONTROL {
            match key.code {
                KeyCode::Char('g') => self.start_generation(),
                KeyCode::Char('s') => self.save(),
                KeyCode::Char('o') => self.save_over(),
                KeyCode::Char('p') => self.start_preview(),
                KeyCode::Char('e') => self.export(),
                KeyCode::Char('l') => self.open_library(),
                KeyCode::Char('n') => self.new_draft(),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Prompt => Focus::Name,
                    Focus::Name => Focus::Prompt,
                };
            }
            KeyCode::Enter => match self.focus {
                Focus::Prompt => self.start_generation(),
                Focus::Name => self.save(),
            },
            KeyCode::Esc => {
                if self.controller.is_generating() {
                    self.controller.cancel_generation();
                    self.state.set_status("Generation cancelled".to_string());
                }
            }
            KeyCode::PageDown => {
                self.state.code_scroll = self.state.code_scroll.saturating_add(10);
            }
            KeyCode::PageUp => {
                self.state.code_scroll = self.state.code_scroll.saturating_sub(10);
            }
            _ => {
                if self.controller.is_generating() {
                    self.state
                        .set_status("Generating your game… (Esc to cancel)".to_string());
                    return;
                }
                match self.focus {
                    Focus::Prompt => {
                        if self.prompt.handle_key(&key) {
                            self.controller.set_prompt(self.prompt.input.clone());
                        }
                    }
                    Focus::Name => {
                        if self.name.handle_key(&key) {
                            self.controller.set_name(self.name.input.clone());
                        }
                    }
                }
            }
        }
    }

    fn handle_library_key(&mut self, key: KeyEvent) {
        if self.state.library_mode == LibraryMode::Filter {
            match key.code {
                KeyCode::Esc => {
                    self.state.library_mode = LibraryMode::Browse;
                    self.state.filter.clear();
                    self.refresh_library();
                    self.state.set_status("Filter cleared".to_string());
                }
                KeyCode::Enter => {
                    self.state.library_mode = LibraryMode::Browse;
                    self.state
                        .set_status(format!("{} matching games", self.library.len()));
                }
                KeyCode::Backspace => {
                    self.state.filter.pop();
                    self.refresh_library();
                }
                KeyCode::Char(ch) if !ch.is_control() => {
                    self.state.filter.push(ch);
                    self.refresh_library();
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Esc => {
                self.screen = Screen::Create;
                self.state.set_status("Back to editor".to_string());
            }
            KeyCode::Char('j') | KeyCode::Down => self.state.move_library_cursor(1, self.library.len()),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_library_cursor(-1, self.library.len()),
            KeyCode::Char('/') => {
                self.state.library_mode = LibraryMode::Filter;
                self.state.set_status("Type to filter saved games".to_string());
            }
            KeyCode::Char('r') => {
                self.refresh_library();
                self.state.set_status("Saved games refreshed".to_string());
            }
            KeyCode::Char('d') | KeyCode::Delete => self.delete_selected(),
            KeyCode::Enter => self.load_selected(),
            _ => {}
        }
    }

    fn handle_preview_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.controller.stop_preview();
                self.screen = Screen::Create;
                self.state.set_status("Preview closed".to_string());
            }
            KeyCode::Char(' ') => {
                self.controller.stop_preview();
                self.state.set_status("Preview stopped".to_string());
            }
            KeyCode::Char('r') => self.start_preview(),
            _ => {}
        }
    }

    fn start_generation(&mut self) {
        let ticket = match self.controller.begin_generation() {
            Ok(ticket) => ticket,
            Err(err) => {
                self.state.set_status(err.to_string());
                return;
            }
        };
        let Some(sender) = self.event_tx.clone() else {
            self.controller.cancel_generation();
            self.state
                .set_status("Internal error: event channel unavailable".to_string());
            error!("event_channel_missing");
            return;
        };

        info!(ticket = ticket.id(), "Requesting generation");
        self.state.set_status("Generating your game…".to_string());
        let client = self.controller.client().clone();
        spawn(async move {
            let result = client.generate(ticket.prompt()).await;
            let _ = sender.send(AppEvent::Generated { ticket, result }).await;
        });
    }

    fn handle_generated(&mut self, ticket: GenerationTicket, result: vibr_core::Result<String>) {
        match self.controller.finish_generation(&ticket, result) {
            Ok(GenerationOutcome::Applied) => {
                let draft = self.controller.draft();
                self.name.set(&draft.name);
                self.prompt.set(&draft.prompt);
                self.state.code_scroll = 0;
                self.state
                    .set_status("Game generated successfully! Ctrl+S to save".to_string());
            }
            Ok(GenerationOutcome::Stale) => {}
            Err(err) => {
                self.state
                    .set_status(format!("Failed to generate game: {err}"));
            }
        }
    }

    fn save(&mut self) {
        match self.controller.save() {
            Ok(record) => {
                self.state
                    .set_status(format!("Saved \"{}\"", record.name));
                self.loaded_id = Some(record.id);
                self.refresh_library();
            }
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn save_over(&mut self) {
        let Some(id) = self.loaded_id.clone() else {
            self.state
                .set_status("No saved game loaded; Ctrl+S saves a new one".to_string());
            return;
        };
        match self.controller.save_over(&id) {
            Ok(record) => {
                self.state
                    .set_status(format!("Updated \"{}\"", record.name));
                self.refresh_library();
            }
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn export(&mut self) {
        match self.controller.export_to(&self.config.export_dir) {
            Ok(path) => self
                .state
                .set_status(format!("Exported to {}", path.display())),
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn new_draft(&mut self) {
        self.abort_preview_task();
        self.controller.discard_draft();
        self.prompt.set("");
        self.name.set("");
        self.loaded_id = None;
        self.focus = Focus::Prompt;
        self.state.code_scroll = 0;
        self.state.set_status("New game".to_string());
    }

    fn start_preview(&mut self) {
        self.abort_preview_task();
        let started = {
            let canvas = self.canvas.lock();
            self.controller.start_preview(&*canvas)
        };
        if let Err(err) = started {
            self.state.set_status(err.to_string());
            return;
        }
        let Some(sender) = self.event_tx.clone() else {
            self.controller.stop_preview();
            return;
        };

        let interval = Duration::from_millis(self.config.preview.frame_interval_ms);
        self.preview_task = Some(spawn_preview(
            self.controller.preview().clone(),
            Arc::clone(&self.canvas),
            interval,
            move |outcome| {
                if outcome != FrameOutcome::Continue {
                    let _ = sender.try_send(AppEvent::PreviewEnded(outcome));
                }
            },
        ));
        self.state.preview_reported = false;
        self.screen = Screen::Preview;
        self.state
            .set_status("Previewing (Space stop, r restart, Esc close)".to_string());
    }

    /// Show the end-of-run status once, whether or not the task's event arrived.
    fn report_preview_end(&mut self) {
        if self.state.preview_reported {
            return;
        }
        let preview = self.controller.preview();
        if let Some(status) = preview_end_status(preview.state(), preview.frame()) {
            self.state.set_status(status);
            self.state.preview_reported = true;
        }
    }

    fn abort_preview_task(&mut self) {
        self.controller.stop_preview();
        if let Some(task) = self.preview_task.take() {
            task.abort();
        }
    }

    fn open_library(&mut self) {
        self.refresh_library();
        self.screen = Screen::Library;
        if self.library.is_empty() {
            self.state.set_status("No saved games yet".to_string());
        } else {
            self.state
                .set_status("Enter load • d delete • / filter • Esc back".to_string());
        }
    }

    fn refresh_library(&mut self) {
        self.library = self.controller.search(&self.state.filter);
        self.state.move_library_cursor(0, self.library.len());
    }

    fn selected_record(&self) -> Option<&GameRecord> {
        self.library.get(self.state.library_cursor)
    }

    fn load_selected(&mut self) {
        let Some(id) = self.selected_record().map(|record| record.id.clone()) else {
            return;
        };
        self.abort_preview_task();
        match self.controller.load(&id) {
            Ok(record) => {
                let draft = self.controller.draft();
                self.prompt.set(&draft.prompt);
                self.name.set(&draft.name);
                self.loaded_id = Some(record.id);
                self.state.code_scroll = 0;
                self.screen = Screen::Create;
                self.state
                    .set_status(format!("Loaded \"{}\"", record.name));
            }
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn delete_selected(&mut self) {
        let Some(record) = self.selected_record().cloned() else {
            return;
        };
        match self.controller.delete(&record.id) {
            Ok(()) => {
                if self.loaded_id.as_deref() == Some(record.id.as_str()) {
                    self.loaded_id = None;
                }
                self.refresh_library();
                self.state
                    .set_status(format!("Deleted \"{}\"", record.name));
            }
            Err(err) => self.state.set_status(err.to_string()),
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(4)])
            .split(area);

        match self.screen {
            Screen::Create => self.draw_create(frame, chunks[0]),
            Screen::Library => self.draw_library(frame, chunks[0]),
            Screen::Preview => self.draw_preview(frame, chunks[0]),
        }
        self.render_status(frame, chunks[1]);
    }

    fn draw_create(&mut self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(9),
            ])
            .split(columns[0]);

        self.render_name_field(frame, left[0]);
        self.render_prompt_field(frame, left[1]);
        self.render_help(frame, left[2]);
        self.render_code(frame, columns[1]);
    }

    fn field_block(&self, title: &str, focused: bool) -> Block<'static> {
        let style = if focused {
            Style::default().fg(self.theme.accent)
        } else {
            Style::default().fg(self.theme.muted)
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title(title.to_string())
    }

    fn render_name_field(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Name;
        let inner_width = area.width.saturating_sub(2) as usize;
        let offset = self.name.cursor.saturating_sub(inner_width.saturating_sub(1));
        let visible: String = self.name.input.chars().skip(offset).collect();
        let paragraph =
            Paragraph::new(Line::from(visible)).block(self.field_block("Game Title", focused));
        frame.render_widget(paragraph, area);
        if focused && !self.controller.is_generating() {
            let x = area.x + 1 + (self.name.cursor - offset) as u16;
            frame.set_cursor(x.min(area.right().saturating_sub(2)), area.y + 1);
        }
    }

    fn render_prompt_field(&self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Prompt;
        let inner_width = area.width.saturating_sub(2).max(1) as usize;
        let inner_height = area.height.saturating_sub(2).max(1) as usize;
        let lines = hard_wrap(&self.prompt.input, inner_width);
        let cursor_row = self.prompt.cursor / inner_width;
        let cursor_col = self.prompt.cursor % inner_width;
        let offset = cursor_row.saturating_sub(inner_height - 1);

        let content: Vec<Line> = if self.prompt.input.is_empty() && !focused {
            vec![Line::from(Span::styled(
                "Describe your game idea, e.g. a space shooter where you dodge aliens…",
                Style::default().fg(self.theme.muted),
            ))]
        } else {
            lines.into_iter().skip(offset).map(Line::from).collect()
        };
        let title = if self.controller.is_generating() {
            "Describe Your Game (generating…)"
        } else {
            "Describe Your Game"
        };
        frame.render_widget(
            Paragraph::new(content).block(self.field_block(title, focused)),
            area,
        );
        if focused && !self.controller.is_generating() {
            frame.set_cursor(
                area.x + 1 + cursor_col as u16,
                area.y + 1 + (cursor_row - offset) as u16,
            );
        }
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let key = |label: &'static str| {
            Span::styled(label, Style::default().add_modifier(Modifier::BOLD))
        };
        let lines = vec![
            Line::from(vec![key("Enter/Ctrl+G"), Span::raw(" generate")]),
            Line::from(vec![key("Tab"), Span::raw(" switch field")]),
            Line::from(vec![key("Ctrl+S"), Span::raw(" save  "), key("Ctrl+O"), Span::raw(" save over")]),
            Line::from(vec![key("Ctrl+P"), Span::raw(" preview  "), key("Ctrl+E"), Span::raw(" export")]),
            Line::from(vec![key("Ctrl+L"), Span::raw(" saved games  "), key("Ctrl+N"), Span::raw(" new")]),
            Line::from(vec![key("PgUp/PgDn"), Span::raw(" scroll code  "), key("Ctrl+Q"), Span::raw(" quit")]),
        ];
        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Keys")),
            area,
        );
    }

    fn render_code(&mut self, frame: &mut Frame, area: Rect) {
        let draft = self.controller.draft();
        let block = Block::default().borders(Borders::ALL).title("Generated Code");
        if !draft.has_code() {
            let hint = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Enter a game description and press Enter to see the code here.",
                    Style::default().fg(self.theme.muted),
                )),
            ])
            .block(block)
            .wrap(Wrap { trim: true });
            frame.render_widget(hint, area);
            return;
        }

        let total = draft.code.lines().count() as u16;
        let visible = area.height.saturating_sub(2);
        self.state.code_scroll = self.state.code_scroll.min(total.saturating_sub(visible));
        let lines: Vec<Line> = draft
            .code
            .lines()
            .map(|line| {
                Line::from(Span::styled(
                    line.to_string(),
                    Style::default().fg(self.theme.success),
                ))
            })
            .collect();
        let paragraph = Paragraph::new(lines)
            .block(block)
            .scroll((self.state.code_scroll, 0));
        frame.render_widget(paragraph, area);
    }

    fn draw_library(&mut self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);

        let items: Vec<ListItem> = self
            .library
            .iter()
            .map(|record| ListItem::new(Line::from(record.name.clone())))
            .collect();
        let title = if self.state.filter.is_empty() {
            format!("Saved Games ({})", self.library.len())
        } else {
            format!("Saved Games ({}) /{}", self.library.len(), self.state.filter)
        };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");
        let mut list_state = ListState::default();
        if !self.library.is_empty() {
            list_state.select(Some(self.state.library_cursor));
        }
        frame.render_stateful_widget(list, columns[0], &mut list_state);

        let details = match self.selected_record() {
            Some(record) => {
                let created = record
                    .created_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M");
                let mut lines = vec![
                    Line::from(Span::styled(
                        record.name.clone(),
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )),
                    Line::from(format!("Saved: {created}")),
                ];
                if let Some(updated) = record.updated_at {
                    lines.push(Line::from(format!(
                        "Updated: {}",
                        updated.with_timezone(&Local).format("%Y-%m-%d %H:%M")
                    )));
                }
                lines.push(Line::from(format!(
                    "Code: {} lines",
                    record.code.lines().count()
                )));
                lines.push(Line::from(""));
                lines.push(Line::from(record.prompt.clone()));
                lines
            }
            None => vec![Line::from("No saved games")],
        };
        frame.render_widget(
            Paragraph::new(details)
                .block(Block::default().borders(Borders::ALL).title("Details"))
                .wrap(Wrap { trim: true }),
            columns[1],
        );
    }

    fn draw_preview(&mut self, frame: &mut Frame, area: Rect) {
        let state = self.controller.preview().state();
        let frames = self.controller.preview().frame();
        let title = format!("Game Preview • {state:?} • frame {frames}/{FRAME_BUDGET}");
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        let lines = {
            let canvas = self.canvas.lock();
            canvas_lines(&canvas, inner.width, inner.height)
        };
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let status_style = if self.controller.is_generating() {
            Style::default().fg(self.theme.warning)
        } else {
            Style::default().fg(self.theme.primary_fg)
        };
        let mut secondary = format!(
            "Saved games: {}  •  generator: {}",
            self.controller.repository().len(),
            self.controller.client().describe()
        );
        if let Some(id) = &self.loaded_id {
            secondary.push_str(&format!("  •  editing {}", short_id(id)));
        }
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(self.state.status.clone(), status_style)),
            Line::from(Span::styled(secondary, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Split text into rows of exactly `width` characters (the last may be shorter).
fn hard_wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

fn preview_end_status(state: PreviewState, frames: u32) -> Option<String> {
    (state == PreviewState::Stopped && frames >= FRAME_BUDGET)
        .then(|| format!("Preview finished after {frames} frames"))
}

fn rgb_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

/// Downsample the canvas into half-block terminal cells, two pixels rows per cell.
fn canvas_lines(canvas: &Canvas, cols: u16, rows: u16) -> Vec<Line<'static>> {
    let (width, height) = canvas.size();
    if cols == 0 || rows == 0 || width == 0 || height == 0 {
        return Vec::new();
    }
    let cols_n = u32::from(cols);
    let sub_rows = u32::from(rows) * 2;

    let mut cells: Vec<Vec<(char, Color, Color)>> = (0..u32::from(rows))
        .map(|row| {
            let top_y = ((row * 2) * 2 + 1) * height / (sub_rows * 2);
            let bottom_y = ((row * 2 + 1) * 2 + 1) * height / (sub_rows * 2);
            (0..cols_n)
                .map(|col| {
                    let x = (col * 2 + 1) * width / (cols_n * 2);
                    let top = canvas.pixel(x, top_y).unwrap_or_default();
                    let bottom = canvas.pixel(x, bottom_y).unwrap_or_default();
                    ('▀', rgb_color(top), rgb_color(bottom))
                })
                .collect()
        })
        .collect();

    for label in canvas.labels() {
        let col = (label.x.max(0) as u32 * cols_n / width) as usize;
        let row = (label.y.max(0) as u32 * u32::from(rows) / height) as usize;
        let Some(cells_row) = cells.get_mut(row) else {
            continue;
        };
        for (offset, ch) in label.text.chars().enumerate() {
            let Some(cell) = cells_row.get_mut(col + offset) else {
                break;
            };
            *cell = (ch, rgb_color(label.color), cell.1);
        }
    }

    cells
        .into_iter()
        .map(|row| {
            Line::from(
                row.into_iter()
                    .map(|(ch, fg, bg)| Span::styled(ch.to_string(), Style::default().fg(fg).bg(bg)))
                    .collect::<Vec<_>>(),
            )
        })
        .collect()
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    status: String,
    should_quit: bool,
    library_cursor: usize,
    library_mode: LibraryMode,
    filter: String,
    code_scroll: u16,
    preview_reported: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            status: "Ready".to_string(),
            should_quit: false,
            library_cursor: 0,
            library_mode: LibraryMode::Browse,
            filter: String::new(),
            code_scroll: 0,
            preview_reported: true,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn move_library_cursor(&mut self, delta: isize, total: usize) {
        if total == 0 {
            self.library_cursor = 0;
            return;
        }
        let next = self.library_cursor as isize + delta;
        self.library_cursor = cmp::min(next.max(0) as usize, total - 1);
    }
}
