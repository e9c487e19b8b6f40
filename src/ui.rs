use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthChar;

use crate::controller::{line_index_at, line_start, Controller, ViewState, VIEW_BUFFER};
use crate::surface::{Buffer, MemorySurface, TextSurface, SCRATCH_BUFFER};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);

const IDLE_STATUS: &str = "Press h to show headlines, ? for help, q to quit.";

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

/// Cuts `text` so it occupies at most `width` terminal cells.
fn truncate_to_width(text: &str, width: usize) -> String {
    let mut used = 0usize;
    let mut out = String::new();
    for ch in text.chars() {
        let cells = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cells > width {
            break;
        }
        used += cells;
        out.push(ch);
    }
    out
}

/// Character position for a cell inside the headline pane. Rows below the
/// last headline map to the end of the text, which resolves to no record.
fn position_for_cell(text: &str, offset: usize, area: Rect, column: u16, row: u16) -> Option<usize> {
    if column < area.x
        || row < area.y
        || column >= area.x.saturating_add(area.width)
        || row >= area.y.saturating_add(area.height)
    {
        return None;
    }
    let line = offset + (row - area.y) as usize;
    let lines = text.matches('\n').count();
    if line >= lines {
        return Some(text.chars().count());
    }
    let start = line_start(text, line);
    let line_len = text
        .chars()
        .skip(start)
        .take_while(|ch| *ch != '\n')
        .count();
    Some(start + ((column - area.x) as usize).min(line_len))
}

pub struct Options {
    pub controller: Controller,
    pub message_timeout: Duration,
    pub copy_to_clipboard: bool,
    pub open_on_start: bool,
}

pub struct Model {
    controller: Controller,
    surface: MemorySurface,
    status_message: String,
    message_shown_at: Option<Instant>,
    message_timeout: Duration,
    copy_to_clipboard: bool,
    help_visible: bool,
    hover_line: Option<usize>,
    view_area: Option<Rect>,
    view_offset: usize,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let mut model = Self {
            controller: opts.controller,
            surface: MemorySurface::new(),
            status_message: IDLE_STATUS.to_string(),
            message_shown_at: None,
            message_timeout: opts.message_timeout,
            copy_to_clipboard: opts.copy_to_clipboard,
            help_visible: false,
            hover_line: None,
            view_area: None,
            view_offset: 0,
            needs_redraw: true,
        };

        if opts.open_on_start {
            if let Err(err) = model.open_headlines() {
                model.set_status(format!("Error: {err}"));
            }
        }
        model
    }

    /// Text the user collected in the buffer the session started from.
    pub fn scratch_text(&self) -> String {
        self.surface
            .buffer(SCRATCH_BUFFER)
            .map(|buffer| buffer.text.clone())
            .unwrap_or_default()
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let tick_rate = Duration::from_millis(250);

        loop {
            self.expire_status();

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            if event::poll(tick_rate)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => self.set_status(format!("Error: {}", err)),
                        }
                        self.mark_dirty();
                    }
                    Event::Mouse(mouse) => {
                        if let Err(err) = self.handle_mouse(mouse) {
                            self.set_status(format!("Error: {}", err));
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn set_status<S: Into<String>>(&mut self, message: S) {
        self.status_message = message.into();
        self.message_shown_at = Some(Instant::now());
        self.mark_dirty();
    }

    /// Moves a message left on the surface by the controller to the status line.
    fn sync_surface_message(&mut self) {
        if let Some(message) = self.surface.last_message().map(str::to_string) {
            self.surface.clear_message();
            self.set_status(message);
        }
    }

    fn expire_status(&mut self) {
        if let Some(shown) = self.message_shown_at {
            if shown.elapsed() >= self.message_timeout {
                self.message_shown_at = None;
                self.status_message = IDLE_STATUS.to_string();
                self.mark_dirty();
            }
        }
    }

    fn view_is_current(&self) -> bool {
        self.surface.current_buffer() == VIEW_BUFFER
    }

    fn open_headlines(&mut self) -> Result<()> {
        self.view_offset = 0;
        self.hover_line = None;
        let result = self.controller.open(&mut self.surface);
        self.sync_surface_message();
        result?;
        if self.status_message == IDLE_STATUS {
            let count = self.controller.headlines().len();
            self.set_status(format!("{count} headlines"));
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.help_visible {
            self.help_visible = false;
            return Ok(false);
        }

        if !self.view_is_current() {
            match code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
                KeyCode::Char('h') | KeyCode::Enter => {
                    self.status_message = IDLE_STATUS.to_string();
                    self.open_headlines()?;
                }
                KeyCode::Char('?') => self.help_visible = true,
                _ => {}
            }
            return Ok(false);
        }

        match code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                let result = self.controller.select_and_open(&mut self.surface);
                self.sync_surface_message();
                result?;
            }
            KeyCode::Char('c') => {
                let text = self.controller.insert_citation(&mut self.surface)?;
                self.after_insert(&text);
            }
            KeyCode::Char('u') => {
                let text = self.controller.insert_url_only(&mut self.surface)?;
                self.after_insert(&text);
            }
            KeyCode::Char('g') => {
                let result = self.controller.refresh(&mut self.surface);
                self.sync_surface_message();
                result?;
                self.view_offset = 0;
                let count = self.controller.headlines().len();
                self.set_status(format!("Reloaded {count} headlines"));
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.controller.close(&mut self.surface);
                self.hover_line = None;
                self.set_status(IDLE_STATUS);
            }
            KeyCode::Char('?') => self.help_visible = true,
            KeyCode::Char('j') | KeyCode::Down => self.controller.move_lines(&mut self.surface, 1),
            KeyCode::Char('k') | KeyCode::Up => self.controller.move_lines(&mut self.surface, -1),
            KeyCode::PageDown => {
                let step = self.page_step();
                self.controller.move_lines(&mut self.surface, step);
            }
            KeyCode::PageUp => {
                let step = self.page_step();
                self.controller.move_lines(&mut self.surface, -step);
            }
            KeyCode::Home => self.controller.move_lines(&mut self.surface, isize::MIN / 2),
            KeyCode::End | KeyCode::Char('G') => {
                self.controller.move_lines(&mut self.surface, isize::MAX / 2)
            }
            _ => {}
        }
        Ok(false)
    }

    fn page_step(&self) -> isize {
        self.view_area
            .map(|area| area.height.max(1) as isize)
            .unwrap_or(10)
    }

    fn after_insert(&mut self, text: &str) {
        self.hover_line = None;
        if !self.copy_to_clipboard {
            self.set_status(format!("Inserted {text}"));
            return;
        }
        match copy_to_clipboard(text) {
            Ok(()) => self.set_status(format!("Inserted and copied {text}")),
            Err(err) => self.set_status(format!("Inserted {text}; clipboard failed: {err}")),
        }
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Result<()> {
        if self.help_visible || !self.view_is_current() {
            return Ok(());
        }
        let Some(area) = self.view_area else {
            return Ok(());
        };

        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let text = self.surface.text();
                if let Some(position) =
                    position_for_cell(text, self.view_offset, area, event.column, event.row)
                {
                    let result = self.controller.select_at_pointer(&mut self.surface, position);
                    self.sync_surface_message();
                    self.mark_dirty();
                    result?;
                }
            }
            MouseEventKind::Moved => {
                let text = self.surface.text();
                let hovered = position_for_cell(text, self.view_offset, area, event.column, event.row)
                    .and_then(|position| self.surface.current().hover_span_at(position))
                    .map(|span| line_index_at(text, span.start));
                if hovered != self.hover_line {
                    self.hover_line = hovered;
                    self.mark_dirty();
                }
            }
            MouseEventKind::ScrollDown => {
                self.controller.move_lines(&mut self.surface, 1);
                self.mark_dirty();
            }
            MouseEventKind::ScrollUp => {
                self.controller.move_lines(&mut self.surface, -1);
                self.mark_dirty();
            }
            _ => {}
        }
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_line = Paragraph::new(self.status_message.clone()).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        self.view_area = None;
        let current = self.surface.current().clone();
        match self.surface.other_window().cloned() {
            Some(other) => {
                let windows = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
                    .split(layout[1]);
                self.draw_buffer(frame, windows[0], &other, false);
                self.draw_buffer(frame, windows[1], &current, true);
            }
            None => self.draw_buffer(frame, layout[1], &current, true),
        }

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(footer, layout[2]);

        if self.help_visible {
            self.draw_help(frame, layout[1]);
        }
    }

    fn buffer_block(name: &str, focused: bool) -> Block<'static> {
        let border_style = if focused {
            Style::default().fg(COLOR_BORDER_FOCUSED)
        } else {
            Style::default().fg(COLOR_BORDER_IDLE)
        };
        let title_style = if focused {
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_SECONDARY)
        };
        Block::default()
            .title(Span::styled(name.to_string(), title_style))
            .borders(Borders::ALL)
            .border_style(border_style)
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::horizontal(1))
    }

    fn draw_buffer(&mut self, frame: &mut Frame<'_>, area: Rect, buffer: &Buffer, focused: bool) {
        if buffer.name == VIEW_BUFFER {
            self.draw_headlines(frame, area, buffer, focused);
            return;
        }
        let block = Self::buffer_block(&buffer.name, focused);
        let body = if buffer.text.is_empty() {
            Text::from(Span::styled(
                "Citations inserted from the headline view land here.",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ))
        } else {
            Text::from(buffer.text.clone())
        };
        let paragraph = Paragraph::new(body)
            .block(block)
            .style(Style::default().fg(COLOR_TEXT_PRIMARY))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn draw_headlines(&mut self, frame: &mut Frame<'_>, area: Rect, buffer: &Buffer, focused: bool) {
        let title = format!("{} ({})", buffer.name, self.controller.headlines().len());
        let block = Self::buffer_block(&title, focused);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.view_area = Some(inner);

        let lines: Vec<&str> = buffer.text.lines().collect();
        if lines.is_empty() {
            let empty = Paragraph::new(Span::styled(
                format!("No headlines in {}", self.controller.database().display()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ));
            frame.render_widget(empty, inner);
            return;
        }

        let height = inner.height.max(1) as usize;
        let selected = line_index_at(&buffer.text, buffer.point);
        if selected < self.view_offset {
            self.view_offset = selected;
        } else if selected >= self.view_offset + height {
            self.view_offset = selected + 1 - height;
        }
        self.view_offset = self.view_offset.min(lines.len().saturating_sub(1));

        let width = inner.width as usize;
        let rows: Vec<Line> = lines
            .iter()
            .enumerate()
            .skip(self.view_offset)
            .take(height)
            .map(|(index, line)| {
                let mut style = Style::default().fg(COLOR_TEXT_PRIMARY);
                if index == selected {
                    style = style
                        .bg(COLOR_PANEL_SELECTED_BG)
                        .add_modifier(Modifier::BOLD);
                }
                if Some(index) == self.hover_line {
                    style = style.fg(COLOR_ACCENT).add_modifier(Modifier::UNDERLINED);
                }
                Line::from(Span::styled(truncate_to_width(line, width), style))
            })
            .collect();
        frame.render_widget(Paragraph::new(rows), inner);
    }

    fn draw_help(&self, frame: &mut Frame<'_>, area: Rect) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);
        let help = Paragraph::new(self.controller.help_text())
            .block(
                Block::default()
                    .title(Span::styled(
                        "Help",
                        Style::default()
                            .fg(COLOR_ACCENT)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(COLOR_ACCENT))
                    .style(Style::default().bg(COLOR_PANEL_BG)),
            )
            .style(Style::default().fg(COLOR_TEXT_PRIMARY))
            .wrap(Wrap { trim: false });
        frame.render_widget(help, popup_area);
    }

    fn footer_text(&self) -> String {
        if self.help_visible {
            return "Press any key to close help".to_string();
        }

        let mut parts: Vec<&str> = Vec::new();
        match self.controller.state() {
            ViewState::Open if self.view_is_current() => {
                if !self.controller.headlines().is_empty() {
                    parts.push("Enter open");
                    parts.push("c cite");
                    parts.push("u url");
                    parts.push("j/k move");
                }
                parts.push("g reload");
                parts.push("q close");
            }
            _ => {
                parts.push("h headlines");
                parts.push("q quit");
            }
        }
        parts.push("? help");
        parts.join(" · ")
    }
}

fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|err| anyhow!("create clipboard context: {}", err))?;
    clipboard
        .set_text(text.to_string())
        .map_err(|err| anyhow!("copy citation: {}", err))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Options as ControllerOptions;
    use crate::headline::{sample_fields, HeadlineRecord};
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn model_with(db: serde_json::Value) -> (Model, NamedTempFile) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(db.to_string().as_bytes()).unwrap();
        let controller = Controller::new(ControllerOptions {
            database: file.path().to_path_buf(),
            formatter: Box::new(|record: &HeadlineRecord| record.title().to_string()),
            browser: Box::new(|_: &str| {}),
        });
        let model = Model::new(Options {
            controller,
            message_timeout: Duration::from_secs(60),
            copy_to_clipboard: false,
            open_on_start: false,
        });
        (model, file)
    }

    fn two_stories() -> serde_json::Value {
        json!([
            ["a", sample_fields("Alpha", "http://example.com/1", json!(100))],
            ["b", sample_fields("Beta", "http://example.com/2", json!(200))],
        ])
    }

    #[test]
    fn truncate_respects_wide_glyphs() {
        assert_eq!(truncate_to_width("abcdef", 4), "abcd");
        assert_eq!(truncate_to_width("🦀🦀", 3), "🦀");
        assert_eq!(truncate_to_width("ab", 10), "ab");
    }

    #[test]
    fn cells_map_to_line_positions() {
        let text = "Alpha\nBeta\n";
        let area = Rect::new(2, 3, 20, 5);
        assert_eq!(position_for_cell(text, 0, area, 4, 3), Some(2));
        assert_eq!(position_for_cell(text, 0, area, 19, 4), Some(10));
        assert_eq!(position_for_cell(text, 1, area, 2, 3), Some(6));
        assert_eq!(position_for_cell(text, 0, area, 2, 7), Some(11));
        assert_eq!(position_for_cell(text, 0, area, 0, 3), None);
    }

    #[test]
    fn keys_drive_the_view() {
        let (mut model, _db) = model_with(two_stories());
        assert!(!model.handle_key(KeyCode::Char('h')).unwrap());
        assert!(model.view_is_current());
        assert_eq!(model.status_message, "2 headlines");

        model.handle_key(KeyCode::Char('j')).unwrap();
        model.handle_key(KeyCode::Char('c')).unwrap();
        assert!(!model.view_is_current());
        assert_eq!(model.scratch_text(), "Beta <URL:http://example.com/2>");
        assert!(model.handle_key(KeyCode::Char('q')).unwrap());
    }

    #[test]
    fn quit_in_view_only_closes_it() {
        let (mut model, _db) = model_with(two_stories());
        model.handle_key(KeyCode::Enter).unwrap();
        assert!(model.view_is_current());
        assert!(!model.handle_key(KeyCode::Esc).unwrap());
        assert!(!model.view_is_current());
        assert_eq!(model.controller.state(), ViewState::Closed);
    }

    #[test]
    fn footer_follows_state() {
        let (mut model, _db) = model_with(two_stories());
        assert!(model.footer_text().contains("h headlines"));
        model.handle_key(KeyCode::Char('h')).unwrap();
        assert!(model.footer_text().contains("c cite"));
        model.handle_key(KeyCode::Char('?')).unwrap();
        assert!(model.help_visible);
        model.handle_key(KeyCode::Char('x')).unwrap();
        assert!(!model.help_visible);
    }
}
