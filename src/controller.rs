use std::path::{Path, PathBuf};

use crate::browse::Browser;
use crate::error::{Error, Result};
use crate::headline::{Formatter, HeadlineEntry, HeadlineRecord};
use crate::store;
use crate::surface::{TextSurface, SCRATCH_BUFFER};

pub const VIEW_BUFFER: &str = "*Slashdot Headlines*";

pub const HELP_TEXT: &str = "Slashdot headlines\n\n\
Enter, Space  open the story on this line in a browser\n\
Mouse click   open the story under the pointer\n\
c             insert \"title <URL:url>\" into the calling buffer\n\
u             insert \"<URL:url>\" into the calling buffer\n\
g             reload the headline database\n\
j/k, ↑/↓      move between headlines\n\
q, Esc        close the headline view\n\
?             show this help";

pub struct Options {
    pub database: PathBuf,
    pub formatter: Formatter,
    pub browser: Box<dyn Browser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Found(&'a HeadlineEntry),
    NotFound,
}

/// Owns the headline view: the records it shows and the buffer to return to.
pub struct Controller {
    database: PathBuf,
    formatter: Formatter,
    browser: Box<dyn Browser>,
    headlines: Vec<HeadlineEntry>,
    last_buffer: Option<String>,
    state: ViewState,
}

impl Controller {
    pub fn new(opts: Options) -> Self {
        Self {
            database: opts.database,
            formatter: opts.formatter,
            browser: opts.browser,
            headlines: Vec::new(),
            last_buffer: None,
            state: ViewState::Closed,
        }
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    pub fn headlines(&self) -> &[HeadlineEntry] {
        &self.headlines
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn last_buffer(&self) -> Option<&str> {
        self.last_buffer.as_deref()
    }

    pub fn format(&self, record: &HeadlineRecord) -> String {
        (self.formatter)(record)
    }

    pub fn help_text(&self) -> &'static str {
        HELP_TEXT
    }

    pub fn open(&mut self, surface: &mut dyn TextSurface) -> Result<()> {
        if surface.current_buffer() != VIEW_BUFFER {
            self.last_buffer = Some(surface.current_buffer().to_string());
        }
        surface.pop_to_buffer(VIEW_BUFFER);
        self.state = ViewState::Open;
        self.reload(surface)?;
        surface.set_read_only(true);
        Ok(())
    }

    pub fn refresh(&mut self, surface: &mut dyn TextSurface) -> Result<()> {
        if surface.current_buffer() != VIEW_BUFFER {
            return Err(Error::NotHeadlineView);
        }
        self.reload(surface)
    }

    fn reload(&mut self, surface: &mut dyn TextSurface) -> Result<()> {
        let loaded = store::load(&self.database)?;
        if let Some(notice) = loaded.notice.as_deref() {
            surface.message(notice);
        }
        self.headlines = loaded.entries;
        self.render(surface);
        Ok(())
    }

    /// Writes one line per headline into the selected buffer.
    pub fn render(&self, surface: &mut dyn TextSurface) {
        let mut text = String::new();
        let mut spans = Vec::with_capacity(self.headlines.len());
        let mut position = 0usize;
        for entry in &self.headlines {
            let line = self.format(&entry.record).replace(['\n', '\r'], " ");
            let start = position;
            position += line.chars().count();
            spans.push(start..position);
            text.push_str(&line);
            text.push('\n');
            position += 1;
        }

        surface.set_text(&text);
        for span in spans {
            surface.mark_hoverable(span);
        }
        surface.set_point(0);
    }

    pub fn current_record(&self, surface: &dyn TextSurface) -> Lookup<'_> {
        if surface.current_buffer() != VIEW_BUFFER {
            return Lookup::NotFound;
        }
        self.record_at_line(line_index_at(surface.text(), surface.point()))
    }

    pub fn record_at_line(&self, line: usize) -> Lookup<'_> {
        match self.headlines.get(line) {
            Some(entry) => Lookup::Found(entry),
            None => Lookup::NotFound,
        }
    }

    pub fn select_and_open(&mut self, surface: &mut dyn TextSurface) -> Result<()> {
        let url = match self.current_record(surface) {
            Lookup::Found(entry) => entry.record.url().to_string(),
            Lookup::NotFound => return Err(Error::NoHeadlineOnLine),
        };
        surface.message(&format!("loading {url}"));
        tracing::info!(%url, "opening headline");
        if let Some(report) = self.browser.open(&url) {
            surface.message(&report);
        }
        Ok(())
    }

    pub fn select_at_pointer(
        &mut self,
        surface: &mut dyn TextSurface,
        position: usize,
    ) -> Result<()> {
        surface.set_point(position);
        self.select_and_open(surface)
    }

    /// Inserts `title <URL:url>` into the calling buffer and closes the view.
    /// Returns the inserted text.
    pub fn insert_citation(&mut self, surface: &mut dyn TextSurface) -> Result<String> {
        let text = match self.current_record(surface) {
            Lookup::Found(entry) => entry.record.citation(),
            Lookup::NotFound => return Err(Error::NoHeadlineOnLine),
        };
        self.insert_into_last_buffer(surface, &text);
        Ok(text)
    }

    /// Inserts `<URL:url>` into the calling buffer and closes the view.
    pub fn insert_url_only(&mut self, surface: &mut dyn TextSurface) -> Result<String> {
        let text = match self.current_record(surface) {
            Lookup::Found(entry) => entry.record.url_reference(),
            Lookup::NotFound => return Err(Error::NoHeadlineOnLine),
        };
        self.insert_into_last_buffer(surface, &text);
        Ok(text)
    }

    fn insert_into_last_buffer(&mut self, surface: &mut dyn TextSurface, text: &str) {
        let target = self.return_buffer();
        surface.switch_to_buffer(&target);
        surface.insert(text);
        tracing::debug!(buffer = %target, "inserted headline reference");
        self.close(surface);
    }

    pub fn close(&mut self, surface: &mut dyn TextSurface) {
        let target = self.return_buffer();
        surface.kill_buffer(VIEW_BUFFER);
        surface.switch_to_buffer(&target);
        surface.delete_other_windows();
        self.headlines.clear();
        self.last_buffer = None;
        self.state = ViewState::Closed;
    }

    fn return_buffer(&self) -> String {
        self.last_buffer
            .clone()
            .unwrap_or_else(|| SCRATCH_BUFFER.to_string())
    }

    /// Moves point by whole lines, staying on rendered headlines.
    pub fn move_lines(&self, surface: &mut dyn TextSurface, delta: isize) {
        if surface.current_buffer() != VIEW_BUFFER || self.headlines.is_empty() {
            return;
        }
        let last = self.headlines.len() as isize - 1;
        let current = line_index_at(surface.text(), surface.point()) as isize;
        let target = (current + delta).clamp(0, last) as usize;
        let start = line_start(surface.text(), target);
        surface.set_point(start);
    }
}

/// Number of line terminators strictly before `position`.
pub fn line_index_at(text: &str, position: usize) -> usize {
    text.chars()
        .take(position)
        .filter(|ch| *ch == '\n')
        .count()
}

/// Position of the first character of `line`, or the end of `text`.
pub fn line_start(text: &str, line: usize) -> usize {
    if line == 0 {
        return 0;
    }
    text.chars()
        .enumerate()
        .filter(|(_, ch)| *ch == '\n')
        .nth(line - 1)
        .map(|(index, _)| index + 1)
        .unwrap_or_else(|| text.chars().count())
}
