use std::collections::VecDeque;

use ansi_to_tui::IntoText;
use ratatui::text::Span;

use crate::demux::OutputEvent;

/// Which stream (or the app itself) a log line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
    /// Lines generated by vidgrab itself (command echo, status)
    Notice,
}

/// A single display line
#[derive(Debug, Clone)]
pub struct LogLine {
    /// Where the line came from
    pub kind: StreamKind,
    /// Pre-parsed spans with styles (for rendering)
    spans: Vec<Span<'static>>,
}

impl LogLine {
    /// Create a new LogLine
    ///
    /// Parses ANSI escape sequences into styled spans.
    pub fn new(kind: StreamKind, content: String) -> Self {
        let spans = match content.as_str().into_text() {
            Ok(text) => text
                .lines
                .into_iter()
                .next()
                .map(|line| line.spans)
                .unwrap_or_else(Vec::new),
            Err(_) => vec![Span::raw(content)],
        };

        Self { kind, spans }
    }

    /// Return pre-parsed spans for rendering
    pub fn spans(&self) -> &[Span<'static>] {
        &self.spans
    }

    /// Return plain text without ANSI escape sequences (derived from spans)
    pub fn plain(&self) -> String {
        self.spans.iter().map(|s| s.content.as_ref()).collect()
    }
}

/// Ring buffer of log lines with a single replaceable tail slot
///
/// The buffer is the UI-side sink for [`OutputEvent`]s. At any time at most
/// one line is "open": the most recently written progress line, which each
/// `ReplaceCurrent` overwrites in place. Any `AppendLine` closes the open
/// line, turning it into immutable history. Old lines are discarded from the
/// front once the cap is exceeded.
pub struct LogBuffer {
    lines: VecDeque<LogLine>,
    max_lines: usize,
    open_slot: bool,
}

impl LogBuffer {
    /// Create a buffer with specified max lines (0 for unlimited)
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            max_lines,
            open_slot: false,
        }
    }

    /// Apply a demultiplexed output event from the given stream
    pub fn apply(&mut self, kind: StreamKind, event: OutputEvent) {
        match event {
            OutputEvent::AppendLine(text) => {
                let content = text.strip_suffix('\n').unwrap_or(&text).to_string();
                self.append(LogLine::new(kind, content));
            }
            OutputEvent::ReplaceCurrent(text) => {
                self.replace_current(LogLine::new(kind, text));
            }
        }
    }

    /// Append a permanent line, closing any open slot
    pub fn append(&mut self, line: LogLine) {
        self.open_slot = false;
        self.push(line);
    }

    /// Replace the open line in place, or open a new slot at the tail
    pub fn replace_current(&mut self, line: LogLine) {
        if self.open_slot {
            if let Some(last) = self.lines.back_mut() {
                *last = line;
                return;
            }
        }
        self.push(line);
        self.open_slot = true;
    }

    /// Whether the last line is still replaceable
    pub fn has_open_line(&self) -> bool {
        self.open_slot
    }

    fn push(&mut self, line: LogLine) {
        if self.max_lines > 0 && self.lines.len() >= self.max_lines {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Get lines in specified range
    pub fn get_range(&self, start: usize, count: usize) -> Vec<&LogLine> {
        self.lines.iter().skip(start).take(count).collect()
    }

    /// Return the number of lines in the buffer
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Return an iterator over all lines
    pub fn iter(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    /// Clear all lines and reset the open slot
    pub fn clear(&mut self) {
        self.lines.clear();
        self.open_slot = false;
    }
}
