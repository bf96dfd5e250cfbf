use crate::buffer::{LogBuffer, LogLine, StreamKind};
use crate::demux::OutputEvent;

/// Download session status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadStatus {
    /// No download yet
    Idle,
    /// Subprocess running
    Running,
    /// Subprocess exited with this code (0 is success)
    Finished { exit_code: i32 },
    /// Could not launch, or exit status indeterminate
    Failed { reason: String },
    /// Stopped on user request
    Canceled,
}

/// Scrollable view over the download log
pub struct LogView {
    buffer: LogBuffer,
    status: DownloadStatus,
    scroll_offset: usize,
    auto_scroll: bool,
    visible_lines: usize,
}

impl LogView {
    pub fn new(max_buffer_lines: usize) -> Self {
        Self {
            buffer: LogBuffer::new(max_buffer_lines),
            status: DownloadStatus::Idle,
            scroll_offset: 0,
            auto_scroll: true,
            visible_lines: 0,
        }
    }

    pub fn status(&self) -> &DownloadStatus {
        &self.status
    }

    pub fn set_status(&mut self, status: DownloadStatus) {
        self.status = status;
    }

    /// Apply a demultiplexed output event to the log
    pub fn apply(&mut self, kind: StreamKind, event: OutputEvent) {
        self.buffer.apply(kind, event);
        if self.auto_scroll {
            self.scroll_to_bottom();
        }
    }

    /// Append an app-generated line
    pub fn push_notice(&mut self, text: impl Into<String>) {
        self.buffer.append(LogLine::new(StreamKind::Notice, text.into()));
        if self.auto_scroll {
            self.scroll_to_bottom();
        }
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    /// Set the number of visible lines
    pub fn set_visible_lines(&mut self, lines: usize) {
        self.visible_lines = lines;
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn scroll_down(&mut self) {
        let max_offset = self.max_scroll_offset();
        if self.scroll_offset < max_offset {
            self.scroll_offset += 1;
        }
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    pub fn scroll_half_page_down(&mut self) {
        let half_page = self.visible_lines / 2;
        let max_offset = self.max_scroll_offset();
        self.scroll_offset = (self.scroll_offset + half_page).min(max_offset);
    }

    pub fn scroll_half_page_up(&mut self) {
        let half_page = self.visible_lines / 2;
        self.scroll_offset = self.scroll_offset.saturating_sub(half_page);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.max_scroll_offset();
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    pub fn toggle_auto_scroll(&mut self) {
        self.auto_scroll = !self.auto_scroll;
    }

    pub fn set_auto_scroll(&mut self, enabled: bool) {
        self.auto_scroll = enabled;
    }

    /// Clear the log and scroll state for a fresh download
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scroll_offset = 0;
        self.auto_scroll = true;
    }

    fn max_scroll_offset(&self) -> usize {
        self.buffer.len().saturating_sub(self.visible_lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_with_lines(count: usize, visible: usize) -> LogView {
        let mut view = LogView::new(100);
        view.set_visible_lines(visible);
        for i in 0..count {
            view.push_notice(format!("line{}", i));
        }
        view
    }

    #[test]
    fn log_view_new_is_idle_and_following() {
        let view = LogView::new(100);
        assert_eq!(view.status(), &DownloadStatus::Idle);
        assert!(view.auto_scroll());
    }

    #[test]
    fn log_view_auto_scroll_keeps_tail_visible() {
        let view = view_with_lines(20, 5);
        assert_eq!(view.scroll_offset(), 15);
    }

    #[test]
    fn log_view_scroll_up_and_down_clamp_to_bounds() {
        let mut view = view_with_lines(10, 5);
        view.scroll_to_top();

        view.scroll_up();
        assert_eq!(view.scroll_offset(), 0);

        for _ in 0..20 {
            view.scroll_down();
        }
        assert_eq!(view.scroll_offset(), 5);
    }

    #[test]
    fn log_view_half_page_scrolling() {
        let mut view = view_with_lines(50, 10);
        view.scroll_to_top();

        view.scroll_half_page_down();
        assert_eq!(view.scroll_offset(), 5);

        view.scroll_half_page_up();
        assert_eq!(view.scroll_offset(), 0);
    }

    #[test]
    fn log_view_disabling_follow_freezes_offset() {
        let mut view = LogView::new(100);
        view.set_visible_lines(5);
        view.set_auto_scroll(false);

        for i in 0..20 {
            view.push_notice(format!("line{}", i));
        }
        assert_eq!(view.scroll_offset(), 0);
    }

    #[test]
    fn log_view_progress_events_follow_tail() {
        let mut view = LogView::new(100);
        view.set_visible_lines(2);
        for i in 0..5 {
            view.apply(
                StreamKind::Stdout,
                OutputEvent::AppendLine(format!("line{}\n", i)),
            );
        }
        view.apply(StreamKind::Stdout, OutputEvent::ReplaceCurrent("50%".into()));

        assert!(view.buffer().has_open_line());
        assert_eq!(view.scroll_offset(), 4); // 6 lines, 2 visible
    }

    #[test]
    fn log_view_reset_clears_buffer_and_scroll() {
        let mut view = view_with_lines(20, 5);
        view.set_status(DownloadStatus::Finished { exit_code: 0 });
        view.set_auto_scroll(false);

        view.reset();

        assert!(view.buffer().is_empty());
        assert_eq!(view.scroll_offset(), 0);
        assert!(view.auto_scroll());
        // Status is owned by the session lifecycle, not the reset
        assert_eq!(view.status(), &DownloadStatus::Finished { exit_code: 0 });
    }
}
