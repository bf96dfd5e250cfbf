use std::time::Duration;

use tokio::sync::oneshot;
use tui_input::Input;

use crate::command::{self, CookieSource, DownloadRequest, DownloadRunner, SessionHandle};
use crate::config::{self, Settings};
use crate::cookies::CookieStore;
use crate::demux::OutputEvent;
use crate::event::SessionEvent;
use crate::recovery::{RecoveryAction, RecoveryClassifier};
use crate::tui::{DownloadStatus, LogView};

/// Application mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Normal mode
    Normal,
    /// Editing the URL field
    EditUrl,
    /// Collecting replacement cookies for a blocked download
    CookiePrompt,
}

/// How long each UI tick waits on the session channel per event
const RECV_TIMEOUT: Duration = Duration::from_millis(1);

/// Cap on events drained per tick so rendering stays responsive
const MAX_EVENTS_PER_TICK: usize = 256;

/// Application state
///
/// The single owner of all display state. Background reader tasks post
/// events through the session channel; this struct drains them on the UI
/// tick and is the only writer of the log view.
pub struct App {
    settings: Settings,
    url: Input,
    view: LogView,
    mode: Mode,
    /// The one download slot; a new download cancels the running one first
    session: Option<SessionHandle>,
    cookie_store: CookieStore,
    classifier: RecoveryClassifier,
    cancel_requested: bool,
    /// Request waiting for the slot to free up
    queued: Option<DownloadRequest>,
    /// Request to retry once the user supplies cookies
    recovery_pending: Option<DownloadRequest>,
    current_request: Option<DownloadRequest>,
    /// One automatic cookie-recovery restart per logical download
    retried: bool,
    cookie_entry: String,
    update_notice: Option<String>,
    update_probe: Option<oneshot::Receiver<Option<String>>>,
    should_quit: bool,
}

impl App {
    /// Initialize the application
    pub fn new(settings: Settings, url: Option<String>, cookie_store: CookieStore) -> Self {
        let view = LogView::new(settings.max_log_lines);
        Self {
            url: Input::new(url.unwrap_or_default()),
            view,
            mode: Mode::Normal,
            session: None,
            cookie_store,
            classifier: RecoveryClassifier::default(),
            cancel_requested: false,
            queued: None,
            recovery_pending: None,
            current_request: None,
            retried: false,
            cookie_entry: String::new(),
            update_notice: None,
            update_probe: None,
            should_quit: false,
            settings,
        }
    }

    /// Start a download for the URL currently in the field
    pub fn start_download(&mut self) {
        let url = self.url.value().trim().to_string();
        if url.is_empty() {
            self.view.push_notice("enter a video URL first");
            return;
        }

        let request = DownloadRequest {
            url,
            dest_dir: self.settings.download_dir.clone(),
            preset: self.settings.format,
            cookies: self.settings.cookie_source.clone(),
        };
        self.retried = false;
        self.launch(request);
    }

    fn launch(&mut self, request: DownloadRequest) {
        if self.session.is_some() {
            // Single download slot: cancel the running session and queue
            // the new request until the slot is reaped
            self.view.push_notice("canceling current download first");
            self.queued = Some(request);
            self.request_cancel();
            return;
        }
        self.spawn_now(request);
    }

    fn spawn_now(&mut self, request: DownloadRequest) {
        self.view.reset();

        if !request.dest_dir.is_dir() {
            self.fail_launch(crate::Error::MissingDownloadDir(request.dest_dir.clone()));
            return;
        }

        let tools = match command::discover_tools() {
            Ok(tools) => tools,
            Err(e) => {
                self.fail_launch(e);
                return;
            }
        };

        let argv = command::build_args(&request, self.cookie_store.path(), &tools);

        self.view.push_notice(format!("Downloading: {}", request.url));
        self.view
            .push_notice(format!("Format: {}", request.preset.label()));
        self.view
            .push_notice(format!("Cookies: {}", request.cookies.label()));
        self.view.push_notice(format!("Command: {}", argv.join(" ")));

        match DownloadRunner::spawn(&argv) {
            Ok(handle) => {
                tracing::info!(url = %request.url, pid = ?handle.pid(), "download started");
                self.session = Some(handle);
                self.cancel_requested = false;
                self.current_request = Some(request);
                self.view.set_status(DownloadStatus::Running);
            }
            Err(e) => self.fail_launch(e),
        }
    }

    /// Launch failure: reported once, before any streaming begins
    fn fail_launch(&mut self, e: crate::Error) {
        tracing::error!(error = %e, "launch failed");
        self.view.push_notice(e.to_string());
        self.view.set_status(DownloadStatus::Failed {
            reason: e.to_string(),
        });
    }

    /// Request cancellation of the running download
    ///
    /// Cooperative: the child gets SIGTERM, the readers observe
    /// end-of-stream and the session is reaped on a later tick.
    pub fn cancel_download(&mut self) {
        if self.session.is_some() {
            self.view.push_notice("cancel requested");
            self.request_cancel();
        }
    }

    fn request_cancel(&mut self) {
        if let Some(handle) = &self.session {
            handle.terminate();
            self.cancel_requested = true;
        }
    }

    /// Drain pending session events on the UI tick
    pub async fn poll_session(&mut self) {
        let mut events = Vec::new();
        let mut closed = false;

        if let Some(handle) = self.session.as_mut() {
            while events.len() < MAX_EVENTS_PER_TICK {
                match tokio::time::timeout(RECV_TIMEOUT, handle.next_event()).await {
                    Ok(Some(event)) => events.push(event),
                    Ok(None) => {
                        closed = true;
                        break;
                    }
                    Err(_) => break, // no event ready yet
                }
            }
        }

        for event in events {
            self.apply_session_event(event);
        }
        if closed {
            self.reap_session().await;
        }
        self.maybe_start_queued();
        self.poll_update_probe();
    }

    fn apply_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Output { kind, event } => {
                if let OutputEvent::AppendLine(text) = &event
                    && self.recovery_pending.is_none()
                    && !self.retried
                    && let Some(RecoveryAction::PromptForCookies) = self.classifier.classify(text)
                {
                    self.begin_cookie_recovery();
                }
                self.view.apply(kind, event);
            }
            SessionEvent::ReadError { kind, message } => {
                tracing::warn!(?kind, %message, "read error, treating as end of stream");
                self.view.push_notice(format!("read error: {message}"));
            }
        }
    }

    fn begin_cookie_recovery(&mut self) {
        let Some(request) = self.current_request.clone() else {
            return;
        };
        tracing::info!(url = %request.url, "auth wall detected, prompting for cookies");
        self.retried = true;
        self.recovery_pending = Some(request);
        self.cookie_entry.clear();
        self.mode = Mode::CookiePrompt;
        self.request_cancel();
        self.view
            .push_notice("sign-in required; paste fresh cookies to retry");
    }

    /// Channel closed: the process is done, report its terminal status
    async fn reap_session(&mut self) {
        let Some(mut handle) = self.session.take() else {
            return;
        };

        match handle.wait().await {
            Ok(exit_code) => {
                if self.recovery_pending.is_some() {
                    self.view.push_notice("download stopped, waiting for cookies");
                    self.view.set_status(DownloadStatus::Canceled);
                } else if self.cancel_requested {
                    self.view.push_notice("download canceled");
                    self.view.set_status(DownloadStatus::Canceled);
                } else if exit_code == 0 {
                    self.view.push_notice("download completed");
                    self.view.set_status(DownloadStatus::Finished { exit_code });
                } else {
                    self.view
                        .push_notice(format!("download failed (exit code {exit_code})"));
                    self.view.set_status(DownloadStatus::Finished { exit_code });
                }
                tracing::info!(exit_code, "download finished");
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not determine exit status");
                self.view
                    .push_notice(format!("could not determine exit status: {e}"));
                self.view.set_status(DownloadStatus::Failed {
                    reason: e.to_string(),
                });
            }
        }

        self.cancel_requested = false;
        self.current_request = None;
    }

    fn maybe_start_queued(&mut self) {
        if self.session.is_none()
            && let Some(request) = self.queued.take()
        {
            self.spawn_now(request);
        }
    }

    /// Persist the pasted cookies and retry the blocked download once
    pub fn submit_cookies(&mut self) {
        let contents = std::mem::take(&mut self.cookie_entry);
        self.mode = Mode::Normal;

        let Some(mut request) = self.recovery_pending.take() else {
            return;
        };

        if contents.trim().is_empty() {
            self.view.push_notice("no cookies provided, download canceled");
            return;
        }

        match self.cookie_store.save(&contents) {
            Ok(()) => {
                self.view.push_notice("cookies saved, retrying download");
                // The retry reads the freshly written file
                request.cookies = CookieSource::File;
                self.queued = Some(request);
            }
            Err(e) => {
                tracing::error!(error = %e, "cookie save failed");
                self.view.push_notice(e.to_string());
            }
        }
    }

    /// Abandon the cookie prompt; the download stays canceled
    pub fn cancel_cookie_prompt(&mut self) {
        self.cookie_entry.clear();
        self.recovery_pending = None;
        self.mode = Mode::Normal;
        self.view.push_notice("download canceled");
    }

    /// Cycle to the next format preset and persist the choice
    pub fn cycle_preset(&mut self) {
        self.settings.format = self.settings.format.cycle();
        self.persist_settings();
    }

    /// Cycle to the next cookie source and persist the choice
    pub fn cycle_cookie_source(&mut self) {
        self.settings.cookie_source = self.settings.cookie_source.cycle();
        self.persist_settings();
    }

    fn persist_settings(&self) {
        if let Err(e) = config::store_settings(&self.settings) {
            tracing::warn!(error = %e, "failed to persist settings");
        }
    }

    /// Wire up the background release check
    pub fn set_update_probe(&mut self, rx: oneshot::Receiver<Option<String>>) {
        self.update_probe = Some(rx);
    }

    fn poll_update_probe(&mut self) {
        if let Some(rx) = &mut self.update_probe {
            match rx.try_recv() {
                Ok(notice) => {
                    self.update_notice = notice;
                    self.update_probe = None;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => {
                    self.update_probe = None;
                }
            }
        }
    }

    /// Kill any running download before exit
    pub async fn shutdown(&mut self) {
        if let Some(mut handle) = self.session.take() {
            handle.terminate();
            let _ = handle.kill().await;
            let _ = handle.wait().await;
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    pub fn url(&self) -> &Input {
        &self.url
    }

    pub fn url_mut(&mut self) -> &mut Input {
        &mut self.url
    }

    /// Replace the URL field contents (paste in normal mode)
    pub fn set_url(&mut self, url: String) {
        self.url = Input::new(url);
    }

    pub fn view(&self) -> &LogView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut LogView {
        &mut self.view
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn update_notice(&self) -> Option<&str> {
        self.update_notice.as_deref()
    }

    pub fn cookie_entry(&self) -> &str {
        &self.cookie_entry
    }

    pub fn cookie_entry_mut(&mut self) -> &mut String {
        &mut self.cookie_entry
    }

    pub fn downloading(&self) -> bool {
        self.session.is_some()
    }
}
