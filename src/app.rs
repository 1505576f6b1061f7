use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::TableState;
use tracing::{debug, info, warn};

use crate::config::Endpoints;
use crate::network::{spawn_upload, EventSender, LiveConnection, NetEvent, StreamEvent};
use crate::state::{DisplayState, Epoch, UploadOutcome};

const PAGE: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing the path of a capture to upload.
    UploadPrompt { path: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Last thing worth telling the user, shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

pub struct App {
    pub state: DisplayState<LiveConnection>,
    pub endpoints: Endpoints,
    pub input: InputMode,
    pub table_state: TableState,
    pub notice: Option<Notice>,
    pub should_quit: bool,
    /// Error frame sent by the server during the current live session.
    server_error: Option<String>,
    client: reqwest::Client,
    events: EventSender,
}

impl App {
    pub fn new(endpoints: Endpoints, events: EventSender) -> Self {
        Self {
            state: DisplayState::new(),
            endpoints,
            input: InputMode::Normal,
            table_state: TableState::default(),
            notice: None,
            should_quit: false,
            server_error: None,
            client: reqwest::Client::new(),
            events,
        }
    }

    pub fn toggle_live(&mut self) {
        if self.state.is_live() {
            self.stop_live();
        } else {
            self.start_live();
        }
    }

    pub fn start_live(&mut self) {
        let url = self.endpoints.live().clone();
        let events = self.events.clone();
        match self
            .state
            .start_live(|epoch| LiveConnection::open(url.clone(), epoch, events))
        {
            Ok(_) => {
                self.table_state.select(None);
                self.server_error = None;
                self.notice = Some(Notice::info(format!("Connecting to {url}")));
            }
            Err(err) => debug!(error = %err, "ignoring start request"),
        }
    }

    pub fn stop_live(&mut self) {
        if self.state.stop_live() {
            self.notice = Some(Notice::info("Live capture stopped"));
        }
    }

    /// Sends the capture at `path` to the server. A blank path does nothing.
    pub fn upload(&mut self, path: &str) -> bool {
        let path = path.trim();
        if path.is_empty() {
            return false;
        }
        let file = PathBuf::from(path);
        let ticket = self.state.begin_upload();
        info!(file = %file.display(), "upload requested");
        self.notice = Some(Notice::info(format!("Uploading {}", file.display())));
        spawn_upload(
            self.client.clone(),
            self.endpoints.upload().clone(),
            file,
            ticket,
            self.events.clone(),
        );
        true
    }

    pub fn handle_net_event(&mut self, event: NetEvent) {
        match event {
            NetEvent::Live { epoch, event } => self.handle_stream_event(epoch, event),
            NetEvent::Upload {
                ticket,
                file,
                result,
            } => match self.state.finish_upload(ticket, result) {
                UploadOutcome::Applied { count } => {
                    self.table_state.select(None);
                    self.notice = Some(Notice::info(format!(
                        "Loaded {count} packets from {}",
                        file.display()
                    )));
                }
                UploadOutcome::Failed(err) => {
                    warn!(file = %file.display(), error = %err, "upload failed");
                    self.notice = Some(Notice::error(format!("Upload failed: {err}")));
                }
                UploadOutcome::Superseded => {
                    debug!(file = %file.display(), "discarding superseded upload result");
                }
            },
        }
    }

    fn handle_stream_event(&mut self, epoch: Epoch, event: StreamEvent) {
        let current = self.state.current_epoch() == Some(epoch);
        match event {
            StreamEvent::Packet(record) => {
                self.state.apply_packet(epoch, record);
            }
            StreamEvent::Connected if current => {
                self.notice = Some(Notice::info(format!(
                    "Live: connected to {}",
                    self.endpoints.live()
                )));
            }
            StreamEvent::Malformed(reason) => {
                if self.state.note_skipped(epoch) {
                    warn!(epoch = epoch.get(), %reason, "skipping malformed live message");
                }
            }
            StreamEvent::ServerError(message) if current => {
                warn!(epoch = epoch.get(), %message, "server reported an error");
                self.notice = Some(Notice::error(format!("Server: {message}")));
                self.server_error = Some(message);
            }
            StreamEvent::Closed(reason) => {
                if self.state.connection_lost(epoch) {
                    // The server drops the socket right after an error frame;
                    // its message says more than the transport error does.
                    self.notice = Some(match (self.server_error.take(), reason) {
                        (Some(message), _) => {
                            Notice::error(format!("Server: {message} (live stream closed)"))
                        }
                        (None, Some(reason)) => {
                            Notice::error(format!("Live stream lost: {reason}"))
                        }
                        (None, None) => Notice::info("Live stream ended by server"),
                    });
                }
            }
            _ => debug!(epoch = epoch.get(), "event from a closed connection"),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match &mut self.input {
            InputMode::UploadPrompt { path } => match key.code {
                KeyCode::Enter => {
                    let path = std::mem::take(path);
                    self.input = InputMode::Normal;
                    self.upload(&path);
                }
                KeyCode::Esc => self.input = InputMode::Normal,
                KeyCode::Backspace => {
                    path.pop();
                }
                KeyCode::Char(c) => path.push(c),
                _ => {}
            },
            InputMode::Normal => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
                KeyCode::Char(' ') | KeyCode::Char('l') => self.toggle_live(),
                KeyCode::Char('s') => self.stop_live(),
                KeyCode::Char('u') => {
                    self.input = InputMode::UploadPrompt {
                        path: String::new(),
                    }
                }
                KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
                KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1),
                KeyCode::PageDown => self.scroll_by(PAGE as isize),
                KeyCode::PageUp => self.scroll_by(-(PAGE as isize)),
                KeyCode::Home | KeyCode::Char('g') => self.scroll_to(0),
                KeyCode::End | KeyCode::Char('G') => {
                    self.scroll_to(self.state.packets().len().saturating_sub(1))
                }
                _ => {}
            },
        }
    }

    fn scroll_by(&mut self, delta: isize) {
        let current = self.table_state.selected().unwrap_or(0) as isize;
        self.scroll_to(current.saturating_add(delta).max(0) as usize);
    }

    fn scroll_to(&mut self, index: usize) {
        let len = self.state.packets().len();
        if len == 0 {
            self.table_state.select(None);
        } else {
            self.table_state.select(Some(index.min(len - 1)));
        }
    }

    /// Closes the live connection; called once before the viewer exits.
    pub fn shutdown(&mut self) {
        self.state.shutdown();
    }
}
