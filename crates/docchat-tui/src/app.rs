use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use docchat_core::upload;
use docchat_core::{ApiError, ChatSession, DocumentApi, QueryReply, SelectedFile, UploadReply};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing a question
    Query,
    /// Typing the path of the file to upload
    UploadPath,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Single-line text field with a character-based cursor.
#[derive(Debug, Clone, Default)]
pub struct LineInput {
    pub text: String,
    pub cursor: usize,
}

impl LineInput {
    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars().filter(|c| !c.is_control()) {
            self.insert(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.len() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.len());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.len();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Turn whatever the user typed or dropped onto the terminal into a path.
///
/// Handles surrounding quotes, backslash-escaped spaces from drag and drop,
/// `file://` prefixes and a leading `~/`.
pub fn normalize_path(raw: &str) -> Option<PathBuf> {
    let mut s = raw.trim();
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            s = &s[1..s.len() - 1];
        }
    }
    let s = s.strip_prefix("file://").unwrap_or(s);
    let s = s.replace("\\ ", " ");

    if s.is_empty() {
        return None;
    }

    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return Some(home.join(rest));
        }
    }
    Some(PathBuf::from(s))
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    pub session: ChatSession,
    api: Arc<dyn DocumentApi>,
    pub api_base: String,

    pub query_input: LineInput,
    pub path_input: LineInput,

    pub upload_task: Option<JoinHandle<Result<UploadReply, ApiError>>>,
    pub query_task: Option<JoinHandle<Result<QueryReply, ApiError>>>,

    // Chat view
    pub selected_message: Option<usize>,
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    seen_messages: usize,
    seen_loading: bool,

    pub animation_frame: u8,
}

impl App {
    pub fn new(session: ChatSession, api: Arc<dyn DocumentApi>, api_base: String) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,

            session,
            api,
            api_base,

            query_input: LineInput::default(),
            path_input: LineInput::default(),

            upload_task: None,
            query_task: None,

            selected_message: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            seen_messages: 0,
            seen_loading: false,

            animation_frame: 0,
        }
    }

    /// Uploads are refused while any request is still out.
    pub fn can_upload(&self) -> bool {
        !self.session.flags().busy()
    }

    /// Queries need an accepted document and nothing in flight.
    pub fn can_query(&self) -> bool {
        self.session.query_enabled() && !self.session.flags().busy()
    }

    pub fn open_upload_prompt(&mut self) {
        if self.can_upload() {
            self.input_mode = InputMode::UploadPath;
        }
    }

    /// A running upload may still revoke the gate, so the input stays shut until it settles.
    pub fn open_query_input(&mut self) {
        if self.session.query_enabled() && !self.session.flags().uploading {
            self.input_mode = InputMode::Query;
        }
    }

    /// Start uploading the file named in the path prompt.
    pub fn start_upload(&mut self) {
        if !self.can_upload() {
            log::debug!("upload ignored: a request is in flight");
            return;
        }
        let Some(path) = normalize_path(&self.path_input.text) else {
            return;
        };

        let file = SelectedFile::from_path(path);
        // The prompt is reset after every attempt so the same file can be picked again.
        self.path_input.clear();
        self.input_mode = InputMode::Normal;

        if !self.session.begin_upload(&file) {
            return;
        }

        let api = Arc::clone(&self.api);
        self.upload_task = Some(tokio::spawn(async move {
            upload::send_file(api.as_ref(), &file).await
        }));
    }

    /// Send the current question.
    pub fn submit_query(&mut self) {
        if !self.can_query() {
            log::debug!("query ignored: gate closed or request in flight");
            return;
        }
        let Some(query) = self.session.begin_query(&mut self.query_input.text) else {
            return;
        };
        self.query_input.clear();
        self.input_mode = InputMode::Normal;

        let api = Arc::clone(&self.api);
        self.query_task = Some(tokio::spawn(async move { api.query(&query).await }));
    }

    /// Apply the result of any request task that has finished.
    ///
    /// A task that panicked or was cancelled still settles the session, so
    /// the in-flight flags can't be left raised.
    pub async fn poll_tasks(&mut self) {
        if self.upload_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.upload_task.take() {
                let outcome = task
                    .await
                    .unwrap_or_else(|e| Err(ApiError::Interrupted(e.to_string())));
                self.session.finish_upload(outcome);
                if !self.session.query_enabled() && self.input_mode == InputMode::Query {
                    self.input_mode = InputMode::Normal;
                }
            }
        }

        if self.query_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.query_task.take() {
                let outcome = task
                    .await
                    .unwrap_or_else(|e| Err(ApiError::Interrupted(e.to_string())));
                self.session.finish_query(outcome);
            }
        }

        self.follow_log();
    }

    /// Keep the newest message in view whenever the log grows.
    pub fn follow_log(&mut self) {
        let len = self.session.log().len();
        let loading = self.session.flags().loading;
        if len != self.seen_messages || loading != self.seen_loading {
            self.seen_messages = len;
            self.seen_loading = loading;
            if len > 0 {
                self.selected_message = Some(len - 1);
            }
            self.scroll_chat_to_bottom();
        }
    }

    pub fn copy_selected(&mut self) {
        if let Some(index) = self.selected_message {
            self.session.copy_message(index, Instant::now());
        }
    }

    pub fn select_next_message(&mut self) {
        let len = self.session.log().len();
        if len > 0 {
            let current = self.selected_message.unwrap_or(0);
            self.selected_message = Some((current + 1).min(len - 1));
        }
    }

    pub fn select_prev_message(&mut self) {
        if let Some(current) = self.selected_message {
            self.selected_message = Some(current.saturating_sub(1));
        } else if !self.session.log().is_empty() {
            self.selected_message = Some(0);
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    /// Tick event: advance the "Thinking..." dots and expire the copy marker.
    pub fn on_tick(&mut self) {
        if self.session.flags().loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        self.session.tick(Instant::now());
    }

    /// Scroll chat to bottom so the newest message (or "Thinking...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.session.log().iter() {
            total_lines = total_lines.saturating_add(1); // "You:" / "AI:" line
            for line in msg.text.lines() {
                let char_count = line.chars().count();
                let wrapped = if char_count == 0 { 1 } else { char_count / wrap_width + 1 };
                total_lines = total_lines.saturating_add(wrapped as u16);
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        if self.session.flags().loading {
            total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };

        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }
}
