//! The single owned state record behind the chat screen.
//!
//! Every mutation goes through one of four entry points: upload, query,
//! copy and the periodic tick that expires the copy marker. Requests are
//! split into a synchronous `begin_*` step, the network call, and a
//! synchronous `finish_*` step so that an event loop can run the call on a
//! background task and apply the result later; `submit_*` chains the three
//! for callers that can simply await.

use std::time::Instant;

use crate::api::{DocumentApi, QueryReply, UploadReply};
use crate::clipboard::{ClipboardService, CopyOutcome, COPY_FAILED};
use crate::error::ApiError;
use crate::state::{ChatMessage, ConversationLog, InFlight, Notice, PendingReply, RequestFlags, EMPTY_REPLY};
use crate::upload::{self, SelectedFile, UploadGate, DEFAULT_UPLOAD_FAILURE, DEFAULT_UPLOAD_SUCCESS, INVALID_FILE_TYPE};

pub struct ChatSession {
    gate: UploadGate,
    log: ConversationLog,
    flags: RequestFlags,
    notice: Option<Notice>,
    clipboard: ClipboardService,
}

impl ChatSession {
    pub fn new(clipboard: ClipboardService) -> Self {
        Self {
            gate: UploadGate::new(),
            log: ConversationLog::new(),
            flags: RequestFlags::default(),
            notice: None,
            clipboard,
        }
    }

    pub fn gate(&self) -> &UploadGate {
        &self.gate
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn flags(&self) -> RequestFlags {
        self.flags
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Whether the query input should be offered at all.
    pub fn query_enabled(&self) -> bool {
        self.gate.is_accepted()
    }

    pub fn chat_started(&self) -> bool {
        !self.log.is_empty()
    }

    /// Message index showing the "copied" marker at `now`.
    pub fn acknowledged(&self, now: Instant) -> Option<usize> {
        self.clipboard.acknowledged(now)
    }

    // Upload

    /// Check the file type and mark an upload as started.
    ///
    /// Returns false when the file was rejected locally; in that case the
    /// only change is the error notice and nothing should be sent.
    pub fn begin_upload(&mut self, file: &SelectedFile) -> bool {
        if !file.is_pdf() {
            log::warn!("rejected {} ({})", file.name, file.mime);
            self.notice = Some(Notice::error(INVALID_FILE_TYPE));
            return false;
        }

        self.notice = None;
        self.flags.uploading = true;
        self.gate.attempt(file);
        log::info!("uploading {}", file.name);
        true
    }

    pub fn finish_upload(&mut self, outcome: Result<UploadReply, ApiError>) {
        match outcome {
            Ok(reply) => {
                let text = reply
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| DEFAULT_UPLOAD_SUCCESS.to_string());
                log::info!("upload accepted: {}", text);
                self.gate.settle(true);
                self.notice = Some(Notice::success(text));
            }
            Err(e) => {
                log::error!("upload failed: {}", e);
                let detail = e.detail().unwrap_or_else(|| DEFAULT_UPLOAD_FAILURE.to_string());
                self.gate.settle(false);
                self.notice = Some(Notice::error(format!("⚠️ {}", detail)));
            }
        }
        self.flags.uploading = false;
    }

    pub async fn submit_upload<A>(&mut self, api: &A, file: &SelectedFile)
    where
        A: DocumentApi + ?Sized,
    {
        if !self.begin_upload(file) {
            return;
        }

        let outcome = {
            let _uploading = InFlight::hold(&mut self.flags.uploading);
            upload::send_file(api, file).await
        };
        self.finish_upload(outcome);
    }

    // Query

    /// Record the user's message and mark a query as started.
    ///
    /// Whitespace-only input is ignored without touching anything, input
    /// buffer included. Otherwise the buffer is cleared and the trimmed text
    /// to send is returned.
    pub fn begin_query(&mut self, input: &mut String) -> Option<String> {
        let query = input.trim();
        if query.is_empty() {
            return None;
        }
        let query = query.to_string();

        self.notice = None;
        self.log.push(ChatMessage::user(query.clone()));
        input.clear();
        self.flags.loading = true;
        log::debug!("query #{} started", self.log.len());
        Some(query)
    }

    /// Append the assistant's reply, or the failure, as the next message.
    pub fn finish_query(&mut self, outcome: Result<QueryReply, ApiError>) {
        let message = match outcome {
            Ok(reply) => ChatMessage::assistant(
                reply
                    .response
                    .filter(|r| !r.is_empty())
                    .unwrap_or_else(|| EMPTY_REPLY.to_string()),
            ),
            Err(e) => {
                log::error!("query failed: {}", e);
                ChatMessage::failure(e.detail().as_deref())
            }
        };
        self.log.push(message);
        self.flags.loading = false;
    }

    /// Returns false when the input was blank and nothing was sent.
    pub async fn submit_query<A>(&mut self, api: &A, input: &mut String) -> bool
    where
        A: DocumentApi + ?Sized,
    {
        let Some(query) = self.begin_query(input) else {
            return false;
        };

        let outcome = {
            let pending = PendingReply::hold(&mut self.log, &mut self.flags.loading);
            let outcome = api.query(&query).await;
            pending.settle();
            outcome
        };
        self.finish_query(outcome);
        true
    }

    // Clipboard

    /// Copy the message at `index`; out-of-range indices are ignored.
    pub fn copy_message(&mut self, index: usize, now: Instant) {
        let Some(message) = self.log.get(index) else {
            return;
        };
        match self.clipboard.copy(&message.text, index, now) {
            Ok(CopyOutcome::Copied { tier }) => log::info!("message {} copied via {}", index, tier),
            Ok(CopyOutcome::Skipped) => {}
            Err(e) => {
                log::error!("copy failed: {}", e);
                self.notice = Some(Notice::error(COPY_FAILED));
            }
        }
    }

    /// Expire the copy marker. Returns true when something changed on screen.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.clipboard.expire(now)
    }
}
