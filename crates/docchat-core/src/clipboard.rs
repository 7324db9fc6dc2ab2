//! Copying message text to the system clipboard.
//!
//! Two tiers are tried in order: the native clipboard through `arboard`, then
//! whatever clipboard helper program the platform ships (`pbcopy`, `wl-copy`,
//! `xclip`, ...). A successful copy marks the message as acknowledged for
//! [`ACK_WINDOW`]; only the most recent copy is ever acknowledged.

use std::io::{self, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use arboard::Clipboard;

use crate::error::CopyError;

pub const ACK_WINDOW: Duration = Duration::from_millis(2000);

/// Banner text when no tier managed to copy.
pub const COPY_FAILED: &str = "Failed to copy text. Please copy manually.";

/// One way of putting text on the clipboard.
pub trait TextCopier {
    fn name(&self) -> &'static str;

    fn copy_text(&mut self, text: &str) -> Result<(), CopyError>;
}

/// Native clipboard. Only usable when a display server or pasteboard is
/// reachable; the handle is opened on first use and kept so the copied
/// contents outlive the call on X11.
#[derive(Default)]
pub struct SystemClipboardCopier {
    clipboard: Option<Clipboard>,
}

impl SystemClipboardCopier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TextCopier for SystemClipboardCopier {
    fn name(&self) -> &'static str {
        "system clipboard"
    }

    fn copy_text(&mut self, text: &str) -> Result<(), CopyError> {
        if self.clipboard.is_none() {
            self.clipboard = Some(Clipboard::new()?);
        }
        let clipboard = self.clipboard.as_mut().ok_or(CopyError::Unavailable)?;
        clipboard.set_text(text.to_string())?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl HelperCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Pipes text into an external clipboard program.
pub struct HelperCommandCopier {
    candidates: Vec<HelperCommand>,
}

impl HelperCommandCopier {
    pub fn new(candidates: Vec<HelperCommand>) -> Self {
        Self { candidates }
    }

    /// Helpers for the current platform, most specific first.
    pub fn platform_default() -> Self {
        let mut candidates = Vec::new();

        if cfg!(target_os = "macos") {
            candidates.push(HelperCommand::new("pbcopy", &[]));
        } else if cfg!(target_os = "windows") {
            candidates.push(HelperCommand::new("clip", &[]));
        } else {
            if std::env::var_os("WAYLAND_DISPLAY").is_some() {
                candidates.push(HelperCommand::new("wl-copy", &[]));
            }
            candidates.push(HelperCommand::new("xclip", &["-selection", "clipboard"]));
            candidates.push(HelperCommand::new("xsel", &["--clipboard", "--input"]));
        }

        Self::new(candidates)
    }

    pub fn candidates(&self) -> &[HelperCommand] {
        &self.candidates
    }
}

impl TextCopier for HelperCommandCopier {
    fn name(&self) -> &'static str {
        "clipboard helper"
    }

    /// Tries each candidate in turn. Fails with the last helper's I/O error,
    /// or `NoHelper` when none of them could even be started.
    fn copy_text(&mut self, text: &str) -> Result<(), CopyError> {
        let mut failure = None;

        for command in &self.candidates {
            // The guard owns the child from here on: if it is not finished
            // it gets killed and reaped.
            let mut helper = match HelperProcess::spawn(command) {
                Ok(helper) => helper,
                Err(e) => {
                    log::debug!("clipboard helper {} not usable: {}", command.program, e);
                    continue;
                }
            };

            match helper.feed(text).and_then(|()| helper.finish()) {
                Ok(status) => {
                    if !status.success() {
                        log::debug!("clipboard helper {} exited with {}", command.program, status);
                    }
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("clipboard helper {} failed: {}", command.program, e);
                    failure = Some(e);
                }
            }
        }

        Err(failure.map_or(CopyError::NoHelper, CopyError::Helper))
    }
}

/// A running helper process that is always reaped.
struct HelperProcess {
    child: Option<Child>,
}

impl HelperProcess {
    fn spawn(command: &HelperCommand) -> io::Result<Self> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(Self { child: Some(child) })
    }

    fn feed(&mut self, text: &str) -> io::Result<()> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "helper already finished"))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "helper has no stdin"))?;
        stdin.write_all(text.as_bytes())?;
        // Dropping stdin closes the pipe so the helper sees EOF.
        Ok(())
    }

    fn finish(mut self) -> io::Result<ExitStatus> {
        match self.child.take() {
            Some(mut child) => child.wait(),
            None => Err(io::Error::new(io::ErrorKind::Other, "helper already finished")),
        }
    }
}

impl Drop for HelperProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// What a copy request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// Nothing to copy.
    Skipped,
    Copied { tier: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Acknowledgment {
    index: usize,
    expires_at: Instant,
}

/// Tiered copier plus the single "copied" marker.
pub struct ClipboardService {
    tiers: Vec<Box<dyn TextCopier>>,
    ack: Option<Acknowledgment>,
}

impl ClipboardService {
    pub fn new(tiers: Vec<Box<dyn TextCopier>>) -> Self {
        Self { tiers, ack: None }
    }

    pub fn with_system_tiers() -> Self {
        Self::new(vec![
            Box::new(SystemClipboardCopier::new()),
            Box::new(HelperCommandCopier::platform_default()),
        ])
    }

    /// Copy `text`, acknowledging `index` on success.
    ///
    /// A new acknowledgment replaces any pending one, deadline included, so a
    /// stale expiry can never clear the newer marker. On total failure the
    /// current marker is left alone.
    pub fn copy(&mut self, text: &str, index: usize, now: Instant) -> Result<CopyOutcome, CopyError> {
        if text.is_empty() {
            return Ok(CopyOutcome::Skipped);
        }

        for tier in self.tiers.iter_mut() {
            match tier.copy_text(text) {
                Ok(()) => {
                    log::debug!("copied message {} via {}", index, tier.name());
                    self.ack = Some(Acknowledgment {
                        index,
                        expires_at: now + ACK_WINDOW,
                    });
                    return Ok(CopyOutcome::Copied { tier: tier.name() });
                }
                Err(e) => log::warn!("{} failed, falling back: {}", tier.name(), e),
            }
        }

        log::error!("failed to copy message {} with every clipboard tier", index);
        Err(CopyError::Exhausted)
    }

    /// Index currently showing the "copied" marker.
    pub fn acknowledged(&self, now: Instant) -> Option<usize> {
        self.ack
            .filter(|ack| now < ack.expires_at)
            .map(|ack| ack.index)
    }

    /// Drop the marker once its window has passed. Returns true if it was cleared.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.ack {
            Some(ack) if now >= ack.expires_at => {
                self.ack = None;
                true
            }
            _ => false,
        }
    }
}
