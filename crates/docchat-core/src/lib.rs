pub mod api;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod upload;

// Re-export main types for convenience
pub use api::{DocumentApi, HttpDocumentApi, QueryReply, UploadReply};
pub use clipboard::{ClipboardService, CopyOutcome, HelperCommandCopier, SystemClipboardCopier, TextCopier, ACK_WINDOW};
pub use config::Config;
pub use error::{ApiError, CopyError};
pub use session::ChatSession;
pub use state::{ChatMessage, ConversationLog, Notice, NoticeKind, RequestFlags, Sender};
pub use upload::{SelectedFile, UploadGate};
