//! Archive layout and writing.

mod sanitize;
mod writer;

pub use sanitize::{
    MAX_SUBJECT_CHARS, NO_SUBJECT, UNKNOWN_FOLDER, sanitize, sanitize_account,
    sanitize_attachment_name, sanitize_folder, sanitize_subject,
};
pub use writer::{ATTACHMENT_DIR, ArchiveWriter, DEFAULT_ROOT, extract_attachments, write_message};
