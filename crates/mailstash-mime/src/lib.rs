//! # mailstash-mime
//!
//! MIME message parsing for mail archival.
//!
//! ## Features
//!
//! - **Message parsing**: Recursive multipart and `message/rfc822` trees
//! - **Attachments**: Filename resolution and attachment detection
//! - **Decoding**: Base64, Quoted-Printable, RFC 2047 words, RFC 2231 parameters
//! - **Lenient input**: Malformed mail degrades instead of failing
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailstash_mime::Message;
//!
//! let message = Message::parse(raw_bytes)?;
//! println!("Subject: {}", message.subject().unwrap_or_default());
//!
//! for part in message.attachments() {
//!     let name = part.filename().unwrap_or_default();
//!     let bytes = part.decode_body()?;
//!     println!("{name}: {} bytes", bytes.len());
//! }
//! ```
//!
//! ### Header Decoding
//!
//! ```ignore
//! use mailstash_mime::encoding::decode_rfc2047;
//!
//! assert_eq!(decode_rfc2047("=?utf-8?B?SMOpbGxv?="), "Héllo");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod disposition;
mod error;
mod header;
mod message;
mod params;

pub mod encoding;

pub use content_type::ContentType;
pub use disposition::{ContentDisposition, DispositionKind};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Message, Part, TransferEncoding};
pub use params::Parameters;
