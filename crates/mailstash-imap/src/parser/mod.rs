//! IMAP response parser.
//!
//! Sans-I/O: the connection layer hands over one complete response at a
//! time and gets back a structured [`Response`].
//!
//! ```
//! use mailstash_imap::parser::{Response, ResponseParser, UntaggedResponse};
//!
//! let response = ResponseParser::parse(b"* SEARCH 2 3 5\r\n").unwrap();
//! match response {
//!     Response::Untagged(UntaggedResponse::Search(ids)) => assert_eq!(ids.len(), 3),
//!     _ => panic!("expected SEARCH"),
//! }
//! ```

mod fetch;
pub mod lexer;
mod response;

pub use fetch::FetchItem;
pub use lexer::{Lexer, Token};
pub use response::{Response, ResponseParser, UntaggedResponse};
