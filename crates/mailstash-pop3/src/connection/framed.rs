//! POP3 line framing.
//!
//! Every reply is one status line, optionally followed by a body that ends
//! with a line holding a single `.`.

#![allow(clippy::missing_errors_doc)]

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::{Error, Result};
use crate::parser::is_terminator;

/// Longest line accepted, terminator included.
const MAX_LINE: u64 = 1024 * 1024;

/// Largest multi-line body accepted, counting two bytes per line ending.
const MAX_BODY: usize = 100 * 1024 * 1024;

/// Buffered POP3 connection.
pub struct LineStream<S> {
    inner: BufReader<S>,
}

impl<S> LineStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            inner: BufReader::new(stream),
        }
    }

    /// Next line, with its CRLF (or bare LF) removed.
    pub async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        (&mut self.inner).take(MAX_LINE).read_until(b'\n', &mut line).await?;

        match line.last() {
            Some(b'\n') => {
                let end = if line.ends_with(b"\r\n") { line.len() - 2 } else { line.len() - 1 };
                line.truncate(end);
                Ok(line)
            }
            None => Err(eof("connection closed")),
            Some(_) if line.len() as u64 >= MAX_LINE => {
                Err(Error::Io(io::Error::new(io::ErrorKind::InvalidData, "line too long")))
            }
            Some(_) => Err(eof("connection closed mid-line")),
        }
    }

    /// Body lines up to, not including, the `.` line. Byte-stuffing is left
    /// in place.
    pub async fn read_multiline(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut body = Vec::new();
        let mut size = 0usize;

        loop {
            let line = self.read_line().await?;
            if is_terminator(&line) {
                return Ok(body);
            }
            size += line.len() + 2;
            if size > MAX_BODY {
                return Err(Error::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("multi-line reply exceeds {MAX_BODY} bytes"),
                )));
            }
            body.push(line);
        }
    }

    /// Sends one serialized command.
    pub async fn write_command(&mut self, command: &[u8]) -> Result<()> {
        let stream = self.inner.get_mut();
        stream.write_all(command).await?;
        Ok(stream.flush().await?)
    }

    /// The wrapped stream.
    pub fn get_mut(&mut self) -> &mut S {
        self.inner.get_mut()
    }
}

fn eof(message: &'static str) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::UnexpectedEof, message))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_line_endings_removed() {
        let mock = Builder::new().read(b"+OK ready\r\nbare\nlone\r\r\n").build();
        let mut stream = LineStream::new(mock);

        assert_eq!(stream.read_line().await.unwrap(), b"+OK ready");
        assert_eq!(stream.read_line().await.unwrap(), b"bare");
        assert_eq!(stream.read_line().await.unwrap(), b"lone\r");
    }

    #[tokio::test]
    async fn test_line_split_across_reads() {
        let mock = Builder::new().read(b"+OK hel").read(b"lo\r").read(b"\n").build();
        let mut stream = LineStream::new(mock);
        assert_eq!(stream.read_line().await.unwrap(), b"+OK hello");
    }

    #[tokio::test]
    async fn test_closed_connection_is_transport_error() {
        let mut stream = LineStream::new(Builder::new().build());
        assert!(stream.read_line().await.unwrap_err().is_transport());

        let mut stream = LineStream::new(Builder::new().read(b"+OK trunc").build());
        assert!(stream.read_line().await.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_multiline_body() {
        let mock = Builder::new().read(b"1 120\r\n..hidden\r\n\r\n.\r\n+OK next\r\n").build();
        let mut stream = LineStream::new(mock);

        let body = stream.read_multiline().await.unwrap();
        assert_eq!(body, vec![b"1 120".to_vec(), b"..hidden".to_vec(), Vec::new()]);
        assert_eq!(stream.read_line().await.unwrap(), b"+OK next");
    }
}
