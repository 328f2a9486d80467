//! Response framing.
//!
//! A server response is a CRLF-terminated line, except that a line ending
//! in `{n}` is followed by n raw bytes and then continues. [`FramedStream`]
//! hands out one whole response at a time and never interprets it.

#![allow(clippy::missing_errors_doc)]

use std::io;

use bytes::BytesMut;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{Error, Result};

const READ_BUFFER: usize = 16 * 1024;

/// Longest single line accepted, literals excluded.
const MAX_LINE: u64 = 1024 * 1024;

/// Largest literal accepted. Bounds the size of one downloaded message.
const MAX_LITERAL: usize = 100 * 1024 * 1024;

/// What an untagged `BYE` means while waiting for a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bye {
    /// The server is hanging up on us; stop with [`Error::Bye`].
    Fatal,
    /// Part of a LOGOUT; keep reading.
    Expected,
}

/// Buffered connection that reads whole responses.
pub struct FramedStream<S> {
    reader: BufReader<S>,
}

impl<S> FramedStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected stream.
    pub fn new(stream: S) -> Self {
        Self {
            reader: BufReader::with_capacity(READ_BUFFER, stream),
        }
    }

    /// Reads one response with its literals inlined.
    ///
    /// Limit violations come back as `InvalidData` I/O errors: after one the
    /// stream position is unknown.
    pub async fn read_response(&mut self) -> Result<Vec<u8>> {
        let mut response = BytesMut::new();
        loop {
            let line = self.read_line().await?;
            response.extend_from_slice(&line);

            let Some(size) = literal_size(&line) else {
                return Ok(Vec::from(response));
            };
            if size > MAX_LITERAL {
                return Err(invalid_data(format!("literal of {size} bytes exceeds {MAX_LITERAL}")));
            }
            let start = response.len();
            response.resize(start + size, 0);
            self.reader.read_exact(&mut response[start..]).await?;
        }
    }

    async fn read_line(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        (&mut self.reader).take(MAX_LINE + 1).read_until(b'\n', &mut line).await?;

        if line.last() == Some(&b'\n') {
            return Ok(line);
        }
        if line.len() as u64 > MAX_LINE {
            return Err(invalid_data(format!("response line longer than {MAX_LINE} bytes")));
        }
        Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "server closed the connection",
        )))
    }

    /// Sends bytes and flushes.
    pub async fn write_command(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Reads responses up to and including the completion tagged `tag`.
    pub async fn read_until_tagged(&mut self, tag: &str, bye: Bye) -> Result<Vec<Vec<u8>>> {
        let mut responses = Vec::new();
        loop {
            let response = self.read_response().await?;
            if bye == Bye::Fatal
                && let Some(text) = response.strip_prefix(b"* BYE")
            {
                return Err(Error::Bye(String::from_utf8_lossy(text).trim().to_string()));
            }
            let done = completes(&response, tag);
            responses.push(response);
            if done {
                return Ok(responses);
            }
        }
    }

    /// The wrapped stream, for shutdown.
    pub fn get_mut(&mut self) -> &mut S {
        self.reader.get_mut()
    }
}

/// Whether `response` is the tagged completion for `tag`.
pub(crate) fn completes(response: &[u8], tag: &str) -> bool {
    matches!(response.strip_prefix(tag.as_bytes()), Some([b' ', ..]))
}

fn invalid_data(message: String) -> Error {
    Error::Io(io::Error::new(io::ErrorKind::InvalidData, message))
}

/// Size announced by a trailing `{n}` or `{n+}`.
fn literal_size(line: &[u8]) -> Option<usize> {
    let body = line.strip_suffix(b"\r\n")?.strip_suffix(b"}")?;
    let body = body.strip_suffix(b"+").unwrap_or(body);
    let digits = &body[body.iter().rposition(|&b| b == b'{')? + 1..];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
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

    #[test]
    fn test_literal_size() {
        assert_eq!(literal_size(b"* 3 FETCH (RFC822 {2048}\r\n"), Some(2048));
        assert_eq!(literal_size(b"A1 LOGIN anna {4+}\r\n"), Some(4));
        assert_eq!(literal_size(b"{0}\r\n"), Some(0));
        assert_eq!(literal_size(b"* OK {12}"), None);
        assert_eq!(literal_size(b"* OK {}\r\n"), None);
        assert_eq!(literal_size(b"* OK {1a}\r\n"), None);
        assert_eq!(literal_size(b"* OK done\r\n"), None);
    }

    #[test]
    fn test_completes() {
        assert!(completes(b"A0007 OK done\r\n", "A0007"));
        assert!(!completes(b"A00070 OK done\r\n", "A0007"));
        assert!(!completes(b"* OK A0007\r\n", "A0007"));
    }

    #[tokio::test]
    async fn test_literal_is_inlined() {
        let mock = Builder::new()
            .read(b"* 7 FETCH (RFC822 {6}\r\n")
            .read(b"ab\r\ncd")
            .read(b")\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(
            framed.read_response().await.unwrap(),
            b"* 7 FETCH (RFC822 {6}\r\nab\r\ncd)\r\n"
        );
    }

    #[tokio::test]
    async fn test_line_split_between_reads() {
        let mock = Builder::new().read(b"* OK hal").read(b"f\r").read(b"\n").build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(framed.read_response().await.unwrap(), b"* OK half\r\n");
    }

    #[tokio::test]
    async fn test_eof_mid_line() {
        let mock = Builder::new().read(b"* OK trunc").build();
        let mut framed = FramedStream::new(mock);
        assert!(framed.read_response().await.unwrap_err().is_transport());
    }

    #[tokio::test]
    async fn test_limits() {
        let header = format!("* 1 FETCH (RFC822 {{{}}}\r\n", MAX_LITERAL + 1);
        let mut framed = FramedStream::new(Builder::new().read(header.as_bytes()).build());
        assert!(framed.read_response().await.unwrap_err().to_string().contains("exceeds"));

        let long = vec![b'x'; usize::try_from(MAX_LINE).unwrap() + 10];
        let mut framed = FramedStream::new(Builder::new().read(&long).build());
        assert!(framed.read_response().await.unwrap_err().to_string().contains("longer than"));
    }

    #[tokio::test]
    async fn test_read_until_tagged() {
        let mock = Builder::new()
            .read(b"* 4 EXISTS\r\n")
            .read(b"A00020 OK not ours\r\n")
            .read(b"A0002 OK ours\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        let responses = framed.read_until_tagged("A0002", Bye::Fatal).await.unwrap();
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[2], b"A0002 OK ours\r\n");
    }

    #[tokio::test]
    async fn test_bye_handling() {
        let mut framed =
            FramedStream::new(Builder::new().read(b"* BYE server shutdown\r\n").build());
        let err = framed.read_until_tagged("A0004", Bye::Fatal).await.unwrap_err();
        assert!(matches!(err, Error::Bye(ref text) if text == "server shutdown"));

        let mock = Builder::new()
            .read(b"* BYE see you\r\n")
            .read(b"A0004 OK LOGOUT done\r\n")
            .build();
        let mut framed = FramedStream::new(mock);
        assert_eq!(framed.read_until_tagged("A0004", Bye::Expected).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_write_command_flushes() {
        let mut framed = FramedStream::new(Builder::new().write(b"A0001 NOOP\r\n").build());
        framed.write_command(b"A0001 NOOP\r\n").await.unwrap();
    }
}
