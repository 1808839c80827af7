//! Pluggable request sources and response sinks.
//!
//! The dispatcher never sees bytes: it pulls [`Request`]s from a
//! [`RequestSource`] and pushes [`Response`]s into a [`ResponseSink`]. This
//! module provides the JSON stream implementations used by the `parfeed`
//! binary:
//!
//! - [`JsonRequestSource`]: a stream of JSON request objects separated by
//!   any whitespace
//! - [`JsonResponseSink`]: one JSON response object per line
//!
//! plus in-memory implementations for embedding (`Vec<Request>` iterators
//! and `Vec<Response>`).

use super::error::ServerError;
use super::types::{Request, Response};
use serde_json::de::IoRead;
use serde_json::{Deserializer, StreamDeserializer};
use std::fmt;
use std::io::{Read, Write};

/// Where the dispatcher reads requests from.
///
/// Only the producer reads, so implementations need `Send` but not `Sync`.
pub trait RequestSource: Send {
    /// Returns the next request, or `Ok(None)` at the end of input.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Decode`] for malformed input and
    /// [`ServerError::Io`] when the underlying reader fails.
    fn next_request(&mut self) -> Result<Option<Request>, ServerError>;
}

/// Where the dispatcher writes responses to.
///
/// The dispatcher serializes calls to [`send`](ResponseSink::send), so one
/// response is always written whole before the next begins.
pub trait ResponseSink: Send {
    /// Writes one response.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Encode`] or [`ServerError::Io`] if the response
    /// cannot be written.
    fn send(&mut self, response: &Response) -> Result<(), ServerError>;

    /// Flushes any buffered output. Called once after the last response.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the flush fails.
    fn flush(&mut self) -> Result<(), ServerError> {
        Ok(())
    }
}

// ─── JSON ───────────────────────────────────────────────────────────────────

/// Decodes requests from a stream of JSON objects.
pub struct JsonRequestSource<R: Read> {
    stream: StreamDeserializer<'static, IoRead<R>, Request>,
}

impl<R: Read> JsonRequestSource<R> {
    /// Wraps a reader. Reads are not buffered here; wrap slow readers in a
    /// `BufReader` first.
    pub fn new(reader: R) -> Self {
        JsonRequestSource {
            stream: Deserializer::from_reader(reader).into_iter(),
        }
    }
}

impl<R: Read + Send> RequestSource for JsonRequestSource<R> {
    fn next_request(&mut self) -> Result<Option<Request>, ServerError> {
        match self.stream.next() {
            None => Ok(None),
            Some(Ok(request)) => Ok(Some(request)),
            Some(Err(e)) if e.is_io() => Err(ServerError::Io {
                message: e.to_string(),
            }),
            Some(Err(e)) => Err(ServerError::Decode {
                message: e.to_string(),
                line: e.line(),
                column: e.column(),
            }),
        }
    }
}

impl<R: Read> fmt::Debug for JsonRequestSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonRequestSource")
            .field("byte_offset", &self.stream.byte_offset())
            .finish()
    }
}

/// Encodes each response as one line of JSON.
#[derive(Debug)]
pub struct JsonResponseSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonResponseSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        JsonResponseSink { writer }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ResponseSink for JsonResponseSink<W> {
    fn send(&mut self, response: &Response) -> Result<(), ServerError> {
        serde_json::to_writer(&mut self.writer, response).map_err(|e| {
            if e.is_io() {
                ServerError::Io {
                    message: e.to_string(),
                }
            } else {
                ServerError::Encode {
                    message: e.to_string(),
                }
            }
        })?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ServerError> {
        self.writer.flush()?;
        Ok(())
    }
}

// ─── In-memory ──────────────────────────────────────────────────────────────

impl RequestSource for std::vec::IntoIter<Request> {
    fn next_request(&mut self) -> Result<Option<Request>, ServerError> {
        Ok(self.next())
    }
}

impl ResponseSink for Vec<Response> {
    fn send(&mut self, response: &Response) -> Result<(), ServerError> {
        self.push(response.clone());
        Ok(())
    }
}

impl<S: RequestSource + ?Sized> RequestSource for &mut S {
    fn next_request(&mut self) -> Result<Option<Request>, ServerError> {
        (**self).next_request()
    }
}

impl<K: ResponseSink + ?Sized> ResponseSink for &mut K {
    fn send(&mut self, response: &Response) -> Result<(), ServerError> {
        (**self).send(response)
    }

    fn flush(&mut self) -> Result<(), ServerError> {
        (**self).flush()
    }
}
