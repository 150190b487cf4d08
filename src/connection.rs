//! Line-oriented connection over one TCP socket
//!
//! Wraps the socket's read and write halves in `LinesCodec` framing:
//! reads yield whole lines (never partial ones), writes append the
//! delimiter and flush before returning.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

use crate::error::ChatError;

/// Upper bound on a single line, in bytes
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

fn codec() -> LinesCodec {
    LinesCodec::new_with_max_length(MAX_LINE_LENGTH)
}

/// Read side of a connection
///
/// Produces a lazy sequence of lines; `None` marks end of stream.
#[derive(Debug)]
pub struct LineReader<R = OwnedReadHalf> {
    lines: Option<FramedRead<R, LinesCodec>>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            lines: Some(FramedRead::new(inner, codec())),
        }
    }

    /// Wait for the next full line
    ///
    /// Returns `Ok(None)` once the peer closed the stream or this reader was closed.
    pub async fn read_line(&mut self) -> Result<Option<String>, ChatError> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };

        match lines.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Release the read half. Safe to call more than once.
    pub fn close(&mut self) {
        self.lines = None;
    }
}

/// Write side of a connection
#[derive(Debug)]
pub struct LineWriter<W = OwnedWriteHalf> {
    sink: Option<FramedWrite<W, LinesCodec>>,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            sink: Some(FramedWrite::new(inner, codec())),
        }
    }

    /// Write one line and flush it
    ///
    /// Fails with `ConnectionClosed` after `close`, or with the IO error
    /// if the peer reset the connection.
    pub async fn write_line(&mut self, line: &str) -> Result<(), ChatError> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(ChatError::ConnectionClosed);
        };

        sink.send(line).await?;
        Ok(())
    }

    /// Flush and shut down the write half. Later calls are no-ops.
    pub async fn close(&mut self) -> Result<(), ChatError> {
        match self.sink.take() {
            Some(mut sink) => {
                SinkExt::<&str>::close(&mut sink).await?;
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }
}

/// A bidirectional line connection over one TCP socket
///
/// Owned by exactly one session or client driver. Split it when the two
/// directions must be driven concurrently.
#[derive(Debug)]
pub struct Connection {
    peer_addr: Option<SocketAddr>,
    reader: LineReader,
    writer: LineWriter,
}

impl Connection {
    /// Wrap an accepted or connected stream
    pub fn new(stream: TcpStream) -> Self {
        let peer_addr = stream.peer_addr().ok();
        let (read_half, write_half) = stream.into_split();
        Self {
            peer_addr,
            reader: LineReader::new(read_half),
            writer: LineWriter::new(write_half),
        }
    }

    /// Open a connection to a remote chat server
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ChatError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::new(stream))
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub async fn read_line(&mut self) -> Result<Option<String>, ChatError> {
        self.reader.read_line().await
    }

    pub async fn write_line(&mut self, line: &str) -> Result<(), ChatError> {
        self.writer.write_line(line).await
    }

    /// Release both halves. Idempotent.
    pub async fn close(&mut self) -> Result<(), ChatError> {
        self.reader.close();
        self.writer.close().await
    }

    /// Split into independently owned read and write halves
    pub fn into_split(self) -> (LineReader, LineWriter) {
        (self.reader, self.writer)
    }
}
