//! Telnet client session
//!
//! Line-oriented reads with a per-call timeout, in the manner of a blocking
//! `read_until`: a timeout is not an error, it returns whatever text has
//! arrived so far.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

use crate::common::{Error, Result};

use super::codec::{escape_outgoing, TelnetDecoder};

/// Size of each socket read
const READ_CHUNK: usize = 4096;

/// An open telnet session
pub struct TelnetSession<S = TcpStream> {
    stream: S,
    decoder: TelnetDecoder,
    /// Decoded text not yet returned to the caller
    pending: Vec<u8>,
    eof: bool,
}

impl TelnetSession<TcpStream> {
    /// Connect to `host:port`, failing after `connect_timeout`
    pub async fn connect(host: &str, port: u16, connect_timeout: Duration) -> Result<Self> {
        tracing::debug!(host, port, "Connecting to telnet server");

        let stream = match timeout(connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(Error::connect_failed(host, port, e)),
            Err(_) => {
                return Err(Error::ConnectTimeout {
                    host: host.to_string(),
                    port,
                    secs: connect_timeout.as_secs(),
                })
            }
        };

        // Commands are tiny and interactive
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(host, port, "set_nodelay failed: {e}");
        }

        Ok(Self::from_stream(stream))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> TelnetSession<S> {
    /// Wrap an already connected stream
    pub fn from_stream(stream: S) -> Self {
        Self {
            stream,
            decoder: TelnetDecoder::new(),
            pending: Vec::new(),
            eof: false,
        }
    }

    /// Send `line` terminated by CRLF
    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        tracing::debug!(line, "telnet >");
        let mut data = escape_outgoing(line.as_bytes());
        data.extend_from_slice(b"\r\n");
        self.stream
            .write_all(&data)
            .await
            .map_err(|e| Error::RemoteShell(format!("write failed: {e}")))?;
        self.stream
            .flush()
            .await
            .map_err(|e| Error::RemoteShell(format!("flush failed: {e}")))?;
        Ok(())
    }

    /// Read text up to and including `delimiter`
    ///
    /// If the delimiter does not show up within `read_timeout`, or the peer
    /// closes the connection, the buffered text is returned as is. An empty
    /// string means nothing more arrived.
    pub async fn read_until(&mut self, delimiter: &[u8], read_timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + read_timeout;

        loop {
            if let Some(end) = find(&self.pending, delimiter) {
                let rest = self.pending.split_off(end + delimiter.len());
                let line = std::mem::replace(&mut self.pending, rest);
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }

            if self.eof {
                break;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            let mut chunk = [0u8; READ_CHUNK];
            match timeout(remaining, self.stream.read(&mut chunk)).await {
                Err(_) => break,
                Ok(Ok(0)) => {
                    tracing::debug!("telnet peer closed the connection");
                    self.eof = true;
                }
                Ok(Ok(n)) => self.receive(&chunk[..n]).await?,
                Ok(Err(e)) => return Err(Error::RemoteShell(format!("read failed: {e}"))),
            }
        }

        let rest = std::mem::take(&mut self.pending);
        Ok(String::from_utf8_lossy(&rest).into_owned())
    }

    async fn receive(&mut self, chunk: &[u8]) -> Result<()> {
        let decoded = self.decoder.decode(chunk);
        if !decoded.replies.is_empty() {
            self.stream
                .write_all(&decoded.replies)
                .await
                .map_err(|e| Error::RemoteShell(format!("negotiation reply failed: {e}")))?;
        }
        self.pending.extend_from_slice(&decoded.data);
        Ok(())
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
