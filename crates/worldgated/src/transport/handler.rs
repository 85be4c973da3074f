//! Connection handling abstractions for the listener.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use thiserror::Error;
use worldgate_protocol::strip_line_ending;

/// Accepted TCP connection.
pub(crate) struct ConnectionStream {
    stream: TcpStream,
    peer: Option<SocketAddr>,
}

impl ConnectionStream {
    pub(crate) fn new(stream: TcpStream) -> Self {
        let peer = stream.peer_addr().ok();
        Self { stream, peer }
    }

    /// Remote address, when the socket still reports one.
    pub(crate) const fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub(crate) fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    /// Half-closes, then reads and drops up to `budget` bytes the peer is
    /// still sending, for at most `timeout`.
    ///
    /// Closing a socket with unread input resets the connection, which can
    /// destroy a response the peer has not read yet.
    pub(crate) fn discard_input(&mut self, budget: usize, timeout: Duration) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Write) {
            Err(error) if error.kind() != io::ErrorKind::NotConnected => return Err(error),
            _ => {}
        }
        self.stream.set_read_timeout(Some(timeout))?;
        let mut sink = [0_u8; 4096];
        let mut discarded = 0;
        while discarded < budget {
            match self.stream.read(&mut sink) {
                Ok(0) | Err(_) => break,
                Ok(read) => discarded += read,
            }
        }
        Ok(())
    }

    /// Signals end of stream to the peer after the response.
    pub(crate) fn close(&self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(error) if error.kind() != io::ErrorKind::NotConnected => Err(error),
            _ => Ok(()),
        }
    }
}

impl Read for ConnectionStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for ConnectionStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

/// Handles accepted connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: ConnectionStream);
}

/// Failure to read a request line.
#[derive(Debug, Error)]
pub(crate) enum LineError {
    /// The line grew past the configured limit.
    #[error("request exceeds {limit} bytes")]
    TooLarge { size: usize, limit: usize },
    /// The socket failed or timed out.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Reads bytes up to and including the first newline.
///
/// Returns `Ok(None)` when the peer closed without sending anything. A final
/// line without a trailing newline is returned as-is.
pub(crate) fn read_request_line<R: Read>(
    stream: &mut R,
    limit: usize,
) -> Result<Option<Vec<u8>>, LineError> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let bytes_read = read_chunk_with_retry(stream, &mut chunk)?;
        if bytes_read == 0 {
            return Ok((!buffer.is_empty()).then_some(buffer));
        }
        let received = &chunk[..bytes_read];
        if let Some(pos) = received.iter().position(|byte| *byte == b'\n') {
            buffer.extend_from_slice(&received[..=pos]);
            enforce_limit(strip_line_ending(&buffer).len(), limit)?;
            return Ok(Some(buffer));
        }
        buffer.extend_from_slice(received);
        // A trailing `\r` may still be the start of the delimiter.
        enforce_limit(strip_line_ending(&buffer).len(), limit)?;
    }
}

fn read_chunk_with_retry<R: Read>(stream: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

fn enforce_limit(size: usize, limit: usize) -> Result<(), LineError> {
    if size > limit {
        return Err(LineError::TooLarge { size, limit });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;
    use worldgate_protocol::{MAX_REQUEST_BYTES, RequestEnvelope};

    use super::*;

    #[rstest]
    #[case(b"{\"action\":\"x\"}\nignored".as_slice(), Some(b"{\"action\":\"x\"}\n".to_vec()))]
    #[case(b"no newline".as_slice(), Some(b"no newline".to_vec()))]
    #[case(b"".as_slice(), None)]
    fn reads_first_line(#[case] input: &[u8], #[case] expected: Option<Vec<u8>>) {
        let line = read_request_line(&mut Cursor::new(input), 1024).expect("read line");
        assert_eq!(line, expected);
    }

    #[rstest]
    fn oversized_lines_are_rejected() {
        let input = vec![b'a'; 5000];
        let error = read_request_line(&mut Cursor::new(input), 4096).expect_err("too large");
        assert!(matches!(error, LineError::TooLarge { limit: 4096, .. }), "{error:?}");
    }

    #[rstest]
    #[case::lf(b"\n".as_slice())]
    #[case::crlf(b"\r\n".as_slice())]
    fn lines_at_the_limit_are_accepted(#[case] delimiter: &[u8]) {
        let mut input = vec![b'a'; 16];
        input.extend_from_slice(delimiter);
        let line = read_request_line(&mut Cursor::new(input), 16).expect("read line");
        assert_eq!(line.map(|line| line.len()), Some(16 + delimiter.len()));
    }

    #[rstest]
    #[case::lf(b"\n".as_slice())]
    #[case::crlf(b"\r\n".as_slice())]
    #[case::unterminated(b"".as_slice())]
    fn one_byte_over_the_limit_is_rejected(#[case] delimiter: &[u8]) {
        let mut input = vec![b'a'; 17];
        input.extend_from_slice(delimiter);
        let error = read_request_line(&mut Cursor::new(input), 16).expect_err("too large");
        assert!(
            matches!(error, LineError::TooLarge { size: 17, limit: 16 }),
            "{error:?}"
        );
    }

    #[rstest]
    fn a_maximal_request_passes_both_size_checks() {
        let prefix = br#"{"action":"ping","pad":""#;
        let suffix = br#""}"#;
        let mut input = prefix.to_vec();
        input.resize(MAX_REQUEST_BYTES - suffix.len(), b'a');
        input.extend_from_slice(suffix);
        input.push(b'\n');

        let line = read_request_line(&mut Cursor::new(input), MAX_REQUEST_BYTES)
            .expect("read line")
            .expect("a line");
        let request = RequestEnvelope::parse(&line).expect("parse request");

        assert_eq!(line.len(), MAX_REQUEST_BYTES + 1);
        assert_eq!(request.action(), "ping");
    }
}
