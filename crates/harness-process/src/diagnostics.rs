//! Fan-out of the backend's stderr.
//!
//! One task owns the read side of the pipe. Every line is echoed to the
//! runner's stderr and forwarded to the discovery scanner. The task keeps
//! draining until EOF, even after the scanner has gone away, so the child
//! never blocks on a full pipe.

use std::io;

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
};

/// A line read from the backend's stderr, or the error that ended the stream.
pub type DiagnosticLine = io::Result<String>;

/// Receiving side of the fan-out. Closed on EOF.
pub type DiagnosticLines = mpsc::UnboundedReceiver<DiagnosticLine>;

/// Spawn the pump task.
///
/// `echo`, when set, receives every line verbatim. Echo failures disable
/// the echo but never stop the pump.
pub fn spawn_pump<R, W>(reader: R, echo: Option<W>) -> (JoinHandle<()>, DiagnosticLines)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut echo = echo;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    if let Some(writer) = echo.as_mut() {
                        if let Err(e) = write_line(writer, &buf).await {
                            tracing::debug!("Disabling stderr echo: {e}");
                            echo = None;
                        }
                    }
                    let line = String::from_utf8_lossy(&buf);
                    // The scanner drops its receiver once done; keep draining.
                    let _ = tx.send(Ok(line.trim_end_matches(['\r', '\n']).to_string()));
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });

    (handle, rx)
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &[u8]) -> io::Result<()> {
    writer.write_all(line).await?;
    if !line.ends_with(b"\n") {
        writer.write_all(b"\n").await?;
    }
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lines_are_forwarded_and_echoed() {
        let (mut child_side, pump_side) = tokio::io::duplex(64);
        let (echo_writer, mut echo_reader) = tokio::io::duplex(1024);
        let (handle, mut lines) = spawn_pump(pump_side, Some(echo_writer));

        child_side.write_all(b"first\r\nsecond\nthird").await.unwrap();
        drop(child_side);

        assert_eq!(lines.recv().await.unwrap().unwrap(), "first");
        assert_eq!(lines.recv().await.unwrap().unwrap(), "second");
        assert_eq!(lines.recv().await.unwrap().unwrap(), "third");
        assert!(lines.recv().await.is_none());
        handle.await.unwrap();

        let mut echoed = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut echo_reader, &mut echoed)
            .await
            .unwrap();
        assert_eq!(echoed, "first\r\nsecond\nthird\n");
    }

    #[tokio::test]
    async fn test_keeps_draining_after_receiver_dropped() {
        let (mut child_side, pump_side) = tokio::io::duplex(16);
        let (handle, lines) = spawn_pump(pump_side, None::<tokio::io::Sink>);
        drop(lines);

        // Far more than the pipe capacity; would stall if nobody read it.
        for _ in 0..256 {
            child_side.write_all(b"still talking\n").await.unwrap();
        }
        drop(child_side);

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_utf8_does_not_stop_pump() {
        let (mut child_side, pump_side) = tokio::io::duplex(64);
        let (_handle, mut lines) = spawn_pump(pump_side, None::<tokio::io::Sink>);

        child_side.write_all(b"\xff\xfe\nok\n").await.unwrap();
        drop(child_side);

        assert!(lines.recv().await.unwrap().is_ok());
        assert_eq!(lines.recv().await.unwrap().unwrap(), "ok");
    }
}
