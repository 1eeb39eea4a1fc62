// ABOUTME: Single reader loop merging the child's stdout and stderr into one line channel.
// ABOUTME: Lines are decoded lossily and forwarded in the order they are read.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

enum Source {
    Stdout,
    Stderr,
}

/// Read both streams until each reaches end of file, forwarding every
/// non-empty line. The channel closes when this returns.
pub(super) async fn forward_output<O, E>(stdout: O, stderr: E, lines: mpsc::Sender<String>)
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = BufReader::new(stdout);
    let mut err = BufReader::new(stderr);
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        let (source, result) = tokio::select! {
            result = out.read_until(b'\n', &mut out_buf), if out_open => (Source::Stdout, result),
            result = err.read_until(b'\n', &mut err_buf), if err_open => (Source::Stderr, result),
        };
        let (buf, open) = match source {
            Source::Stdout => (&mut out_buf, &mut out_open),
            Source::Stderr => (&mut err_buf, &mut err_open),
        };

        match result {
            Ok(0) => *open = false,
            Ok(_) => {
                let line = String::from_utf8_lossy(buf).trim_end().to_string();
                buf.clear();
                if line.is_empty() {
                    continue;
                }
                if lines.send(line).await.is_err() {
                    tracing::debug!("console receiver dropped, stopping reader");
                    return;
                }
            }
            Err(e) => {
                tracing::warn!("error reading server output: {}", e);
                *open = false;
            }
        }
    }

    tracing::debug!("server output streams closed");
}
