//! Line-by-line relay of a child's stdout into the dispatcher's sink.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::{Error, Result};

/// Copy `reader` into `sink` one line at a time and return the number of
/// bytes read from the child.
///
/// Sink write failures (a closed pipe downstream) stop forwarding but the
/// child's output is still drained so it never blocks on a full pipe.
///
/// # Errors
///
/// Returns an I/O error if reading from the child fails.
pub async fn relay_lines<R>(reader: R, sink: &mut (dyn Write + Send)) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::with_capacity(256);
    let mut total = 0u64;
    let mut forwarding = true;

    loop {
        line.clear();
        let n = reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(|e| Error::io(e, None, "read child output"))?;
        if n == 0 {
            break;
        }
        total += n as u64;
        if forwarding && sink.write_all(&line).and_then(|()| sink.flush()).is_err() {
            tracing::debug!("Output sink closed, draining child output");
            forwarding = false;
        }
    }
    Ok(total)
}

/// Emit a file's contents into `sink` verbatim; returns bytes written.
///
/// # Errors
///
/// Returns an I/O error if the sink rejects the write.
pub fn emit_file(path: &std::path::Path, sink: &mut (dyn Write + Send)) -> Result<u64> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(Error::io(e, Some(path.to_path_buf()), "read transcript")),
    };
    sink.write_all(&bytes)
        .and_then(|()| sink.flush())
        .map_err(|e| Error::io(e, None, "write transcript"))?;
    Ok(bytes.len() as u64)
}
