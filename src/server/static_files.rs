//! Handler for static file service

use super::error_messages::*;
use super::lines::discard_headers;
use super::{Fresh, Request, Response, SERVER_SOFTWARE};
use crate::errors::*;

use std::fs::File;
use std::io::{BufRead, Write};

/// Streams the file at `req.path` behind a fixed `text/html` head.
///
/// There is no Content-Length; closing the connection ends the body.
pub fn serve<R, W>(req: &Request, source: &mut R, mut res: Response<W, Fresh>,
                   max_line: usize) -> Result<()>
    where R: BufRead,
          W: Write
{
    discard_headers(source, max_line);

    let file = match File::open(&req.path) {
        Ok(f) => f,
        Err(e) => {
            debug!("Could not open {}: {}", req.path.display(), e);
            error_404(res)?;
            return Ok(());
        }
    };

    // Opening a directory succeeds on Unix, reading it does not
    match file.metadata() {
        Ok(ref meta) if !meta.is_dir() => (),
        _ => {
            error_404(res)?;
            return Ok(());
        }
    }

    res.headers_mut().insert("Server", Vec::from(SERVER_SOFTWARE));
    res.headers_mut().insert("Content-Type", Vec::from(mime::TEXT_HTML.essence_str()));

    let sent = res.of_stream(file)?;
    debug!("Sent {} bytes of {}", sent, req.path.display());
    Ok(())
}
