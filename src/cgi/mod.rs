//! Running CGI programs
//!
//! The program gets the request through its environment (`REQUEST_METHOD`
//! plus `QUERY_STRING` or `CONTENT_LENGTH`) and, for POST, exactly
//! `CONTENT_LENGTH` body bytes on stdin. Its stdout is the response after
//! our status line, headers included, and is relayed without inspection.

pub mod parser;

use crate::errors::{Error, Result};
use crate::log_util::describe_exit;
use crate::server::error_messages::{error_400, error_500};
use crate::server::{discard_headers, read_line, Fresh, Method, Request, Response};

use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;

/// What the program learns about the request besides its method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input<'a> {
    Query(&'a str),
    Body(u64),
}

/// Runs the program at `req.path` and relays its output to the client.
///
/// The 200 status line is sent before the program starts, so a program that
/// later fails or exits non-zero can't change it. If the program can't be
/// started at all, a 500 response follows the status line already sent.
pub fn execute<R, W>(req: &Request, source: &mut BufReader<R>, res: Response<W, Fresh>,
                     max_line: usize) -> Result<()>
    where R: Read + Send,
          W: Write
{
    let input = match req.method {
        Method::Get => {
            discard_headers(source, max_line);
            Input::Query(req.query_string.as_deref().unwrap_or(""))
        }
        Method::Post => match read_content_length(source, max_line) {
            Ok(length) => Input::Body(length),
            Err(e @ Error::MissingContentLength) | Err(e @ Error::InvalidContentLength) => {
                error_400(res)?;
                return Err(e);
            }
            Err(e) => return Err(e),
        },
    };

    let mut res = res.start()?;

    let mut child = match command(req, input).spawn() {
        Ok(child) => child,
        Err(e) => {
            error_500(Response::new(res.into_inner()))?;
            return Err(Error::Spawn(e));
        }
    };

    let relayed = relay(&mut child, source, &mut res, input);

    // Always reap, whatever happened to the relay
    let status = child.wait()?;
    if status.success() {
        debug!("{} finished", req.path.display());
    } else {
        warn!("{} ended with {}", req.path.display(), describe_exit(status));
    }

    relayed
}

/// Scans the remaining header lines for the last `Content-Length`.
fn read_content_length<R: BufRead>(source: &mut R, max_line: usize) -> Result<u64> {
    let mut line = Vec::new();
    let mut length = None;

    while read_line(source, &mut line, max_line)? > 0 {
        if let Some(parsed) = parser::content_length(&line) {
            length = Some(parsed);
        }
    }

    match length {
        Some(parsed) => parsed,
        None => Err(Error::MissingContentLength),
    }
}

fn command(req: &Request, input: Input) -> Command {
    let mut cmd = Command::new(&req.path);
    configure(&mut cmd, req, input);
    cmd
}

/// The child's stdin and stdout are pipes; the ends the child uses are
/// closed in this process once it has been spawned. Everything else in the
/// environment is inherited, minus whichever of the two request variables
/// doesn't apply, even when it was already set on `cmd`.
fn configure(cmd: &mut Command, req: &Request, input: Input) {
    cmd.env("REQUEST_METHOD", req.method.as_str())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped());

    match input {
        Input::Query(query) => {
            cmd.env("QUERY_STRING", query).env_remove("CONTENT_LENGTH");
        }
        Input::Body(length) => {
            cmd.env("CONTENT_LENGTH", length.to_string()).env_remove("QUERY_STRING");
        }
    }
}

/// Moves the request body into the child while moving its output to the
/// client.
///
/// The two directions run on separate threads: a program that writes before
/// it has read all of its input would otherwise deadlock against us once a
/// pipe buffer fills.
fn relay<R, W>(child: &mut Child, source: &mut BufReader<R>, sink: &mut W, input: Input)
               -> Result<()>
    where R: Read + Send,
          W: Write
{
    let stdin = child.stdin.take();
    let mut stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => return Ok(()),
    };

    thread::scope(|scope| {
        let feeder = match input {
            Input::Body(length) if length > 0 => {
                stdin.map(|stdin| scope.spawn(move || forward_body(source, stdin, length)))
            }
            // Closing stdin right away lets the program see end-of-input
            _ => {
                drop(stdin);
                None
            }
        };

        let drained = io::copy(&mut stdout, sink).and_then(|sent| sink.flush().map(|_| sent));
        // On a failed relay this makes the program's next write fail too
        drop(stdout);

        if let Some(feeder) = feeder {
            match feeder.join() {
                Ok(Ok(_)) => (),
                Ok(Err(e)) => debug!("Request body relay stopped: {}", e),
                Err(_) => warn!("Request body relay panicked"),
            }
        }

        drained.map(|sent| debug!("Relayed {} bytes of program output", sent))
               .map_err(Error::from)
    })
}

/// Copies exactly `length` bytes, or fewer if the client stops sending.
fn forward_body<R: Read>(source: R, mut stdin: ChildStdin, length: u64) -> io::Result<u64> {
    let forwarded = io::copy(&mut source.take(length), &mut stdin)?;
    if forwarded < length {
        debug!("Client sent {} of {} body bytes", forwarded, length);
    }
    Ok(forwarded)
}
