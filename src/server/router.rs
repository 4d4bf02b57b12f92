//! Request classification
//!
//! Reads the request line and decides who answers: the static file
//! responder, the CGI executor, or one of the canned error responses. Header
//! lines are left unread for the chosen responder, except on the not-found
//! path, where nobody else will want them.

use crate::config::Config;
use crate::errors::{Error, Result};
use crate::filesystem::{self, Entry};
use crate::log_util::ascii_escape;
use crate::server::lines::{discard_headers, read_line};
use crate::server::request::{parse_request_line, split_query, Method, Request, RequestLine};

use std::io::BufRead;
use std::path::PathBuf;

/// Where a request goes next
#[derive(Debug)]
pub enum Route {
    /// Serve a static file or run a program, as `Request::is_cgi` says
    Resource(Request),
    NotFound(PathBuf),
    Unimplemented(Vec<u8>),
    BadRequest(Error),
}

pub fn route<R: BufRead>(config: &Config, source: &mut R) -> Result<Route> {
    let mut line = Vec::new();
    read_line(source, &mut line, config.max_line)?;

    let (method, target) = match parse_request_line(&line) {
        Ok(RequestLine::Known { method, target }) => (method, target),
        Ok(RequestLine::Unknown { method }) => return Ok(Route::Unimplemented(method)),
        Err(e) => {
            debug!("Bad request line \"{}\"", ascii_escape(&line));
            return Ok(Route::BadRequest(e));
        }
    };

    let (raw_path, query_string) = split_query(method, &target);
    let mut is_cgi = method == Method::Post || query_string.is_some();

    let mut path = filesystem::resolve(&config.site.webroot, &raw_path, &config.site.index);
    let mut entry = filesystem::inspect(&path);

    if entry == Entry::Directory {
        path.push(&config.site.index);
        entry = filesystem::inspect(&path);
    }

    match entry {
        Entry::Missing => {
            discard_headers(source, config.max_line);
            return Ok(Route::NotFound(path));
        }
        Entry::File { executable: true } => is_cgi = true,
        _ => (),
    }

    Ok(Route::Resource(Request {
        method,
        raw_path,
        path,
        query_string,
        is_cgi,
    }))
}
