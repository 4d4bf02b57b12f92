//! Request-line parsing and the parsed request

use crate::errors::{Error, Result};

use nom::bytes::complete::take_till1;
use nom::character::complete::space1;
use nom::character::is_space;
use nom::IResult;

use std::path::PathBuf;
use std::str;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Matches a method token case-insensitively
    pub fn from_token(token: &[u8]) -> Option<Method> {
        if token.eq_ignore_ascii_case(b"GET") {
            Some(Method::Get)
        } else if token.eq_ignore_ascii_case(b"POST") {
            Some(Method::Post)
        } else {
            None
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// A request that made it through routing, ready for one responder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// The request target without any query string
    pub raw_path: String,
    /// Where `raw_path` lands on disk
    pub path: PathBuf,
    /// Everything after the first `'?'`; GET only
    pub query_string: Option<String>,
    pub is_cgi: bool,
}

/// The interesting parts of the first line of a request
#[derive(Debug, PartialEq, Eq)]
pub enum RequestLine {
    Known { method: Method, target: String },
    Unknown { method: Vec<u8> },
}

/// `METHOD SP+ TARGET`, with anything after the target (the version) ignored
fn request_line(input: &[u8]) -> IResult<&[u8], (&[u8], &[u8])> {
    let (input, method) = take_till1(is_space)(input)?;
    let (input, _) = space1(input)?;
    let (input, target) = take_till1(is_space)(input)?;
    Ok((input, (method, target)))
}

/// Parses a request line that has already had its terminator stripped
pub fn parse_request_line(line: &[u8]) -> Result<RequestLine> {
    let method = match take_till1::<_, _, nom::error::Error<&[u8]>>(is_space)(line) {
        Ok((_, method)) => method,
        Err(_) => return Err(Error::RequestLineMalformed),
    };

    let method = match Method::from_token(method) {
        Some(m) => m,
        None => return Ok(RequestLine::Unknown { method: Vec::from(method) }),
    };

    let target = match request_line(line) {
        Ok((_, (_, target))) => target,
        Err(_) => return Err(Error::RequestLineMalformed),
    };

    let target = str::from_utf8(target).map_err(|_| Error::RequestLineMalformed)?;

    if !target.starts_with('/') {
        return Err(Error::PathNotInOriginForm);
    }

    Ok(RequestLine::Known {
        method,
        target: String::from(target),
    })
}

/// Splits a GET target at its first `'?'`.
///
/// POST targets are never split.
pub fn split_query(method: Method, target: &str) -> (String, Option<String>) {
    match (method, target.find('?')) {
        (Method::Get, Some(i)) => (
            String::from(&target[..i]),
            Some(String::from(&target[i + 1..])),
        ),
        _ => (String::from(target), None),
    }
}
