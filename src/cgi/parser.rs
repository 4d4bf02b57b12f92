//! Parsers for the request headers a CGI invocation needs

use crate::errors::{Error, Result};

use nom::character::complete::{digit1, space0};
use nom::combinator::{all_consuming, map_res};
use nom::sequence::delimited;
use nom::IResult;

use std::str::{self, FromStr};

fn decimal(input: &[u8]) -> IResult<&[u8], u64> {
    map_res(map_res(digit1, str::from_utf8), FromStr::from_str)(input)
}

/// A whole header value that is one non-negative decimal integer
fn length_value(input: &[u8]) -> IResult<&[u8], u64> {
    all_consuming(delimited(space0, decimal, space0))(input)
}

/// Splits one header line into its name and value.
///
/// Returns `None` for anything that isn't a well-formed header field.
pub fn header_field(line: &[u8]) -> Option<(String, Vec<u8>)> {
    let mut raw = Vec::with_capacity(line.len() + 4);
    raw.extend_from_slice(line);
    raw.extend_from_slice(b"\r\n\r\n");

    let mut headers = [httparse::EMPTY_HEADER; 1];
    match httparse::parse_headers(&raw, &mut headers) {
        Ok(httparse::Status::Complete((_, parsed))) => parsed
            .first()
            .map(|h| (String::from(h.name), Vec::from(h.value))),
        _ => None,
    }
}

/// Looks for a `Content-Length` field in a header line.
///
/// `None` means the line is some other header; `Some(Err(_))` means it is
/// `Content-Length` but the value isn't usable.
pub fn content_length(line: &[u8]) -> Option<Result<u64>> {
    let (name, value) = header_field(line)?;
    if !name.eq_ignore_ascii_case("Content-Length") {
        return None;
    }

    Some(match length_value(&value) {
        Ok((_, length)) => Ok(length),
        Err(_) => Err(Error::InvalidContentLength),
    })
}
