//! Error handling for the http server

use std::fmt;
use std::io;

/// A Result for internal operations.
pub type Result<T> = ::std::result::Result<T, Error>;

/// All errors which might arise while serving a connection
#[derive(Debug)]
pub enum Error {
    /// Reading from or writing to the client or a pipe failed
    Io(io::Error),
    /// The CGI program could not be started (pipes or process)
    Spawn(io::Error),
    RequestLineMalformed,
    PathNotInOriginForm,
    MissingContentLength,
    InvalidContentLength,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "I/O error: {}", e),
            Error::Spawn(ref e) => write!(f, "could not start CGI program: {}", e),
            Error::RequestLineMalformed => f.write_str("malformed request line"),
            Error::PathNotInOriginForm => {
                f.write_str("request target does not start with '/'")
            }
            Error::MissingContentLength => {
                f.write_str("POST request without a Content-Length")
            }
            Error::InvalidContentLength => {
                f.write_str("Content-Length is not a decimal integer")
            }
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}
