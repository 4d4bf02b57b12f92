//! Server functionality

mod lines;
mod request;
mod router;
mod static_files;

pub use self::lines::{discard_headers, read_line};
pub use self::request::{Method, Request};

use crate::cgi;
use crate::config::Config;
use crate::errors::Result;
use crate::log_util::ascii_escape;
use crate::server::error_messages::*;
use crate::server::router::Route;

use std::fs::canonicalize;
use std::io::{self, BufReader, Read, Write};
use std::marker::PhantomData;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

/// Value of the `Server` header
pub const SERVER_SOFTWARE: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// A bound listener plus the configuration its workers share
pub struct Server {
    listener: TcpListener,
    config: Arc<Config>,
}

impl Server {
    /// Binds the configured address and port.
    ///
    /// This function has _no_ security. Wanna serve `/`? How about
    /// `~/.ssh`? Sure! Put those bytes on the Web. Anything executable under
    /// the webroot runs on request, too.
    pub fn bind(mut config: Config) -> Result<Server> {
        config.site.webroot = canonicalize(&config.site.webroot)?;
        let listener = TcpListener::bind((config.listen.address, config.listen.port))?;

        Ok(Server {
            listener,
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, one thread per connection.
    pub fn run(self) -> Result<()> {
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let config = Arc::clone(&self.config);
                    let spawned = thread::Builder::new()
                        .name(String::from("connection"))
                        .spawn(move || handle_client(stream, &config));

                    // The closure, and the stream with it, is dropped on failure
                    if let Err(e) = spawned {
                        warn!("Could not start a worker: {}", e);
                    }
                }
                Err(e) => {
                    warn!("Failed connection: {}", e);
                }
            };
        }

        Ok(())
    }
}

/// Serves one connection, then closes it by dropping the stream.
fn handle_client(stream: TcpStream, config: &Config) {
    let peer = stream.peer_addr().ok();

    if let Err(e) = dispatch(config, &stream, &stream) {
        match peer {
            Some(addr) => warn!("Error serving {}: {}", addr, e),
            None => warn!("Error serving a request: {}", e),
        }
    }
}

/// Reads one request from `reader` and answers it on `writer`.
///
/// Every outcome, including the error responses, is written before this
/// returns; an `Err` means the exchange was cut short or was a protocol error
/// worth logging, and the caller has nothing left to send.
pub fn dispatch<R, W>(config: &Config, reader: R, writer: W) -> Result<()>
    where R: Read + Send,
          W: Write
{
    let mut source = BufReader::new(reader);
    let res = Response::new(writer);

    match router::route(config, &mut source)? {
        Route::BadRequest(e) => {
            error_400(res)?;
            Err(e)
        }
        Route::Unimplemented(method) => {
            info!("Unimplemented method \"{}\"", ascii_escape(&method));
            Ok(error_501(res)?)
        }
        Route::NotFound(path) => {
            info!("Not found: {}", path.display());
            Ok(error_404(res)?)
        }
        Route::Resource(req) => {
            info!("{} {}", req.method.as_str(), req.raw_path);
            if req.is_cgi {
                cgi::execute(&req, &mut source, res, config.max_line)
            } else {
                static_files::serve(&req, &mut source, res, config.max_line)
            }
        }
    }
}

/// The response being constructed by a responder
///
/// The type parameter represents where in the cycle this response is. When
/// `Status = Fresh`, nothing has been sent to the client and the status and
/// headers can be modified. When `Status = Streaming`, the status line has
/// gone out and everything written is passed to the client verbatim.
pub struct Response<W, Status> {
    writer: W,
    status: ResponseStatus,
    headers: Headers,
    _status: PhantomData<Status>,
}

/// A marker for `Response`, indicating nothing has been sent to the client
pub enum Fresh {}

/// A marker for `Response`, indicating the status line has been sent
pub enum Streaming {}

struct ResponseStatus {
    code: u16,
    reason: &'static str,
}

/// An ordered list of HTTP headers
///
/// Names are case-normalized on input. The first word, and any words after a
/// hyphen, are capitalized, with all other letters lowercased. Insertion
/// order is kept, so responses go out byte-for-byte the same every time.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    entries: Vec<(String, Vec<u8>)>,
}

fn normalize_header_name(name: &str) -> String {
    let lowercased = name.to_ascii_lowercase();
    let mut lower_chars = lowercased.chars();

    let mut normalized = String::with_capacity(lowercased.len());
    if let Some(ch) = lower_chars.next() {
        normalized.push(ch.to_ascii_uppercase());
    } else {
        return normalized;
    }

    let mut after_hyphen = false;
    for ch in lower_chars {
        if ch == '-' {
            after_hyphen = true;
            normalized.push(ch);
        } else if after_hyphen {
            normalized.push(ch.to_ascii_uppercase());
            after_hyphen = false;
        } else {
            normalized.push(ch);
        }
    }

    normalized
}

#[test]
fn normalize_content_type() {
    let expected = "Content-Type";
    assert_eq!(expected, &normalize_header_name("Content-Type"));
    assert_eq!(expected, &normalize_header_name("content-type"));
    assert_eq!(expected, &normalize_header_name("CONTENT-TYPE"));
    assert_eq!(expected, &normalize_header_name("cOnTeNt-TyPe"));
}

impl Headers {
    pub fn new() -> Headers {
        Headers { entries: Vec::new() }
    }

    /// Adds a header; a repeated name has its value replaced in place.
    pub fn insert(&mut self, key: &str, value: Vec<u8>) {
        self.insert_verbatim(normalize_header_name(key), value);
    }

    /// Like `insert`, but the name goes out exactly as given.
    pub fn insert_verbatim<K: Into<String>>(&mut self, key: K, value: Vec<u8>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(name, _)| *name == key) {
            Some((_, entry)) => *entry = value,
            None => self.entries.push((key, value)),
        }
    }

    fn write_to<W: Write>(&self, buffer: &mut W) -> io::Result<()> {
        for (header, content) in &self.entries {
            write!(buffer, "{}: ", header)?;
            buffer.write_all(content)?;
            buffer.write_all(b"\r\n")?;
        }
        Ok(())
    }
}

#[test]
fn headers_keep_order_and_replace_repeats() {
    let mut headers = Headers::new();
    headers.insert("server", Vec::from(&b"a"[..]));
    headers.insert("Content-type", Vec::from(&b"text/html"[..]));
    headers.insert("SERVER", Vec::from(&b"b"[..]));

    let mut out = Vec::new();
    headers.write_to(&mut out).unwrap();
    assert_eq!(out, b"Server: b\r\nContent-Type: text/html\r\n");
}

#[test]
fn verbatim_headers_keep_their_spelling() {
    let mut headers = Headers::new();
    headers.insert_verbatim("Content-type", Vec::from(&b"text/plain"[..]));
    headers.insert_verbatim("Content-type", Vec::from(&b"text/html"[..]));

    let mut out = Vec::new();
    headers.write_to(&mut out).unwrap();
    assert_eq!(out, b"Content-type: text/html\r\n");
}

impl<W: Write> Response<W, Fresh> {
    pub fn new(writer: W) -> Self {
        Response {
            writer,
            status: ResponseStatus { code: 200, reason: "OK" },
            headers: Headers::new(),
            _status: PhantomData,
        }
    }

    #[inline]
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn set_status(&mut self, code: u16, reason: &'static str) {
        self.status = ResponseStatus { code, reason };
    }

    /// Sends the status line, headers, and then all of `stream` as the body.
    pub fn of_stream<R: Read>(mut self, mut stream: R) -> io::Result<u64> {
        let mut head = Vec::with_capacity(128);
        self.write_status_line(&mut head)?;
        self.headers.write_to(&mut head)?;
        head.extend_from_slice(b"\r\n");
        self.writer.write_all(&head)?;

        let sent = io::copy(&mut stream, &mut self.writer)?;
        self.writer.flush()?;
        Ok(sent)
    }

    /// Commits to the current status by sending the status line alone.
    ///
    /// Headers set so far are discarded: whatever is written next supplies
    /// its own.
    pub fn start(mut self) -> io::Result<Response<W, Streaming>> {
        let mut line = Vec::with_capacity(32);
        self.write_status_line(&mut line)?;
        self.writer.write_all(&line)?;
        self.writer.flush()?;

        Ok(Response {
            writer: self.writer,
            status: self.status,
            headers: Headers::new(),
            _status: PhantomData,
        })
    }

    fn write_status_line<B: Write>(&self, buffer: &mut B) -> io::Result<()> {
        write!(buffer, "HTTP/1.0 {} {}\r\n", self.status.code, self.status.reason)
    }
}

impl<W: Write> Response<W, Streaming> {
    /// Hands back the connection, for when the answer has to change course
    /// after the status line went out.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Write for Response<W, Streaming> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

pub mod error_messages {
    use super::{Fresh, Response, SERVER_SOFTWARE};

    use std::io::{self, Write};

    /// Sends a fixed page. The 400 and 500 pages spell their type header
    /// `Content-type`, and that spelling is kept on the wire.
    fn canned<W: Write>(mut res: Response<W, Fresh>, code: u16, reason: &'static str,
                        identify: bool, type_header: &'static str,
                        body: &'static [u8]) -> io::Result<()> {
        res.set_status(code, reason);
        {
            let headers = res.headers_mut();
            if identify {
                headers.insert("Server", Vec::from(SERVER_SOFTWARE));
            }
            headers.insert_verbatim(type_header, Vec::from(mime::TEXT_HTML.essence_str()));
        }

        res.of_stream(body).map(|_| ())
    }

    pub fn error_400<W: Write>(res: Response<W, Fresh>) -> io::Result<()> {
        canned(res, 400, "BAD REQUEST", false, "Content-type", ERROR_400)
    }

    const ERROR_400: &[u8] = b"<P>Your browser sent a bad request, such as a POST without a Content-Length.\r\n";

    pub fn error_404<W: Write>(res: Response<W, Fresh>) -> io::Result<()> {
        canned(res, 404, "NOT FOUND", true, "Content-Type", ERROR_404)
    }

    const ERROR_404: &[u8] = b"<HTML><TITLE>Not Found</TITLE>\r\n<BODY><P>The server could not fulfill\r\nyour request because the resource specified\r\nis unavailable or nonexistent.\r\n</BODY></HTML>\r\n";

    pub fn error_500<W: Write>(res: Response<W, Fresh>) -> io::Result<()> {
        canned(res, 500, "Internal Server Error", false, "Content-type", ERROR_500)
    }

    const ERROR_500: &[u8] = b"<P>Error prohibited CGI execution.\r\n";

    pub fn error_501<W: Write>(res: Response<W, Fresh>) -> io::Result<()> {
        canned(res, 501, "Method Not Implemented", true, "Content-Type", ERROR_501)
    }

    const ERROR_501: &[u8] = b"<HTML><HEAD><TITLE>Method Not Implemented\r\n</TITLE></HEAD>\r\n<BODY><P>HTTP request method not supported.\r\n</BODY></HTML>\r\n";
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::errors::Error;
    use crate::test_util::{exec_lock, script};

    use std::fs::{self, File};
    use std::io::{BufRead, BufReader};
    use std::net::Shutdown;
    use tempfile::TempDir;

    fn site() -> (TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.site.webroot = dir.path().to_owned();
        (dir, config)
    }

    fn exchange(config: &Config, request: &[u8]) -> (Result<()>, Vec<u8>) {
        let mut out = Vec::new();
        let result = dispatch(config, request, &mut out);
        (result, out)
    }

    #[test]
    fn static_file_is_served_verbatim() {
        let (dir, config) = site();
        let contents = b"<html>\r\n\xe2\x9c\x93 binary \x00 safe</html>\n";
        fs::write(dir.path().join("index.html"), &contents[..]).unwrap();

        let (result, out) = exchange(&config, b"GET /index.html HTTP/1.0\r\nHost: x\r\n\r\n");
        result.unwrap();

        let mut expected = format!(
            "HTTP/1.0 200 OK\r\nServer: {}\r\nContent-Type: text/html\r\n\r\n",
            SERVER_SOFTWARE
        ).into_bytes();
        expected.extend_from_slice(contents);
        assert_eq!(out, expected);
    }

    #[test]
    fn missing_file_is_404() {
        let (_dir, config) = site();
        let (result, out) = exchange(&config, b"GET /nope.html HTTP/1.0\r\n\r\n");
        result.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with(&format!(
            "HTTP/1.0 404 NOT FOUND\r\nServer: {}\r\nContent-Type: text/html\r\n\r\n",
            SERVER_SOFTWARE
        )));
        assert!(out.ends_with("is unavailable or nonexistent.\r\n</BODY></HTML>\r\n"));
    }

    #[test]
    fn unsupported_method_is_501() {
        let (dir, config) = site();
        File::create(dir.path().join("index.html")).unwrap();
        let (result, out) = exchange(&config, b"DELETE /index.html HTTP/1.0\r\n\r\n");
        result.unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with(&format!(
            "HTTP/1.0 501 Method Not Implemented\r\nServer: {}\r\n",
            SERVER_SOFTWARE
        )));
        assert!(out.contains("HTTP request method not supported."));
    }

    #[test]
    fn malformed_request_line_is_400() {
        let (_dir, config) = site();
        let (result, out) = exchange(&config, b"GET\r\n\r\n");
        assert!(matches!(result, Err(Error::RequestLineMalformed)));
        assert!(out.starts_with(b"HTTP/1.0 400 BAD REQUEST\r\nContent-type: text/html\r\n\r\n"));
    }

    #[test]
    fn get_with_query_runs_the_program() {
        let _guard = exec_lock();
        let (dir, config) = site();
        script(dir.path(), "env",
               "printf 'Content-Type: text/plain\\r\\n\\r\\n'\n\
                printf '%s|%s|%s' \"$REQUEST_METHOD\" \"$QUERY_STRING\" \"${CONTENT_LENGTH-unset}\"\n");

        let (result, out) = exchange(&config, b"GET /env?a=1&b=2 HTTP/1.0\r\nAccept: */*\r\n\r\n");
        result.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(),
                   "HTTP/1.0 200 OK\r\nContent-Type: text/plain\r\n\r\nGET|a=1&b=2|unset");
    }

    #[test]
    fn post_body_round_trips_through_cat() {
        let _guard = exec_lock();
        let (dir, config) = site();
        script(dir.path(), "cat", "exec cat\n");

        let (result, out) = exchange(
            &config,
            b"POST /cat HTTP/1.0\r\nContent-Length: 5\r\n\r\nhelloEXTRA",
        );
        result.unwrap();
        assert_eq!(out, b"HTTP/1.0 200 OK\r\nhello");
    }

    #[test]
    fn end_to_end_over_tcp() {
        let _guard = exec_lock();
        let (dir, mut config) = site();
        fs::write(dir.path().join("index.html"), b"hi there\n").unwrap();
        script(dir.path(), "upper", "tr a-z A-Z\n");
        config.listen.address = "127.0.0.1".parse().unwrap();

        let server = Server::bind(config).unwrap();
        let addr = server.local_addr().unwrap();
        thread::spawn(move || server.run());

        let mut conn = TcpStream::connect(addr).unwrap();
        conn.write_all(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        let mut out = Vec::new();
        conn.read_to_end(&mut out).unwrap();
        assert!(out.starts_with(b"HTTP/1.0 200 OK\r\n"));
        assert!(out.ends_with(b"\r\n\r\nhi there\n"));

        let mut conn = TcpStream::connect(addr).unwrap();
        conn.write_all(b"POST /upper HTTP/1.0\r\nContent-length: 4\r\n\r\nabcd").unwrap();
        conn.shutdown(Shutdown::Write).unwrap();
        let mut reader = BufReader::new(conn);
        let mut status = String::new();
        reader.read_line(&mut status).unwrap();
        assert_eq!(status, "HTTP/1.0 200 OK\r\n");
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"ABCD");
    }
}
