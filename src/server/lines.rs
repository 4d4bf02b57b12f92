//! Line-at-a-time reading of request heads
//!
//! HTTP says lines end in CRLF, but clients in the wild send bare `\n` and
//! occasionally bare `\r`. All three are accepted as a single terminator.

use std::io::{self, BufRead, ErrorKind};

/// Reads one line from `source` into `line`, without its terminator.
///
/// At most `limit` bytes are kept; a longer line is truncated and the rest of
/// it is returned by the next call. A terminator directly following a line of
/// exactly `limit` bytes is still consumed with it. End-of-stream ends the
/// line, so an exhausted source gives an empty line rather than blocking.
///
/// Returns the number of bytes placed in `line`.
pub fn read_line<R: BufRead>(source: &mut R, line: &mut Vec<u8>, limit: usize)
                             -> io::Result<usize>
{
    line.clear();

    while let Some(byte) = peek_byte(source)? {
        match byte {
            b'\n' => {
                source.consume(1);
                break;
            }
            b'\r' => {
                source.consume(1);
                // Only a following '\n' belongs to this terminator
                if peek_byte(source)? == Some(b'\n') {
                    source.consume(1);
                }
                break;
            }
            _ if line.len() >= limit => break,
            b => {
                source.consume(1);
                line.push(b);
            }
        }
    }

    Ok(line.len())
}

/// Reads and throws away header lines up to the blank line ending the head.
///
/// A read failure also ends the head; whatever broke will surface again on
/// the next use of the connection.
pub fn discard_headers<R: BufRead>(source: &mut R, limit: usize) {
    let mut line = Vec::new();
    loop {
        match read_line(source, &mut line, limit) {
            Ok(0) => break,
            Ok(_) => (),
            Err(e) => {
                debug!("Stopped reading headers: {}", e);
                break;
            }
        }
    }
}

fn peek_byte<R: BufRead>(source: &mut R) -> io::Result<Option<u8>> {
    loop {
        match source.fill_buf() {
            Ok(buf) => return Ok(buf.first().cloned()),
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::io::{BufReader, Read};

    fn lines_of(input: &[u8], limit: usize) -> Vec<Vec<u8>> {
        let mut source = input;
        let mut line = Vec::new();
        let mut lines = Vec::new();
        while !source.is_empty() {
            read_line(&mut source, &mut line, limit).unwrap();
            lines.push(line.clone());
        }
        lines
    }

    #[test]
    fn every_terminator_style_is_stripped() {
        let lines = lines_of(b"one\r\ntwo\nthree\rfour\r\n", 64);
        assert_eq!(lines, vec![b"one".to_vec(), b"two".to_vec(),
                               b"three".to_vec(), b"four".to_vec()]);
    }

    #[test]
    fn bare_cr_does_not_eat_the_next_line() {
        let mut source: &[u8] = b"a\r\rb\n";
        let mut line = Vec::new();
        assert_eq!(read_line(&mut source, &mut line, 64).unwrap(), 1);
        assert_eq!(line, b"a");
        assert_eq!(read_line(&mut source, &mut line, 64).unwrap(), 0);
        assert_eq!(read_line(&mut source, &mut line, 64).unwrap(), 1);
        assert_eq!(line, b"b");
    }

    #[test]
    fn blank_line_reads_as_zero() {
        let mut source: &[u8] = b"\r\nbody";
        let mut line = Vec::new();
        assert_eq!(read_line(&mut source, &mut line, 64).unwrap(), 0);
        assert_eq!(source, b"body");
    }

    #[test]
    fn end_of_stream_gives_empty_line() {
        let mut source: &[u8] = b"";
        let mut line = vec![b'x'];
        assert_eq!(read_line(&mut source, &mut line, 64).unwrap(), 0);
        assert!(line.is_empty());
        // And again, without blocking
        assert_eq!(read_line(&mut source, &mut line, 64).unwrap(), 0);
    }

    #[test]
    fn unterminated_last_line_is_returned() {
        let mut source: &[u8] = b"tail";
        let mut line = Vec::new();
        assert_eq!(read_line(&mut source, &mut line, 64).unwrap(), 4);
        assert_eq!(line, b"tail");
    }

    #[test]
    fn long_lines_are_truncated_not_dropped() {
        let mut source: &[u8] = b"abcdefgh\n";
        let mut line = Vec::new();
        assert_eq!(read_line(&mut source, &mut line, 5).unwrap(), 5);
        assert_eq!(line, b"abcde");
        assert_eq!(read_line(&mut source, &mut line, 5).unwrap(), 3);
        assert_eq!(line, b"fgh");
        assert!(source.is_empty());
    }

    #[test]
    fn line_of_exactly_limit_keeps_its_terminator() {
        let mut source: &[u8] = b"abcde\r\nnext\r\n";
        let mut line = Vec::new();
        assert_eq!(read_line(&mut source, &mut line, 5).unwrap(), 5);
        assert_eq!(read_line(&mut source, &mut line, 5).unwrap(), 4);
        assert_eq!(line, b"next");
    }

    #[test]
    fn crlf_split_across_buffer_refills() {
        // A one-byte buffer forces the peek after '\r' to refill
        let mut source = BufReader::with_capacity(1, &b"ab\r\ncd\n"[..]);
        let mut line = Vec::new();
        read_line(&mut source, &mut line, 64).unwrap();
        assert_eq!(line, b"ab");
        read_line(&mut source, &mut line, 64).unwrap();
        assert_eq!(line, b"cd");
    }

    #[test]
    fn discard_headers_stops_at_blank_line() {
        let mut source: &[u8] = b"Host: x\r\nAccept: */*\r\n\r\nhello";
        discard_headers(&mut source, 64);
        let mut rest = String::new();
        source.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "hello");
    }
}
