//! Request line classification and request head parsing
//!
//! A gopher transaction looks like this:
//!
//! 1. The client opens a TCP connection and the server says nothing.
//! 2. The client sends a selector followed by CR/LF (or nothing at all).
//! 3. The server sends the content and closes the connection.
//!
//! A search adds a tab and the query text after the selector, and gopher+
//! adds yet another tab and a gopher+ string, which we ignore:
//!
//! ```text
//! <selector><CR><LF>
//! <selector><TAB><search><CR><LF>
//! <selector><TAB><search><TAB><gopher+ string><CR><LF>
//! ```
//!
//! There is no status, version or header in either direction. Requests that
//! look like HTTP are parsed as HTTP instead, so both protocols can share a
//! single listening port.
use std::io::{BufRead, Read};
use std::str::from_utf8;

use httparse;

use super::{MAX_HEADERS_NUM, MAX_HEADERS_SIZE};
use super::error::RequestError;
use super::request::Head;
use crate::headers;
use crate::version::Version;


/// Protocol detected from the first request line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `<method> <target> HTTP/x.y`
    Http,
    /// `GET <target>`
    Http09,
    /// Anything else
    Gopher,
}

/// Decodes bytes as ISO-8859-1
///
/// Gopher predates utf-8, every octet must be accepted.
pub fn decode_latin1(raw: &[u8]) -> String {
    raw.iter().map(|&b| b as char).collect()
}

/// Decodes the raw first line and strips the line terminator
pub fn request_line(raw: &[u8]) -> String {
    let line = decode_latin1(raw);
    line.trim_end_matches(|c| c == '\r' || c == '\n').to_string()
}

pub fn classify(line: &str) -> LineKind {
    let words = line.split_whitespace().collect::<Vec<_>>();
    match words.len() {
        3 if words[2].starts_with("HTTP/") => LineKind::Http,
        2 if words[0] == "GET" => LineKind::Http09,
        _ => LineKind::Gopher,
    }
}

/// Parses a gopher request line
///
/// The selector gets a leading slash when it lacks one, since handlers
/// route on absolute paths. The gopher+ field, if any, is dropped.
pub fn parse_gopher(line: &str) -> Head {
    let mut parts = line.split('\t');
    let selector = parts.next().unwrap_or("");
    let search_text = parts.next().unwrap_or("");
    let path = if selector.is_empty() {
        "/".to_string()
    } else if !selector.starts_with('/') {
        format!("/{}", selector)
    } else {
        selector.to_string()
    };
    Head {
        version: Version::Gopher,
        method: "GET".to_string(),
        path: path,
        search_text: search_text.to_string(),
        headers: Vec::new(),
    }
}

fn parse_http09(line: &str) -> Head {
    let target = line.split_whitespace().nth(1).unwrap_or("/");
    Head {
        version: Version::Http09,
        method: "GET".to_string(),
        path: target.to_string(),
        search_text: String::new(),
        headers: Vec::new(),
    }
}

/// Reads the first line, up to and including `\n` or `limit` bytes
pub fn read_line<R: BufRead>(reader: &mut R, limit: usize)
    -> Result<Vec<u8>, RequestError>
{
    let mut buf = Vec::new();
    reader.by_ref().take(limit as u64).read_until(b'\n', &mut buf)?;
    Ok(buf)
}

/// Reads and parses everything up to the request body
///
/// `first` is the raw first line as returned by `read_line`. For HTTP/1.x
/// the header block is read up to the blank line and the body is read when
/// `Content-Length` is given, at most `max_body` bytes of it.
pub fn read_request<R: BufRead>(reader: &mut R, first: &[u8],
    max_body: usize)
    -> Result<(Head, Vec<u8>), RequestError>
{
    let line = request_line(first);
    match classify(&line) {
        LineKind::Gopher => Ok((parse_gopher(&line), Vec::new())),
        LineKind::Http09 => Ok((parse_http09(&line), Vec::new())),
        LineKind::Http => {
            let mut raw = first.to_vec();
            read_header_block(reader, &mut raw)?;
            let head = parse_http(&raw)?;
            let body = read_body(reader, &head, max_body)?;
            Ok((head, body))
        }
    }
}

fn read_header_block<R: BufRead>(reader: &mut R, raw: &mut Vec<u8>)
    -> Result<(), RequestError>
{
    loop {
        let left = MAX_HEADERS_SIZE.saturating_sub(raw.len());
        if left == 0 {
            return Err(RequestError::HeadersAreTooLarge);
        }
        let start = raw.len();
        reader.by_ref().take(left as u64).read_until(b'\n', raw)?;
        let line = &raw[start..];
        if line.is_empty() {
            return Err(RequestError::PrematureEndOfStream);
        }
        if line == b"\r\n" || line == b"\n" {
            return Ok(());
        }
        if !line.ends_with(b"\n") && raw.len() >= MAX_HEADERS_SIZE {
            return Err(RequestError::HeadersAreTooLarge);
        }
    }
}

pub fn parse_http(raw: &[u8]) -> Result<Head, RequestError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS_NUM];
    let mut req = httparse::Request::new(&mut headers);
    match req.parse(raw)? {
        httparse::Status::Complete(_) => {}
        httparse::Status::Partial => {
            return Err(RequestError::PrematureEndOfStream);
        }
    }
    let mut header_list = Vec::with_capacity(req.headers.len());
    for header in req.headers.iter() {
        let value = from_utf8(header.value)?;
        header_list.push((header.name.to_string(), value.to_string()));
    }
    Ok(Head {
        version: if req.version == Some(1) {
            Version::Http11
        } else {
            Version::Http10
        },
        method: req.method.unwrap_or("GET").to_string(),
        path: req.path.unwrap_or("/").to_string(),
        search_text: String::new(),
        headers: header_list,
    })
}

fn read_body<R: BufRead>(reader: &mut R, head: &Head, max_body: usize)
    -> Result<Vec<u8>, RequestError>
{
    let mut length = None;
    for &(ref name, ref value) in head.headers.iter() {
        if headers::is_transfer_encoding(name)
            && !headers::is_identity(value.as_bytes())
        {
            return Err(RequestError::UnsupportedTransferEncoding);
        }
        if headers::is_content_length(name) {
            if length.is_some() {
                return Err(RequestError::DuplicateContentLength);
            }
            let value = value.trim().parse::<u64>()
                .map_err(RequestError::BadContentLength)?;
            length = Some(value);
        }
    }
    let length = match length {
        Some(x) if x > max_body as u64 => {
            return Err(RequestError::PayloadTooLarge);
        }
        Some(x) => x as usize,
        None => return Ok(Vec::new()),
    };
    let mut body = Vec::with_capacity(length);
    reader.by_ref().take(length as u64).read_to_end(&mut body)?;
    if body.len() < length {
        return Err(RequestError::PrematureEndOfStream);
    }
    Ok(body)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;
    use crate::version::Version;
    use crate::server::error::RequestError;
    use super::{classify, parse_gopher, read_line, read_request};
    use super::{LineKind, decode_latin1, request_line};

    fn parse(data: &[u8]) -> Result<(super::Head, Vec<u8>), RequestError> {
        let mut reader = Cursor::new(data.to_vec());
        let first = read_line(&mut reader, 8192)?;
        read_request(&mut reader, &first, 1024)
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("GET / HTTP/1.1"), LineKind::Http);
        assert_eq!(classify("POST /form HTTP/1.0"), LineKind::Http);
        assert_eq!(classify("GET /"), LineKind::Http09);
        assert_eq!(classify("/"), LineKind::Gopher);
        assert_eq!(classify(""), LineKind::Gopher);
        assert_eq!(classify("/search\tMy Search String"), LineKind::Gopher);
        assert_eq!(classify("GET / FTP/1.0"), LineKind::Gopher);
        assert_eq!(classify("PUT /"), LineKind::Gopher);
    }

    #[test]
    fn test_search() {
        let head = parse_gopher("/search\tMy Search String");
        assert_eq!(head.path, "/search");
        assert_eq!(head.search_text, "My Search String");
        assert_eq!(head.version, Version::Gopher);
    }

    #[test]
    fn test_selector_normalized() {
        assert_eq!(parse_gopher("").path, "/");
        assert_eq!(parse_gopher("menu").path, "/menu");
        assert_eq!(parse_gopher("\tquery").path, "/");
        assert_eq!(parse_gopher("\tquery").search_text, "query");
    }

    #[test]
    fn test_gopher_plus_ignored() {
        let head = parse_gopher("/\t\tgopher plus data");
        assert_eq!(head.path, "/");
        assert_eq!(head.search_text, "");
        let head = parse_gopher("/x\t  spaced  \t+");
        assert_eq!(head.search_text, "  spaced  ");
    }

    #[test]
    fn test_latin1() {
        assert_eq!(decode_latin1(b"caf\xe9"), "caf\u{e9}");
        assert_eq!(request_line(b"/a\r\n"), "/a");
        assert_eq!(request_line(b"/a\n"), "/a");
        assert_eq!(request_line(b"\r\n"), "");
    }

    #[test]
    fn test_read_gopher() {
        let (head, body) = parse(b"/search\tMy Search String\r\n").unwrap();
        assert_eq!(head.path, "/search");
        assert_eq!(head.search_text, "My Search String");
        assert!(body.is_empty());
        let (head, _) = parse(b"/\r\ntwo line request\r\nthird").unwrap();
        assert_eq!(head.path, "/");
        let (head, _) = parse(b"").unwrap();
        assert_eq!(head.path, "/");
    }

    #[test]
    fn test_read_http() {
        let (head, body) = parse(b"GET /x?y=1 HTTP/1.1\r\n\
                                   Host: example.com\r\n\r\n").unwrap();
        assert_eq!(head.version, Version::Http11);
        assert_eq!(head.method, "GET");
        assert_eq!(head.path, "/x?y=1");
        assert_eq!(head.headers,
                   vec![("Host".to_string(), "example.com".to_string())]);
        assert!(body.is_empty());
    }

    #[test]
    fn test_read_http_body() {
        let (head, body) = parse(b"POST /f HTTP/1.0\r\n\
                                   Content-Length: 5\r\n\r\nhello!").unwrap();
        assert_eq!(head.version, Version::Http10);
        assert_eq!(body, b"hello");
    }

    #[test]
    fn test_read_http09() {
        let (head, _) = parse(b"GET /page\r\n").unwrap();
        assert_eq!(head.version, Version::Http09);
        assert_eq!(head.path, "/page");
    }

    #[test]
    fn test_http_errors() {
        assert_matches!(parse(b"GET / HTTP/1.1\r\nHost: x\r\n"),
                        Err(RequestError::PrematureEndOfStream));
        assert_matches!(parse(b"POST / HTTP/1.1\r\n\
                               Content-Length: 5000\r\n\r\n"),
                        Err(RequestError::PayloadTooLarge));
        assert_matches!(parse(b"POST / HTTP/1.1\r\n\
                               Content-Length: x\r\n\r\n"),
                        Err(RequestError::BadContentLength(_)));
        assert_matches!(parse(b"POST / HTTP/1.1\r\n\
                               Transfer-Encoding: chunked\r\n\r\n"),
                        Err(RequestError::UnsupportedTransferEncoding));
        assert_matches!(parse(b"POST / HTTP/1.1\r\n\
                               Content-Length: 10\r\n\r\nshort"),
                        Err(RequestError::PrematureEndOfStream));
    }

    #[test]
    fn test_headers_too_large() {
        let mut data = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..2000 {
            data.extend(format!("X-Header-{}: value\r\n", i).as_bytes());
        }
        data.extend(b"\r\n");
        assert_matches!(parse(&data), Err(RequestError::HeadersAreTooLarge));
    }
}
