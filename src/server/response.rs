use std::io::{self, Write};

use chrono::Utc;

use crate::version::Version;


/// Value of the `Server` header on HTTP responses
pub const SERVER_VERSION: &'static str =
    concat!("http-gopher/", env!("CARGO_PKG_VERSION"));

/// Response produced by a handler
///
/// For gopher only the body reaches the wire. Status and content type are
/// used when the same handler answers an HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    reason: &'static str,
    content_type: String,
    body: Vec<u8>,
    passthrough: bool,
}

impl Response {
    /// Text response, typically a rendered menu
    pub fn text<S: Into<String>>(body: S) -> Response {
        Response {
            status: 200,
            reason: "OK",
            content_type: "text/plain; charset=utf-8".to_string(),
            body: body.into().into_bytes(),
            passthrough: false,
        }
    }

    /// Raw file data that must be sent unaltered
    ///
    /// Passthrough bodies are never scanned for links to rewrite.
    pub fn file(data: Vec<u8>, content_type: &str) -> Response {
        Response {
            status: 200,
            reason: "OK",
            content_type: content_type.to_string(),
            body: data,
            passthrough: true,
        }
    }

    pub fn html<S: Into<String>>(body: S) -> Response {
        Response {
            content_type: "text/html; charset=utf-8".to_string(),
            .. Response::text(body)
        }
    }

    pub fn with_status(mut self, status: u16, reason: &'static str)
        -> Response
    {
        self.status = status;
        self.reason = reason;
        self
    }

    pub fn status(&self) -> (u16, &'static str) {
        (self.status, self.reason)
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn set_body(&mut self, body: Vec<u8>) {
        self.body = body;
    }

    pub fn is_passthrough(&self) -> bool {
        self.passthrough
    }
}

/// Writes the response in the shape the protocol version expects
///
/// Gopher and HTTP/0.9 get the bare body, HTTP/1.x gets a status line and
/// headers first. The connection is always closed afterwards, so the
/// response says so.
pub fn write_response<W: Write>(out: &mut W, version: Version,
    response: &Response)
    -> io::Result<()>
{
    if version.sends_head() {
        let (status, reason) = response.status();
        write!(out, "{} {} {}\r\n", version, status, reason)?;
        write!(out, "Server: {}\r\n", SERVER_VERSION)?;
        write!(out, "Date: {}\r\n",
               Utc::now().format("%a, %d %b %Y %H:%M:%S GMT"))?;
        write!(out, "Content-Type: {}\r\n", response.content_type())?;
        write!(out, "Content-Length: {}\r\n", response.body().len())?;
        write!(out, "Connection: close\r\n\r\n")?;
    }
    out.write_all(response.body())?;
    out.flush()
}
