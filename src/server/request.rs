use std::net::SocketAddr;

use url::form_urlencoded;

use crate::headers;
use crate::version::Version;


#[derive(Debug, Clone, PartialEq, Eq)]
/// Request head as read from the wire
///
/// For gopher only `path` and `search_text` carry information, the rest is
/// filled in so that gopher and HTTP requests look the same to a handler.
pub struct Head {
    /// The protocol version, `Version::Gopher` for gopher requests.
    pub version: Version,
    /// The HTTP method. Always `GET` for gopher.
    pub method: String,
    /// The selector or request target, always starting with `/`. It may
    /// contain a query string.
    pub path: String,
    /// Search text following the first tab of a gopher request.
    pub search_text: String,
    /// HTTP headers, empty for gopher and HTTP/0.9.
    pub headers: Vec<(String, String)>,
}

/// Normalized request handed to a `Handler`
///
/// Constructed once per connection, never modified afterwards.
#[derive(Debug, Clone)]
pub struct Request {
    head: Head,
    body: Vec<u8>,
    request_line: String,
    secure: bool,
    client: Option<SocketAddr>,
    server_host: String,
    server_port: u16,
}

impl Request {
    pub fn new(head: Head, body: Vec<u8>, request_line: String,
        secure: bool, client: Option<SocketAddr>,
        server_host: String, server_port: u16)
        -> Request
    {
        Request {
            head: head,
            body: body,
            request_line: request_line,
            secure: secure,
            client: client,
            server_host: server_host,
            server_port: server_port,
        }
    }

    pub fn version(&self) -> Version {
        self.head.version
    }

    pub fn is_gopher(&self) -> bool {
        self.head.version == Version::Gopher
    }

    /// The URL scheme, `gopher` or `http`
    pub fn scheme(&self) -> &'static str {
        self.head.version.scheme()
    }

    pub fn method(&self) -> &str {
        &self.head.method
    }

    /// Full selector including the query string
    pub fn selector(&self) -> &str {
        &self.head.path
    }

    /// Selector without the query string
    pub fn path(&self) -> &str {
        self.head.path.split('?').next().unwrap_or("/")
    }

    pub fn query_string(&self) -> Option<&str> {
        self.head.path.splitn(2, '?').nth(1)
    }

    /// Decoded query parameters in the order they appear
    pub fn args(&self) -> Vec<(String, String)> {
        match self.query_string() {
            Some(query) => form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// First value of the query parameter `name`
    pub fn arg(&self, name: &str) -> Option<String> {
        self.args().into_iter()
            .find(|&(ref k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// Text of a gopher search, empty when the client sent none
    pub fn search_text(&self) -> &str {
        &self.head.search_text
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.iter()
            .find(|&&(ref k, _)| k.eq_ignore_ascii_case(name))
            .map(|&(_, ref v)| &v[..])
    }

    /// Value of the `Host` header, HTTP/1.x only
    pub fn host(&self) -> Option<&str> {
        self.head.headers.iter()
            .find(|&&(ref k, _)| headers::is_host(k))
            .map(|&(_, ref v)| &v[..])
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.head.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// First line sent by the client, without the line terminator
    pub fn request_line(&self) -> &str {
        &self.request_line
    }

    /// Whether the connection was negotiated with TLS
    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn client(&self) -> Option<SocketAddr> {
        self.client
    }

    /// Host the connection was accepted on, used for internal links
    pub fn server_host(&self) -> &str {
        &self.server_host
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }
}
