use std::fmt::{self, Display};

/// Protocol spoken on a connection.
///
/// The gopher marker is set by the request parser when the first line does
/// not look like HTTP. It is what the response writer uses to decide that
/// neither a status line nor headers may be sent.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Version {
    /// Gopher (RFC 1436), one selector line in and a raw body out.
    Gopher,
    /// HTTP/0.9, `GET <path>` with no headers on either side.
    Http09,
    /// HTTP/1.0 protocol version.
    Http10,
    /// HTTP/1.1 protocol version as described in RFC7230 and others.
    Http11,
}

impl Version {
    /// Whether the response starts with a status line and headers
    pub fn sends_head(&self) -> bool {
        match *self {
            Version::Http10 | Version::Http11 => true,
            Version::Gopher | Version::Http09 => false,
        }
    }

    /// The URL scheme requests of this version are served under
    pub fn scheme(&self) -> &'static str {
        match *self {
            Version::Gopher => "gopher",
            _ => "http",
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::Version::*;
        f.write_str(match *self {
            Gopher => "gopher",
            Http09 => "HTTP/0.9",
            Http10 => "HTTP/1.0",
            Http11 => "HTTP/1.1",
        })
    }
}
