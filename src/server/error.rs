use std::error::Error;
use std::fmt;
use std::io;
use std::num::ParseIntError;
use std::str::Utf8Error;

use httparse;

use crate::menu::{MenuBuilder, Renderer};


quick_error!{
    /// Error reading the request off the wire
    ///
    /// Gopher requests can't fail to parse, so all of these except `Io`
    /// come from the HTTP side of the listener.
    #[derive(Debug)]
    pub enum RequestError {
        Io(err: io::Error) {
            from()
            source(err)
            display("i/o error reading request: {}", err)
        }
        HeadersAreTooLarge {
            display("headers are larger than server::MAX_HEADERS_SIZE")
        }
        BadHeaders(e: httparse::Error) {
            from()
            display("error parsing headers: {:?}", e)
        }
        BadUtf8(err: Utf8Error) {
            from()
            source(err)
            display("bad utf8 in the request path: {}", err)
        }
        BadContentLength(err: ParseIntError) {
            source(err)
            display("error parsing `Content-Length` header: {}", err)
        }
        DuplicateContentLength {
            display("duplicate `Content-Length` header in request")
        }
        UnsupportedTransferEncoding {
            display("only identity transfer encoding is supported")
        }
        PayloadTooLarge {
            display("payload is larger than is allowed by server settings")
        }
        PrematureEndOfStream {
            display("premature end of stream")
        }
    }
}

/// A trait which represents an error which can be formatted as an error page
pub trait HttpError: fmt::Debug {
    /// Return HTTP status code and status text
    ///
    /// The status text and code are also printed on the error page itself
    fn http_status(&self) -> (u16, &'static str);

    /// Human readable explanation shown below the status
    fn details(&self) -> Option<String> {
        None
    }
}

impl HttpError for RequestError {
    fn http_status(&self) -> (u16, &'static str) {
        use self::RequestError::*;
        match *self {
            Io(_) => (400, "Bad Request"),
            HeadersAreTooLarge => (431, "Request Header Fields Too Large"),
            BadHeaders(_) => (400, "Bad Request"),
            BadUtf8(_) => (400, "Bad Request"),
            BadContentLength(_) => (400, "Bad Request"),
            DuplicateContentLength => (400, "Bad Request"),
            UnsupportedTransferEncoding => (501, "Not Implemented"),
            PayloadTooLarge => (413, "Payload Too Large"),
            // This one almost never reaches the destination
            PrematureEndOfStream => (400, "Bad Request"),
        }
    }
    fn details(&self) -> Option<String> {
        Some(self.to_string())
    }
}


quick_error!{
    /// Error returned by a `Handler`
    #[derive(Debug)]
    pub enum HandlerError {
        NotFound {
            display("The requested URL was not found on the server.")
        }
        Forbidden {
            display("You don't have the permission to access the requested \
                     resource.")
        }
        BadRequest(message: String) {
            display("{}", message)
        }
        Status(code: u16, name: &'static str, details: Option<String>) {
            display("{} {}", code, name)
        }
        Internal(err: Box<dyn Error + Send + Sync>) {
            from()
            display("internal error: {}", err)
        }
        Io(err: io::Error) {
            from()
            source(err)
            display("i/o error: {}", err)
        }
    }
}

impl HttpError for HandlerError {
    fn http_status(&self) -> (u16, &'static str) {
        use self::HandlerError::*;
        match *self {
            NotFound => (404, "Not Found"),
            Forbidden => (403, "Forbidden"),
            BadRequest(_) => (400, "Bad Request"),
            Status(code, name, _) => (code, name),
            Internal(_) => (500, "Internal Server Error"),
            Io(ref err) if err.kind() == io::ErrorKind::NotFound
            => (404, "Not Found"),
            Io(ref err) if err.kind() == io::ErrorKind::PermissionDenied
            => (403, "Forbidden"),
            Io(_) => (500, "Internal Server Error"),
        }
    }
    fn details(&self) -> Option<String> {
        use self::HandlerError::*;
        match *self {
            NotFound | Forbidden | BadRequest(_) => Some(self.to_string()),
            Status(_, _, ref details) => details.clone(),
            Io(ref err) if err.kind() == io::ErrorKind::NotFound
            => Some(NotFound.to_string()),
            Internal(_) | Io(_) => None,
        }
    }
}

impl HandlerError {
    pub fn internal<E>(err: E) -> HandlerError
        where E: Into<Box<dyn Error + Send + Sync>>
    {
        HandlerError::Internal(err.into())
    }
}

const FALLBACK_DESCRIPTION: &'static str = "An internal error has occurred";

/// Debug dump of the error followed by its chain of sources
fn trace(err: &dyn HttpError) -> String {
    format!("{:#?}", err)
}

/// Renders an error for a gopher client
///
/// There's no way to know if the client asked for a menu, a text file or a
/// binary file. Paths whose last segment has a file extension get a bare
/// text body, everything else gets a menu.
pub fn render_error(err: &dyn HttpError, path: &str, menu: &MenuBuilder,
    renderer: &Renderer, show_stack_trace: bool)
    -> String
{
    let (code, name) = err.http_status();
    let details = match err.details() {
        Some(details) => details,
        None if show_stack_trace => trace(err),
        None => FALLBACK_DESCRIPTION.to_string(),
    };
    let body = [menu.error(code, name), String::new(),
                renderer.wrap(&details)];
    if has_extension(path) {
        body.join("\r\n")
    } else {
        renderer.render(&body)
    }
}

/// Whether the last path segment looks like a file name
fn has_extension(path: &str) -> bool {
    let path = path.split('?').next().unwrap_or("");
    let name = path.rsplit('/').next().unwrap_or("");
    name.trim_start_matches('.').contains('.')
}

#[cfg(test)]
mod test {
    use std::io;
    use crate::menu::{MenuBuilder, Renderer};
    use super::{HandlerError, HttpError, RequestError, render_error};
    use super::has_extension;

    fn menu() -> MenuBuilder {
        MenuBuilder::new("127.0.0.1", 7000)
    }

    #[test]
    fn test_not_found_menu() {
        let text = render_error(&HandlerError::NotFound, "/invalid_url",
                                &menu(), &Renderer::default(), false);
        assert!(text.starts_with(
            "iError: 404 Not Found\tfake\texample.com\t0\r\n"));
        assert!(text.contains("The requested URL was not found"));
        assert!(text.ends_with("\r\n.\r\n"));
    }

    #[test]
    fn test_not_found_file() {
        let text = render_error(&HandlerError::NotFound, "/file.txt",
                                &menu(), &Renderer::default(), false);
        assert!(text.starts_with("Error: 404 Not Found\r\n\r\n"));
        assert!(!text.ends_with("\r\n.\r\n"));
    }

    #[test]
    fn test_internal_fallback() {
        let err = HandlerError::internal("division by zero");
        let text = render_error(&err, "/internal_error", &menu(),
                                &Renderer::default(), false);
        assert!(text.starts_with(
            "iError: 500 Internal Server Error\tfake\texample.com\t0\r\n"));
        assert!(text.contains("An internal error has occurred"));
        assert!(!text.contains("division by zero"));
    }

    #[test]
    fn test_internal_trace() {
        let err = HandlerError::internal("division by zero");
        let text = render_error(&err, "/internal_error.txt", &menu(),
                                &Renderer::default(), true);
        assert!(text.starts_with("Error: 500 Internal Server Error\r\n"));
        assert!(text.contains("division by zero"));
    }

    #[test]
    fn test_status() {
        let err = HandlerError::Status(418, "I'm a teapot", None);
        assert_eq!(err.http_status(), (418, "I'm a teapot"));
        assert_eq!(err.details(), None);
        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(HandlerError::from(err).http_status(), (404, "Not Found"));
        assert_eq!(RequestError::HeadersAreTooLarge.http_status().0, 431);
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("/internal_error.txt"));
        assert!(has_extension("/a/b/c.tar.gz"));
        assert!(has_extension("/a.b/c.d?x=y"));
        assert!(!has_extension("/a.b/c"));
        assert!(!has_extension("/"));
        assert!(!has_extension("/.bashrc"));
        assert!(!has_extension("/menu?file=x.txt"));
    }
}
