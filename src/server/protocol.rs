use std::io::{BufReader, Read, Write};
use std::net::SocketAddr;

use crate::menu::{MenuBuilder, Renderer};
use crate::session::{Session, SESSION_PARAM};
use crate::version::Version;
use super::context::Context;
use super::error::{HandlerError, HttpError, RequestError};
use super::parser::{classify, read_line, read_request, request_line};
use super::parser::LineKind;
use super::request::Request;
use super::response::{Response, write_response};
use super::redirect;


/// Per-request helpers handed to a `Handler`
///
/// The session is taken back after the handler returns and is written into
/// the links of the response.
#[derive(Debug)]
pub struct Scope {
    /// Builds menu lines pointing back at this server
    pub menu: MenuBuilder,
    pub renderer: Renderer,
    pub session: Session,
}

/// An application served over gopher (and HTTP on the same port)
///
/// Errors are turned into a gopher error document or an HTTP error page
/// depending on the protocol the client used.
pub trait Handler {
    fn request(&self, req: &Request, scope: &mut Scope)
        -> Result<Response, HandlerError>;
}

impl<F> Handler for F
    where F: Fn(&Request, &mut Scope) -> Result<Response, HandlerError>
{
    fn request(&self, req: &Request, scope: &mut Scope)
        -> Result<Response, HandlerError>
    {
        (self)(req, scope)
    }
}

/// Reads a single request, answers it and returns
///
/// The caller closes the connection afterwards. Errors returned are
/// transport errors, there is nobody to report them to except the log.
pub fn process_connection<S, H>(stream: &mut S, context: &Context<H>,
    secure: bool, peer: Option<SocketAddr>, local: SocketAddr)
    -> Result<(), RequestError>
    where S: Read + Write,
          H: Handler,
{
    let config = context.config();
    let (first, parsed) = {
        let mut reader = BufReader::new(&mut *stream);
        let first = read_line(&mut reader, config.max_request_line)?;
        let parsed = read_request(&mut reader, &first, config.max_body_size);
        (first, parsed)
    };
    let line = request_line(&first);
    let (host, port) = config.server_address(local);
    let (version, response) = match parsed {
        Ok((head, body)) => {
            let version = head.version;
            debug!("Request {:?} classified as {}", line, version);
            let req = Request::new(head, body, line.clone(), secure, peer,
                                   host, port);
            (version, respond(context, &req))
        }
        Err(RequestError::Io(e)) => return Err(RequestError::Io(e)),
        Err(e) => {
            debug!("Bad request {:?}: {}", line, e);
            let version = match classify(&line) {
                LineKind::Http if line.ends_with("HTTP/1.1")
                => Version::Http11,
                _ => Version::Http10,
            };
            (version, context.emit_error_page(&e))
        }
    };
    write_response(stream, version, &response)?;
    info!("{} {:?} {} {}",
        peer.map(|x| x.to_string()).unwrap_or_else(|| "-".to_string()),
        line, response.status().0, response.body().len());
    Ok(())
}

fn respond<H: Handler>(context: &Context<H>, req: &Request) -> Response {
    let host = req.server_host();
    let port = req.server_port();
    if let Some(address) = redirect::target(req.selector()) {
        return Response::html(redirect::page(address));
    }
    let mut scope = Scope {
        menu: MenuBuilder::new(host, port),
        renderer: context.renderer().clone(),
        session: context.open_session(req.arg(SESSION_PARAM).as_deref()),
    };
    let mut response = match context.handler().request(req, &mut scope) {
        Ok(response) => response,
        Err(e) => {
            let (code, _) = e.http_status();
            if code >= 500 {
                error!("Error handling {:?}: {}", req.selector(), e);
            } else {
                debug!("Error handling {:?}: {}", req.selector(), e);
            }
            if req.is_gopher() {
                context.emit_gopher_error(&e, req.path(), &scope.menu)
            } else {
                context.emit_error_page(&e)
            }
        }
    };
    context.save_session(&scope.session, &mut response, host, port);
    response
}
