use std::time::Duration;

use crate::config::Config;
use crate::menu::{MenuBuilder, Renderer};
use crate::session::{Session, SessionCodec};
use super::error::{HttpError, render_error};
use super::redirect::escape;
use super::Response;


/// State shared by all connections of a server
///
/// Read-only after construction, so it's shared between threads (or
/// copied into forked children) without any locking.
pub struct Context<H> {
    config: Config,
    renderer: Renderer,
    sessions: Option<SessionCodec>,
    handler: H,
}

impl<H> Context<H> {
    pub fn new(config: Config, handler: H) -> Context<H> {
        Context {
            renderer: Renderer::new(config.width),
            sessions: config.secret_key.as_ref()
                .map(|key| SessionCodec::new(key)),
            config: config,
            handler: handler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Timeout of every single read from the client
    pub fn byte_timeout(&self) -> Duration {
        self.config.read_timeout
    }

    /// Error page for HTTP clients
    pub fn emit_error_page(&self, err: &dyn HttpError) -> Response {
        let (code, reason) = err.http_status();
        let title = format!("{} {}", code, reason);
        let body = match err.details() {
            Some(details) => format!(
                "<!DOCTYPE html>\n<html><head><title>{0}</title></head>\n\
                 <body><h1>{0}</h1><p>{1}</p></body></html>\n",
                title, escape(&details)),
            None => format!(
                "<!DOCTYPE html>\n<html><head><title>{0}</title></head>\n\
                 <body><h1>{0}</h1></body></html>\n",
                title),
        };
        Response::html(body).with_status(code, reason)
    }

    /// Error document for gopher clients, a menu or a bare text
    pub fn emit_gopher_error(&self, err: &dyn HttpError, path: &str,
        menu: &MenuBuilder)
        -> Response
    {
        let (code, reason) = err.http_status();
        let body = render_error(err, path, menu, &self.renderer,
                                self.config.show_stack_trace);
        Response::text(body).with_status(code, reason)
    }

    /// Session from the raw `_session` parameter
    ///
    /// Always empty when no secret key is configured.
    pub fn open_session(&self, raw: Option<&str>) -> Session {
        match self.sessions {
            Some(ref codec) => codec.open(raw),
            None => Session::new(),
        }
    }

    pub fn save_session(&self, session: &Session, response: &mut Response,
        host: &str, port: u16)
    {
        if let Some(ref codec) = self.sessions {
            if let Err(e) = codec.save(session, response, host, port) {
                error!("Can't save session: {}", e);
            }
        }
    }
}
