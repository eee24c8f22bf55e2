//! Accepting connections
//!
//! Three strategies are supported, chosen when the server is created:
//!
//! * `Iterative` handles one connection at a time in the accepting thread
//! * `Threaded` starts a thread per connection
//! * `Forked` forks a child process per connection (unix only)
//!
//! TLS is negotiated after the connection is handed off, so a slow
//! handshake never blocks `accept()` (except in the iterative server where
//! the acceptor is the only thread).
use std::any::Any;
use std::fmt;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use net2::TcpBuilder;

use crate::config::Config;
use crate::server::{Context, Handler, process_connection};
use crate::tls::{Connection, TlsAcceptor};

mod error;
mod threaded;
#[cfg(unix)] mod forked;

pub use self::error::ServerError;
#[cfg(unix)] pub use self::forked::Children;

const LISTEN_BACKLOG: i32 = 128;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One connection at a time
    Iterative,
    /// A thread per connection
    Threaded,
    /// A child process per connection
    Forked,
}

impl FromStr for Strategy {
    type Err = String;
    fn from_str(s: &str) -> Result<Strategy, String> {
        match s {
            "iterative" => Ok(Strategy::Iterative),
            "threaded" => Ok(Strategy::Threaded),
            "forked" => Ok(Strategy::Forked),
            _ => Err(format!("unknown strategy {:?}", s)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            Strategy::Iterative => "iterative",
            Strategy::Threaded => "threaded",
            Strategy::Forked => "forked",
        })
    }
}


/// Stops a running server from any thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    /// Stops accepting new connections
    ///
    /// The accepting thread is woken up by connecting to the listener.
    /// Connections in flight are finished.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _ = TcpStream::connect(wake_address(self.addr));
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

fn wake_address(addr: SocketAddr) -> SocketAddr {
    match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified()
        => SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), addr.port()),
        IpAddr::V6(ip) if ip.is_unspecified()
        => SocketAddr::new(IpAddr::V6(Ipv6Addr::LOCALHOST), addr.port()),
        _ => addr,
    }
}


/// A gopher server bound to a listening socket
pub struct GopherServer<H> {
    listener: TcpListener,
    local_addr: SocketAddr,
    context: Arc<Context<H>>,
    tls: Option<TlsAcceptor>,
    strategy: Strategy,
    shutdown: ShutdownHandle,
}

impl<H: Handler + Send + Sync + 'static> GopherServer<H> {
    /// Binds a listener with `SO_REUSEADDR`
    ///
    /// The forked strategy fails here on platforms without `fork()`.
    pub fn bind<A: ToSocketAddrs>(addr: A, strategy: Strategy,
        config: Config, handler: H)
        -> Result<GopherServer<H>, ServerError>
    {
        if strategy == Strategy::Forked && !cfg!(unix) {
            return Err(ServerError::ForkUnsupported);
        }
        let listener = listen(addr)?;
        let local_addr = listener.local_addr()?;
        Ok(GopherServer {
            listener: listener,
            local_addr: local_addr,
            context: Arc::new(Context::new(config, handler)),
            tls: None,
            strategy: strategy,
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
                addr: local_addr,
            },
        })
    }

    /// Accept TLS handshakes along with plain connections
    pub fn with_tls(mut self, tls: TlsAcceptor) -> GopherServer<H> {
        self.tls = Some(tls);
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Serves connections until shut down
    pub fn serve_forever(self) -> Result<(), ServerError> {
        info!("Serving gopher on {} ({}{})", self.local_addr, self.strategy,
            if self.tls.is_some() { ", tls" } else { "" });
        let result = match self.strategy {
            Strategy::Iterative => self.serve_iterative(),
            Strategy::Threaded => threaded::serve(&self),
            Strategy::Forked => self.serve_forked(),
        };
        info!("Server on {} stopped", self.local_addr);
        result
    }

    fn serve_iterative(&self) -> Result<(), ServerError> {
        while let Some((sock, peer)) = self.accept()? {
            handle_connection(sock, peer, &self.context, self.tls.as_ref());
        }
        Ok(())
    }

    #[cfg(unix)]
    fn serve_forked(&self) -> Result<(), ServerError> {
        forked::serve(self)
    }

    #[cfg(not(unix))]
    fn serve_forked(&self) -> Result<(), ServerError> {
        Err(ServerError::ForkUnsupported)
    }

    /// Next connection, or `None` when the server is shut down
    ///
    /// Failed accepts (e.g. the client reset the connection, or we are out
    /// of file descriptors) are logged and skipped.
    fn accept(&self) -> Result<Option<(TcpStream, SocketAddr)>, ServerError> {
        loop {
            let result = self.listener.accept();
            if self.shutdown.is_shutdown() {
                return Ok(None);
            }
            match result {
                Ok(pair) => return Ok(Some(pair)),
                Err(e) => warn!("Error accepting connection: {}", e),
            }
        }
    }
}

fn listen<A: ToSocketAddrs>(addr: A) -> Result<TcpListener, ServerError> {
    let mut last_error = None;
    for addr in addr.to_socket_addrs()? {
        let builder = match addr {
            SocketAddr::V4(_) => TcpBuilder::new_v4()?,
            SocketAddr::V6(_) => TcpBuilder::new_v6()?,
        };
        builder.reuse_address(true)?;
        match builder.bind(addr) {
            Ok(_) => return Ok(builder.listen(LISTEN_BACKLOG)?),
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        "could not resolve to any address")).into())
}

/// Serves a single accepted connection, whatever happens
///
/// Errors and panics of the handler are logged. The socket is closed when
/// this returns.
pub fn handle_connection<H: Handler>(sock: TcpStream, peer: SocketAddr,
    context: &Context<H>, tls: Option<&TlsAcceptor>)
{
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        try_handle(sock, peer, context, tls)
    }));
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Connection from {} failed: {}", peer, e),
        Err(payload) => {
            error!("Connection from {} panicked: {}", peer,
                   panic_message(&*payload));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}

fn try_handle<H: Handler>(sock: TcpStream, peer: SocketAddr,
    context: &Context<H>, tls: Option<&TlsAcceptor>)
    -> Result<(), ServerError>
{
    sock.set_read_timeout(Some(context.byte_timeout()))?;
    sock.set_write_timeout(Some(context.byte_timeout()))?;
    let local = sock.local_addr()?;
    let mut conn = match tls {
        Some(tls) => tls.accept(sock)?,
        None => Connection::Plain(sock),
    };
    let secure = conn.is_secure();
    let result = process_connection(&mut conn, context, secure, Some(peer),
                                    local);
    conn.close();
    Ok(result?)
}
