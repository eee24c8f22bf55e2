//! Opportunistic TLS
//!
//! Every TLS connection starts with a handshake record, whose first byte is
//! `0x16`. A gopher selector practically never starts with that byte, so
//! peeking at it tells if the client wants TLS without any configuration on
//! the client side. Plain and TLS-wrapped gopher are served from the same
//! port this way.
use std::fs::File;
use std::io::{self, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{ServerConfig, ServerConnection, StreamOwned};

use crate::serve::ServerError;

/// First byte of a TLS handshake record
pub const TLS_HANDSHAKE: u8 = 0x16;


/// Whether the client starts with a TLS handshake
///
/// The byte is only peeked at, it is still there for the next read. A
/// connection closed before sending anything is considered plain.
pub fn sniff(sock: &TcpStream) -> io::Result<bool> {
    let mut buf = [0u8; 1];
    let bytes = sock.peek(&mut buf)?;
    Ok(bytes == 1 && buf[0] == TLS_HANDSHAKE)
}

/// Server side TLS settings shared by all connections
#[derive(Clone)]
pub struct TlsAcceptor {
    config: Arc<ServerConfig>,
}

impl TlsAcceptor {
    pub fn new(config: Arc<ServerConfig>) -> TlsAcceptor {
        TlsAcceptor { config: config }
    }

    /// Loads a certificate chain and a private key from PEM files
    pub fn from_pem_files<P, Q>(cert_file: P, key_file: Q)
        -> Result<TlsAcceptor, ServerError>
        where P: AsRef<Path>, Q: AsRef<Path>,
    {
        let cert_file = cert_file.as_ref();
        let key_file = key_file.as_ref();
        let mut reader = open_pem(cert_file)?;
        let certs = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ServerError::ReadPem(cert_file.to_path_buf(), e))?;
        if certs.is_empty() {
            return Err(ServerError::NoCertificates(cert_file.to_path_buf()));
        }
        let mut reader = open_pem(key_file)?;
        let key = rustls_pemfile::private_key(&mut reader)
            .map_err(|e| ServerError::ReadPem(key_file.to_path_buf(), e))?
            .ok_or_else(|| ServerError::NoPrivateKey(key_file.to_path_buf()))?;
        TlsAcceptor::from_der(certs, key)
    }

    /// Generates an ad-hoc self-signed certificate for `hostnames`
    ///
    /// Clients can't verify such a certificate, it's mostly useful for
    /// testing.
    pub fn self_signed(hostnames: &[String])
        -> Result<(TlsAcceptor, CertificateDer<'static>), ServerError>
    {
        let cert = rcgen::generate_simple_self_signed(hostnames.to_vec())
            .map_err(|e| ServerError::Certificate(e.to_string()))?;
        let cert_der = cert.serialize_der()
            .map_err(|e| ServerError::Certificate(e.to_string()))?;
        let cert_der = CertificateDer::from(cert_der);
        let key = PrivateKeyDer::Pkcs8(
            PrivatePkcs8KeyDer::from(cert.serialize_private_key_der()));
        let acceptor = TlsAcceptor::from_der(vec![cert_der.clone()], key)?;
        Ok((acceptor, cert_der))
    }

    fn from_der(certs: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>)
        -> Result<TlsAcceptor, ServerError>
    {
        let config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)?;
        Ok(TlsAcceptor::new(Arc::new(config)))
    }

    /// Wraps the socket in TLS if the client starts a handshake
    ///
    /// The handshake is completed before returning, so it's subject to the
    /// read timeout of the socket.
    pub fn accept(&self, sock: TcpStream) -> Result<Connection, ServerError> {
        if !sniff(&sock)? {
            return Ok(Connection::Plain(sock));
        }
        debug!("Negotiating TLS with {:?}", sock.peer_addr().ok());
        let mut conn = ServerConnection::new(self.config.clone())?;
        let mut sock = sock;
        while conn.is_handshaking() {
            let (rd, wr) = conn.complete_io(&mut sock)?;
            if rd == 0 && wr == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                    "connection closed during tls handshake").into());
            }
        }
        Ok(Connection::Tls(Box::new(StreamOwned::new(conn, sock))))
    }
}

fn open_pem(path: &Path) -> Result<BufReader<File>, ServerError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| ServerError::ReadPem(path.to_path_buf(), e))
}


/// An accepted connection, plain or wrapped in TLS
pub enum Connection {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ServerConnection, TcpStream>>),
}

impl Connection {
    pub fn is_secure(&self) -> bool {
        matches!(*self, Connection::Tls(_))
    }

    pub fn socket(&self) -> &TcpStream {
        match *self {
            Connection::Plain(ref sock) => sock,
            Connection::Tls(ref stream) => &stream.sock,
        }
    }

    /// Says goodbye to the client
    ///
    /// TLS connections get a `close_notify` alert first. Errors are
    /// ignored, the client may well be gone already.
    pub fn close(&mut self) {
        if let Connection::Tls(ref mut stream) = *self {
            stream.conn.send_close_notify();
            let _ = stream.conn.complete_io(&mut stream.sock);
        }
        let _ = self.socket().shutdown(Shutdown::Write);
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            Connection::Plain(ref mut sock) => sock.read(buf),
            Connection::Tls(ref mut stream) => stream.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match *self {
            Connection::Plain(ref mut sock) => sock.write(buf),
            Connection::Tls(ref mut stream) => stream.write(buf),
        }
    }
    fn flush(&mut self) -> io::Result<()> {
        match *self {
            Connection::Plain(ref mut sock) => sock.flush(),
            Connection::Tls(ref mut stream) => stream.flush(),
        }
    }
}
