use std::io;
use std::path::PathBuf;

use crate::server::RequestError;


quick_error!{
    /// Error starting or running a server
    ///
    /// Errors of a single connection are only logged, so apart from
    /// `Connection` these are all fatal for the server.
    #[derive(Debug)]
    pub enum ServerError {
        Io(err: io::Error) {
            from()
            source(err)
            display("i/o error: {}", err)
        }
        Tls(err: rustls::Error) {
            from()
            source(err)
            display("tls error: {}", err)
        }
        ReadPem(path: PathBuf, err: io::Error) {
            source(err)
            display("can't read {:?}: {}", path, err)
        }
        NoCertificates(path: PathBuf) {
            display("no certificates found in {:?}", path)
        }
        NoPrivateKey(path: PathBuf) {
            display("no private key found in {:?}", path)
        }
        Certificate(message: String) {
            display("can't generate certificate: {}", message)
        }
        ForkUnsupported {
            display("forking server is not supported on this platform")
        }
        Connection(err: RequestError) {
            from()
            source(err)
            display("{}", err)
        }
    }
}
