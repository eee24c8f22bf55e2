use std::net::SocketAddr;
use std::time::Duration;

use crate::menu::DEFAULT_WIDTH;


/// Server settings
///
/// All fields are public, start from `Config::default()` and override what
/// you need.
#[derive(Debug, Clone)]
pub struct Config {
    /// Display width of menus and wrapped text
    pub width: usize,
    /// Show the debug trace of internal errors to gopher clients
    pub show_stack_trace: bool,
    /// `host[:port]` used in internal links instead of the address the
    /// connection was accepted on. Set it when running behind a NAT or
    /// a proxy.
    pub server_name: Option<String>,
    /// Key for signing sessions, sessions are disabled without it
    pub secret_key: Option<Vec<u8>>,
    /// Timeout for every read from the client, including the TLS
    /// handshake
    pub read_timeout: Duration,
    /// Longest accepted request line, anything after it is cut off
    pub max_request_line: usize,
    /// Longest accepted HTTP request body
    pub max_body_size: usize,
    /// Maximum number of concurrent children of the forking server
    pub max_children: usize,
    /// How long the threading server waits for its workers on shutdown
    pub join_timeout: Duration,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            width: DEFAULT_WIDTH,
            show_stack_trace: false,
            server_name: None,
            secret_key: None,
            read_timeout: Duration::from_secs(10),
            max_request_line: 8192,
            max_body_size: 1 << 20,
            max_children: 40,
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Host and port for internal links of a connection accepted on `local`
    pub fn server_address(&self, local: SocketAddr) -> (String, u16) {
        match self.server_name {
            Some(ref name) => split_host_port(name, local.port()),
            None => (local.ip().to_string(), local.port()),
        }
    }
}

/// Splits `host[:port]`, brackets around IPv6 addresses are removed
fn split_host_port(name: &str, default_port: u16) -> (String, u16) {
    if name.starts_with('[') {
        if let Some(end) = name.find(']') {
            let host = name[1..end].to_string();
            let port = name[end+1..].strip_prefix(':')
                .and_then(|p| p.parse().ok())
                .unwrap_or(default_port);
            return (host, port);
        }
    }
    match name.rfind(':') {
        Some(idx) if name[..idx].find(':').is_none() => {
            match name[idx+1..].parse() {
                Ok(port) => (name[..idx].to_string(), port),
                Err(_) => (name.to_string(), default_port),
            }
        }
        _ => (name.to_string(), default_port),
    }
}

#[cfg(test)]
mod test {
    use std::net::SocketAddr;
    use super::Config;

    fn local() -> SocketAddr {
        "127.0.0.1:7000".parse().unwrap()
    }

    #[test]
    fn test_observed() {
        let cfg = Config::default();
        assert_eq!(cfg.server_address(local()), ("127.0.0.1".to_string(), 7000));
        assert_eq!(cfg.width, 70);
    }

    #[test]
    fn test_server_name() {
        let mut cfg = Config::default();
        cfg.server_name = Some("gopher.server.com:7070".to_string());
        assert_eq!(cfg.server_address(local()),
                   ("gopher.server.com".to_string(), 7070));
        cfg.server_name = Some("gopher.server.com".to_string());
        assert_eq!(cfg.server_address(local()),
                   ("gopher.server.com".to_string(), 7000));
        cfg.server_name = Some("[::1]:70".to_string());
        assert_eq!(cfg.server_address(local()), ("::1".to_string(), 70));
    }
}
