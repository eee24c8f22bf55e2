//! Gopher protocol on top of a blocking HTTP request/response stack
//!
//! A single listening port serves gopher, gopher over TLS and plain HTTP.
//! Applications implement `server::Handler`, build menus with
//! `menu::MenuBuilder` and keep state across requests in a `Session` that
//! travels in the selectors of the menu links.
#[macro_use] extern crate log;
#[macro_use] extern crate quick_error;
#[cfg(test)] #[macro_use] extern crate matches;

pub mod config;
pub mod directory;
pub mod menu;
pub mod serve;
pub mod server;
pub mod session;
pub mod tls;
mod headers;
mod version;

pub use config::Config;
pub use directory::Directory;
pub use menu::{ItemType, MenuBuilder, Renderer};
pub use serve::{GopherServer, ServerError, ShutdownHandle, Strategy};
pub use server::{Handler, HandlerError, Request, Response, Scope};
pub use session::{Session, SessionCodec};
pub use tls::TlsAcceptor;
pub use version::Version;
