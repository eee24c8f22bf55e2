//! The protocol side: parsing a request, running the handler and writing
//! the response of a single connection
pub mod request;
pub mod protocol;
pub mod context;
pub mod parser;
pub mod error;
pub mod response;
pub mod redirect;

pub use self::context::Context;
pub use self::error::{HandlerError, HttpError, RequestError};
pub use self::protocol::{Handler, Scope, process_connection};
pub use self::request::{Head, Request};
pub use self::response::{Response, write_response};


/// Note httparse requires we preallocate array of this size so be wise
pub const MAX_HEADERS_NUM: usize = 256;
/// This one is not preallocated, but too large buffer is of limited use
/// because of previous parameter.
pub const MAX_HEADERS_SIZE: usize = 16384;
