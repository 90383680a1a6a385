pub mod connection;
pub mod dispatch;
pub mod frame;
pub mod pdu;

pub use connection::handle_connection;
pub use dispatch::dispatch;
pub use frame::{build_response, read_request, MbapHeader, Request};
