pub mod connection;
pub mod packet;

pub use connection::handle_connection;
pub use packet::{IngestHeader, RAW_HEADER_LEN, RAW_MAGIC, RAW_VERSION, STATUS_OK, STATUS_REJECTED};
