//! Network infrastructure: reliable byte-stream primitives and the TCP
//! accept loop.

pub mod listener;
pub mod stream;

pub use listener::Server;
pub use stream::{read_exact_into, write_all_bytes};
