pub mod backend;
pub mod host;
pub mod memory;
pub mod ticket;

pub use backend::{BackendError, PageBackend, PageId};
pub use host::{HostCommand, HostEvent, PageHost};
pub use memory::MemoryBackend;
pub use ticket::{LoadTicket, LoadTracker};
