pub mod backend;
pub mod catalog;
pub mod conf;
pub mod connection_cache;
pub mod context;
pub mod datafusion; // Local execution backend
pub mod endpoint;
pub mod identity;
pub mod remote; // Live connection drivers
pub mod router;
pub mod session_manager;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::*;
pub use catalog::*;
pub use conf::*;
pub use connection_cache::*;
pub use context::*;
pub use endpoint::*;
pub use identity::*;
pub use router::*;
pub use session_manager::*;
