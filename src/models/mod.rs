pub mod catalog;
pub mod endpoint;
pub mod relation;
pub mod session;
pub mod statement;

pub use catalog::*;
pub use endpoint::*;
pub use relation::*;
pub use session::*;
pub use statement::*;
