// DataFusion local execution layer
//
// DataFusion serves as the local execution backend: statements that are
// neither shipped to the live connection nor handled by the metastore run
// through a SessionContext here.

pub mod converter; // DataFusionResultConverter
pub mod execution; // DataFusionExecutionBackend
pub mod session; // DataFusionSessionManager

pub use converter::DataFusionResultConverter;
pub use execution::DataFusionExecutionBackend;
pub use session::{DataFusionSessionManager, SessionConfig};
