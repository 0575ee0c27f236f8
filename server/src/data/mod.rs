//! Data storage layer
//!
//! - `sqlite` - embedded database holding calls, costs and spans
//! - `traits` - `CallRepository`, the interface the rest of the server uses
//! - `types` - records written and read through the repository
//! - `error` - error type shared by all repository operations

pub mod error;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::DataError;
pub use sqlite::SqliteService;
pub use traits::CallRepository;
pub use types::{CallLogRecord, CallLogRow, TraceSummaryRecord, TraceSummaryRow};
