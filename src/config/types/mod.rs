//! Configuration utility types.
//!
//! | Module   | Purpose                                          |
//! |----------|--------------------------------------------------|
//! | `error`  | Configuration error and diagnostic types         |
//! | `handle` | Shared widget configuration cell (lock-free)     |

mod error;
mod handle;

pub use error::{ConfigDiagnostic, ConfigDiagnostics, ConfigError};
pub use handle::ConfigHandle;
