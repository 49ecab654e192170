//! Process supervision primitives: the `ExternalProcess` capability
//! trait (real OS process / fake) and the `ProcessBuilder` state machine
//! built on top of it.

pub mod error;
pub mod external_process;
pub mod process_builder;

pub use error::ProcessError;
pub use external_process::{ExternalProcess, ProcessSpec, RealExternalProcess, RunningProcess};
pub use process_builder::{ProcessBuilder, ProcessBuilderStatus};

#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeExternalProcess;
