//! Shared domain types for the fleet control plane: identifiers, the status
//! and command vocabularies, and the `Clock` abstraction used by every
//! run loop that needs to reason about wall-clock time in tests.

pub mod clock;
pub mod command;
pub mod ids;
pub mod run_loop;
pub mod status;

pub use clock::{Clock, SystemClock};
pub use command::{Command, CommandType};
pub use ids::{GameServerConfigId, GameServerId, GameServerInstanceId, WorkerId};
pub use run_loop::{run_loop, RunLoopHooks};
pub use status::{EntityType, StatusType};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
#[cfg(any(test, feature = "test-support"))]
pub use test_support::FakeClock;
