//! UDP master/slave clock synchronization, so a fleet of players can
//! start and pace playback against a shared clock instead of each
//! node's own wall clock.
//!
//! [`clock::NetsyncTimer`] is the only thing most callers need: it
//! implements `player_core::driver::Timer` and can be registered under
//! the name `"netsync"` directly. `protocol`, `master` and `slave` are
//! exposed for testing and for callers that want the barrier without
//! going through the `Timer` trait.

pub mod clock;
pub mod error;
pub mod master;
pub mod protocol;
pub mod slave;

pub use clock::NetsyncTimer;
pub use error::{NetsyncError, Result};
