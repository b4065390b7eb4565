//! # omap-player
//!
//! Framebuffer video playback pipeline: driver registry, frame pool,
//! display scheduler, pixel conversion and network time-sync, split
//! across three crates re-exported here:
//!
//! - **[`core`]**: driver contracts, frame pool, display scheduler,
//!   pixel pipeline, and the orchestrator that wires them together.
//! - **[`drivers`]**: reference codec/display/memman/pixconv/timer
//!   implementations exercising those contracts.
//! - **[`netsync`]** *(optional)*: UDP master/slave clock
//!   synchronization for coordinated multi-display playback.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use omap_player::core::config::PlayerConfigBuilder;
//! use omap_player::core::orchestrator;
//! use omap_player::drivers;
//! use std::sync::atomic::AtomicBool;
//! use std::sync::Arc;
//!
//! let drivers = drivers::register_all();
//! let config = PlayerConfigBuilder::new()
//!     .input("clip.raw")
//!     .build()?;
//! let stop = Arc::new(AtomicBool::new(false));
//! orchestrator::run(&drivers, &config, stop)?;
//! # Ok::<(), omap_player::core::PlayerError>(())
//! ```
//!
//! # Related Crates
//!
//! - [`player-core`](https://crates.io/crates/player-core)
//! - [`player-drivers`](https://crates.io/crates/player-drivers)
//! - [`player-netsync`](https://crates.io/crates/player-netsync)

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use player_core as core;
pub use player_drivers as drivers;

/// UDP master/slave clock synchronization, used by `-T netsync:...`.
#[cfg(feature = "netsync")]
pub use player_netsync as netsync;
