//! Reference codec/display/memman/pixconv/timer drivers.
//!
//! Each of these stands in for real hardware or codec integration that
//! is out of scope: [`codec::RawYuvCodec`] treats packets as
//! already-decoded pictures, [`memman::HeapMemMan`] allocates ordinary
//! heap memory, [`pixconv::Yuv420ToYuyv422`] is a scalar-only converter,
//! [`display::MemFbDisplay`] writes into an owned back buffer instead of
//! a device, and [`timer::SystemTimer`] paces against the system clock.
//! [`register_all`] populates an `orchestrator::Drivers` with all five,
//! a plain registration table in place of linker-section driver
//! discovery.

pub mod codec;
pub mod display;
pub mod memman;
pub mod pixconv;
pub mod timer;

use player_core::orchestrator::Drivers;
use player_core::registry::Registry;

/// Builds a `Drivers` catalogue with every reference driver in this
/// crate registered under its `NAME` constant. `player-netsync`'s
/// `NetsyncTimer` is registered separately by the caller (the `netsync`
/// feature is optional; this crate has no dependency on it).
#[must_use]
pub fn register_all() -> Drivers {
    let mut codecs = Registry::new(player_core::driver::CATEGORY_CODEC);
    codecs.register(codec::NAME, || Box::new(codec::RawYuvCodec::new()));

    let mut displays = Registry::new(player_core::driver::CATEGORY_DISPLAY);
    displays.register(display::NAME, || Box::new(display::MemFbDisplay::new()));

    let mut memmans = Registry::new(player_core::driver::CATEGORY_MEMMAN);
    memmans.register(memman::NAME, || Box::new(memman::HeapMemMan::new()));

    let mut pixconvs = Registry::new(player_core::driver::CATEGORY_PIXCONV);
    pixconvs.register(pixconv::NAME, || Box::new(pixconv::Yuv420ToYuyv422::new()));

    let mut timers = Registry::new(player_core::driver::CATEGORY_TIMER);
    timers.register(timer::NAME, || Box::new(timer::SystemTimer::new()));

    Drivers {
        codecs,
        displays,
        memmans,
        pixconvs,
        timers,
    }
}
