//! Driver category contracts: `Codec`, `Display`, `MemMan`, `PixConv`,
//! `Timer`, plus the capability flags negotiated between them.
//!
//! Concrete hardware backends (a real framebuffer/Xv/V4L2 display, a
//! DMA-contiguous `MemMan`, SIMD `PixConv` kernels, an entropy-decoding
//! `Codec`) are out of scope here; only the trait contracts and the
//! small in-tree reference implementations needed to exercise the
//! engine live in `player-drivers`.

use crate::error::Result;
use crate::frame::{Frame, FrameFormat};
use crate::pool::Pool;
use bitflags::bitflags;
use std::time::SystemTime;

bitflags! {
    /// Capability flags advertised by display/memman/pixconv drivers.
    #[derive(Default)]
    pub struct Caps: u32 {
        /// Fullscreen, aspect-preserving scale was requested.
        const FULLSCREEN = 1 << 0;
        /// Double-buffering is enabled.
        const DOUBLE_BUF = 1 << 1;
        /// Driver operates on physical/DMA-contiguous addresses.
        const PHYS_MEM = 1 << 2;
        /// Driver accepts the source pixel format unconverted.
        const NOCONV = 1 << 3;
        /// Fullscreen was requested with aspect distortion allowed
        /// (`-F`), rather than aspect-preserving (`-f`). Only meaningful
        /// alongside `FULLSCREEN`.
        const DISTORT = 1 << 4;
    }
}

/// A stable name for one of the five driver categories, used in error
/// messages and registry lookups.
pub const CATEGORY_CODEC: &str = "codec";
pub const CATEGORY_DISPLAY: &str = "display";
pub const CATEGORY_MEMMAN: &str = "memman";
pub const CATEGORY_PIXCONV: &str = "pixconv";
pub const CATEGORY_TIMER: &str = "timer";

/// Consumes compressed packets, acquires frames from the pool, and posts
/// decoded pictures to the display FIFO exactly once per completed
/// picture. Stands in for the (out-of-scope) entropy decoder.
pub trait Codec: Send {
    /// Negotiates width/height/pixel format and returns the source
    /// frame format the pool should allocate.
    fn open(&mut self, params: Option<&str>) -> Result<FrameFormat>;

    /// Byte size of one packet as `decode` expects to receive it, once
    /// `open` has negotiated a format. The orchestrator chunks the input
    /// stream into packets of this size; a self-framing codec with
    /// variable-length units is out of scope here.
    fn packet_size(&self) -> usize;

    /// Submits one compressed unit. Implementations acquire frames from
    /// `pool` and post completed pictures through it; they never return
    /// frames to the caller.
    fn decode(&mut self, packet: &[u8], pool: &Pool) -> Result<()>;

    fn close(&mut self);
}

/// Five-phase display device lifecycle: open/enable/prepare/show/close.
pub trait Display: Send {
    /// Probes the device, returning its native resolution/preferred
    /// pixel format as a `FrameFormat` (only `width`/`height`/`pixfmt`
    /// are meaningful at this stage).
    fn open(&mut self, params: Option<&str>, source_format: &FrameFormat) -> Result<FrameFormat>;

    /// Capability flags this display advertises (e.g. `NOCONV`,
    /// `PHYS_MEM`).
    fn caps(&self) -> Caps;

    /// Commits mode, allocates device buffers, computes the output
    /// rectangle, and records the negotiated display format. Takes
    /// ownership of the already-opened `pixconv` (`None` when the
    /// display advertised `NOCONV` and frames pass through unconverted)
    /// so that `prepare` can invoke it internally, overlapping
    /// conversion with the previous frame's display window.
    fn enable(
        &mut self,
        source_format: &FrameFormat,
        flags: Caps,
        pixconv: Option<Box<dyn PixConv>>,
    ) -> Result<FrameFormat>;

    /// Runs in the display thread before `timer.wait`. Converts `frame`
    /// through the `pixconv` given to `enable` (if any) into an internal
    /// back buffer.
    fn prepare(&mut self, frame: &Frame);

    /// Commits the frame (page flip or synchronous present).
    fn show(&mut self, frame: &Frame);

    /// Restores prior device state and releases resources.
    fn close(&mut self);
}

/// Frame allocator. Potentially returns DMA-contiguous memory exposing
/// both a virtual and a physical view (out of scope here; the in-tree
/// reference implementation is heap-only).
pub trait MemMan: Send {
    /// Capability flags this allocator advertises.
    fn caps(&self) -> Caps;

    /// Allocates `count` frames (or as many as `budget_bytes` allows)
    /// sized for `format`, returning the frames actually allocated.
    fn alloc_frames(&mut self, format: &FrameFormat, budget_bytes: usize) -> Result<Vec<Frame>>;
}

/// Pixel-format converter: transforms decoded-layout pixels into
/// display-layout pixels, or performs no-op passthrough when the
/// display accepts the source layout natively.
pub trait PixConv: Send {
    /// Capability flags this converter advertises (notably
    /// `PHYS_MEM`, which requires the display and memman to agree).
    fn caps(&self) -> Caps;

    /// Attempts to open a converter for the given source/display
    /// formats; returns an error if this converter cannot bridge them.
    fn open(&mut self, source: &FrameFormat, display: &FrameFormat) -> Result<()>;

    /// Converts one frame's pixels from the source into `dst`.
    fn convert(&mut self, src: &Frame, dst: &mut Frame);

    fn close(&mut self);
}

/// Abstract monotonic wall-clock used to pace the display scheduler.
/// Concrete implementations are either the system clock or the netsync
/// slave's synchronised clock.
pub trait Timer: Send {
    fn open(&mut self, params: Option<&str>) -> Result<()>;

    /// Establishes the shared start-of-playback instant. For a netsync
    /// timer this blocks on the barrier (master: all slaves READY;
    /// slave: GO received).
    fn start(&mut self) -> Result<SystemTime>;

    /// Reads the current time on this timer's clock.
    fn read(&self) -> SystemTime;

    /// Blocks until wall-clock `deadline` is reached or the wait is
    /// cancelled (e.g. by SIGINT). Returns `true` if it returned
    /// because `deadline` was reached, `false` if cancelled early.
    fn wait(&self, deadline: SystemTime) -> bool;

    fn close(&mut self);
}
