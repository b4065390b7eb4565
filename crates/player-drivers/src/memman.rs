//! `heap`: a reference memory manager that allocates ordinary `Vec<u8>`
//! planes. Advertises no `PHYS_MEM`, so it can never be paired with a
//! `PixConv`/`Display` that requires DMA-contiguous addresses; stands
//! in for the out-of-scope physical/DMA allocator.

use player_core::driver::{Caps, MemMan};
use player_core::error::{PlayerError, Result};
use player_core::frame::{Frame, FrameFormat};
use player_core::pixfmt::PixelFormat;

/// Reference name this driver registers under.
pub const NAME: &str = "heap";

/// Fewest frames a pool can usefully operate with: one being decoded
/// into, one in flight to the display, one held as a reference.
const MIN_POOL_FRAMES: usize = 3;

/// Upper bound on how many frames a single budget will produce, so a
/// generous budget on a small frame size doesn't allocate an
/// unreasonably large pool.
const MAX_POOL_FRAMES: usize = 32;

#[derive(Default)]
pub struct HeapMemMan;

impl HeapMemMan {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Computes per-plane byte strides and sizes for `format`. Note that
/// `FrameFormat::y_stride`/`uv_stride` describe *pixel-width-shaped*
/// strides (suited to single-byte-per-sample planar formats); packed
/// formats with a wider per-pixel footprint (YUYV 4:2:2) scale the
/// stride here rather than in `FrameFormat` itself, which stays
/// pixel-dimension-only.
fn frame_layout(format: &FrameFormat) -> ([usize; 3], [usize; 3]) {
    let h = format.height as usize;
    match format.pixfmt {
        PixelFormat::Yuv420p => {
            let stride = [format.y_stride, format.uv_stride, format.uv_stride];
            let plane_sizes = [stride[0] * h, stride[1] * (h / 2), stride[2] * (h / 2)];
            (stride, plane_sizes)
        }
        PixelFormat::Nv12 => {
            let stride = [format.y_stride, format.y_stride, 0];
            let plane_sizes = [stride[0] * h, stride[1] * (h / 2), 0];
            (stride, plane_sizes)
        }
        PixelFormat::Yuyv422 => {
            let stride0 = format.y_stride * 2;
            ([stride0, 0, 0], [stride0 * h, 0, 0])
        }
    }
}

impl MemMan for HeapMemMan {
    fn caps(&self) -> Caps {
        Caps::empty()
    }

    fn alloc_frames(&mut self, format: &FrameFormat, budget_bytes: usize) -> Result<Vec<Frame>> {
        let (stride, plane_sizes) = frame_layout(format);
        let per_frame_bytes: usize = plane_sizes.iter().sum();
        if per_frame_bytes == 0 {
            return Err(PlayerError::resource_exhausted(
                "frame format describes a zero-byte frame",
            ));
        }

        let count = (budget_bytes / per_frame_bytes).clamp(0, MAX_POOL_FRAMES);
        if count < MIN_POOL_FRAMES {
            return Err(PlayerError::resource_exhausted(format!(
                "budget of {budget_bytes} bytes fits only {count} frames at {per_frame_bytes} bytes each, need at least {MIN_POOL_FRAMES}"
            )));
        }

        Ok((0..count)
            .map(|i| Frame::new(i, stride, plane_sizes))
            .collect())
    }
}
