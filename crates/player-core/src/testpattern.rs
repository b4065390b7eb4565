//! Synthetic frame content for the `-t` speed-test path, which bypasses
//! the decoder entirely: a diagonal luma gradient with neutral chroma,
//! cheap enough to fill once per pooled frame before the throughput
//! loop starts.

use crate::frame::{Frame, FrameFormat};
use crate::pixfmt::{get_pixfmt, get_plane_offsets};

const NEUTRAL_CHROMA: u8 = 128;

/// Fills `frame`'s visible rectangle with a diagonal luma ramp and flat
/// chroma, matching `format`'s pixel layout.
pub fn fill(frame: &mut Frame, format: &FrameFormat) {
    let desc = get_pixfmt(format.pixfmt);
    let stride = frame.stride;

    for y in format.disp_y..format.disp_y + format.disp_h {
        for x in format.disp_x..format.disp_x + format.disp_w {
            let offs = get_plane_offsets(desc, x, y, &stride);
            let luma = ((x.wrapping_add(y)) & 0xff) as u8;

            frame.virt[desc.plane[0]][offs[0]] = luma;
            frame.virt[desc.plane[1]][offs[1]] = NEUTRAL_CHROMA;
            frame.virt[desc.plane[2]][offs[2]] = NEUTRAL_CHROMA;
        }
    }
}
