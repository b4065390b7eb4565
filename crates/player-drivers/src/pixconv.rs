//! `yuv420-to-yuyv422`: a scalar reference pixel converter. Stands in
//! for the out-of-scope SIMD conversion kernels; correct but not fast.

use player_core::driver::{Caps, PixConv};
use player_core::error::{PlayerError, Result};
use player_core::frame::{Frame, FrameFormat};
use player_core::pixfmt::PixelFormat;

/// Reference name this driver registers under.
pub const NAME: &str = "yuv420-to-yuyv422";

#[derive(Default)]
pub struct Yuv420ToYuyv422 {
    source: Option<FrameFormat>,
    display: Option<FrameFormat>,
}

impl Yuv420ToYuyv422 {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PixConv for Yuv420ToYuyv422 {
    fn caps(&self) -> Caps {
        Caps::empty()
    }

    fn open(&mut self, source: &FrameFormat, display: &FrameFormat) -> Result<()> {
        if !matches!(source.pixfmt, PixelFormat::Yuv420p) {
            return Err(PlayerError::incompatible(format!(
                "{NAME} requires a YUV 4:2:0 planar source, got {:?}",
                source.pixfmt
            )));
        }
        if !matches!(display.pixfmt, PixelFormat::Yuyv422) {
            return Err(PlayerError::incompatible(format!(
                "{NAME} requires a YUYV 4:2:2 display, got {:?}",
                display.pixfmt
            )));
        }
        self.source = Some(*source);
        self.display = Some(*display);
        Ok(())
    }

    fn convert(&mut self, src: &Frame, dst: &mut Frame) {
        let (Some(source), Some(display)) = (self.source, self.display) else {
            return;
        };
        convert_420p_to_yuyv422(src, dst, &source, &display);
    }

    fn close(&mut self) {
        self.source = None;
        self.display = None;
    }
}

fn convert_420p_to_yuyv422(src: &Frame, dst: &mut Frame, source: &FrameFormat, display: &FrameFormat) {
    let (w, h) = (source.disp_w as usize, source.disp_h as usize);
    let (sx, sy) = (source.disp_x as usize, source.disp_y as usize);
    let (dx, dy) = (display.disp_x as usize, display.disp_y as usize);

    for row in 0..h {
        let y_row = (sy + row) * src.stride[0] + sx;
        let c_row = (sy / 2 + row / 2) * src.stride[1] + sx / 2;
        let dst_row = (dy + row) * dst.stride[0] + dx * 2;

        for pair in 0..w / 2 {
            let y0 = src.virt[0][y_row + pair * 2];
            let y1 = src.virt[0][y_row + pair * 2 + 1];
            let u = src.virt[1][c_row + pair];
            let v = src.virt[2][c_row + pair];

            let o = dst_row + pair * 4;
            dst.virt[0][o] = y0;
            dst.virt[0][o + 1] = u;
            dst.virt[0][o + 2] = y1;
            dst.virt[0][o + 3] = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use player_core::pixfmt::get_pixfmt;

    fn make_frame(format: &FrameFormat) -> Frame {
        let stride = if matches!(format.pixfmt, PixelFormat::Yuyv422) {
            [format.y_stride * 2, 0, 0]
        } else {
            [format.y_stride, format.uv_stride, format.uv_stride]
        };
        let plane_sizes = [
            stride[0] * format.height as usize,
            stride[1] * (format.height as usize / 2).max(1),
            stride[2] * (format.height as usize / 2).max(1),
        ];
        Frame::new(0, stride, plane_sizes)
    }

    #[test]
    fn test_open_rejects_non_420p_source() {
        let mut conv = Yuv420ToYuyv422::new();
        let source = FrameFormat::for_decoded_picture(16, 16, PixelFormat::Nv12);
        let display = FrameFormat::for_decoded_picture(16, 16, PixelFormat::Yuyv422);
        assert!(conv.open(&source, &display).is_err());
    }

    #[test]
    fn test_open_rejects_non_yuyv_display() {
        let mut conv = Yuv420ToYuyv422::new();
        let source = FrameFormat::for_decoded_picture(16, 16, PixelFormat::Yuv420p);
        let display = FrameFormat::for_decoded_picture(16, 16, PixelFormat::Nv12);
        assert!(conv.open(&source, &display).is_err());
    }

    #[test]
    fn test_convert_interleaves_luma_and_chroma() {
        let source = FrameFormat::for_decoded_picture(4, 2, PixelFormat::Yuv420p);
        let display = FrameFormat::for_decoded_picture(4, 2, PixelFormat::Yuyv422);

        let mut src = make_frame(&source);
        let mut dst = make_frame(&display);

        let desc = get_pixfmt(PixelFormat::Yuv420p);
        let (sx, sy) = (source.disp_x, source.disp_y);
        for x in 0..4u32 {
            let offs = player_core::pixfmt::get_plane_offsets(desc, sx + x, sy, &src.stride);
            src.virt[0][offs[0]] = 10 + x as u8;
        }
        let offs = player_core::pixfmt::get_plane_offsets(desc, sx, sy, &src.stride);
        src.virt[1][offs[1]] = 100;
        src.virt[2][offs[2]] = 200;
        let offs1 = player_core::pixfmt::get_plane_offsets(desc, sx + 2, sy, &src.stride);
        src.virt[1][offs1[1]] = 101;
        src.virt[2][offs1[2]] = 201;

        let mut conv = Yuv420ToYuyv422::new();
        conv.open(&source, &display).expect("compatible formats");
        conv.convert(&src, &mut dst);

        let (dx, dy) = (display.disp_x as usize, display.disp_y as usize);
        let row = dy * dst.stride[0] + dx * 2;
        assert_eq!(dst.virt[0][row], 10);
        assert_eq!(dst.virt[0][row + 1], 100);
        assert_eq!(dst.virt[0][row + 2], 11);
        assert_eq!(dst.virt[0][row + 3], 200);
        assert_eq!(dst.virt[0][row + 4], 12);
        assert_eq!(dst.virt[0][row + 5], 101);
    }
}
