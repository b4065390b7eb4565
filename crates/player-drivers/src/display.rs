//! `memfb`: an in-memory framebuffer display. Stands in for the
//! out-of-scope hardware overlay/Xv/DRM backend; `show` writes into an
//! owned back buffer instead of a device, so the rest of the pipeline
//! (scaling, pixel conversion, pacing) can be exercised without real
//! display hardware.

use player_core::driver::{Caps, Display, PixConv};
use player_core::error::{PlayerError, Result};
use player_core::frame::Frame;
use player_core::frame::FrameFormat;
use player_core::pixfmt::PixelFormat;
use player_core::pipeline::{self, FullscreenMode, ScaleRect};
use tracing::debug;

/// Reference name this driver registers under.
pub const NAME: &str = "memfb";

/// Native resolution used when `params` doesn't override it.
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

pub struct MemFbDisplay {
    native: Option<FrameFormat>,
    fullscreen: FullscreenMode,
    scale: Option<ScaleRect>,
    pixconv: Option<Box<dyn PixConv>>,
    back_buffer: Vec<u8>,
    back_stride: usize,
    /// Bumped on every `show`, for tests and diagnostics.
    frames_shown: u64,
}

impl Default for MemFbDisplay {
    fn default() -> Self {
        Self {
            native: None,
            fullscreen: FullscreenMode::Off,
            scale: None,
            pixconv: None,
            back_buffer: Vec::new(),
            back_stride: 0,
            frames_shown: 0,
        }
    }
}

impl MemFbDisplay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    #[must_use]
    pub fn scale(&self) -> Option<ScaleRect> {
        self.scale
    }

    /// Read-only view of the back buffer, exposed for tests.
    #[must_use]
    pub fn back_buffer(&self) -> &[u8] {
        &self.back_buffer
    }
}

fn parse_dims(params: Option<&str>) -> Result<(u32, u32)> {
    let Some(params) = params else {
        return Ok((DEFAULT_WIDTH, DEFAULT_HEIGHT));
    };
    let (w, h) = params
        .split_once('x')
        .ok_or_else(|| PlayerError::usage(format!("invalid memfb dimensions '{params}', expected WxH")))?;
    let w: u32 = w
        .parse()
        .map_err(|_| PlayerError::usage(format!("invalid width '{w}'")))?;
    let h: u32 = h
        .parse()
        .map_err(|_| PlayerError::usage(format!("invalid height '{h}'")))?;
    Ok((w, h))
}

impl Display for MemFbDisplay {
    fn open(&mut self, params: Option<&str>, _source_format: &FrameFormat) -> Result<FrameFormat> {
        let (w, h) = parse_dims(params)?;
        let native = FrameFormat::for_decoded_picture(w, h, PixelFormat::Yuyv422);
        self.native = Some(native);
        Ok(native)
    }

    fn caps(&self) -> Caps {
        Caps::DOUBLE_BUF
    }

    fn enable(
        &mut self,
        source_format: &FrameFormat,
        flags: Caps,
        pixconv: Option<Box<dyn PixConv>>,
    ) -> Result<FrameFormat> {
        let native = self
            .native
            .ok_or_else(|| PlayerError::usage("enable called before open()"))?;

        self.fullscreen = match (
            flags.contains(Caps::FULLSCREEN),
            flags.contains(Caps::DISTORT),
        ) {
            (true, true) => FullscreenMode::Distort,
            (true, false) => FullscreenMode::AspectPreserve,
            (false, _) => FullscreenMode::Off,
        };
        let scale = pipeline::set_scale(
            source_format.disp_w,
            source_format.disp_h,
            native.disp_w,
            native.disp_h,
            self.fullscreen,
        );
        self.scale = Some(scale);
        self.back_stride = native.y_stride * 2;
        self.back_buffer = vec![0u8; self.back_stride * native.height as usize];
        self.pixconv = pixconv;

        debug!(?scale, fullscreen = ?self.fullscreen, "memfb enabled");
        Ok(native)
    }

    fn prepare(&mut self, frame: &Frame) {
        let Some(scale) = self.scale else { return };

        if let Some(pixconv) = self.pixconv.as_mut() {
            let mut converted = Frame::new(
                frame.index,
                [self.back_stride, 0, 0],
                [self.back_buffer.len(), 0, 0],
            );
            pixconv.convert(frame, &mut converted);
            blit(&converted, &mut self.back_buffer, self.back_stride, &scale);
        } else {
            blit(frame, &mut self.back_buffer, self.back_stride, &scale);
        }
    }

    fn show(&mut self, _frame: &Frame) {
        self.frames_shown += 1;
    }

    fn close(&mut self) {
        self.native = None;
        self.scale = None;
        self.pixconv = None;
        self.back_buffer.clear();
    }
}

/// Copies `src`'s YUYV422-packed plane 0 into `dst` at the scaled/centred
/// rectangle described by `scale`, nearest-neighbour sampling when
/// `scale` isn't a 1:1 fit.
fn blit(src: &Frame, dst: &mut [u8], dst_stride: usize, scale: &ScaleRect) {
    if scale.w == 0 || scale.h == 0 {
        return;
    }
    let src_w = src.stride[0] / 2;
    for row in 0..scale.h {
        let src_row = if scale.h == src_w as u32 {
            row
        } else {
            row * src_w as u32 / scale.h.max(1)
        };
        let dst_off = (scale.y + row) as usize * dst_stride + scale.x as usize * 2;
        let src_off = src_row as usize * src.stride[0];
        let len = (scale.w as usize * 2).min(src.stride[0]);
        if dst_off + len <= dst.len() && src_off + len <= src.virt[0].len() {
            dst[dst_off..dst_off + len].copy_from_slice(&src.virt[0][src_off..src_off + len]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use player_core::driver::Caps;

    fn source_format() -> FrameFormat {
        FrameFormat::for_decoded_picture(64, 48, PixelFormat::Yuyv422)
    }

    #[test]
    fn test_open_defaults_to_640x480() {
        let mut display = MemFbDisplay::new();
        let native = display.open(None, &source_format()).expect("default dims");
        assert_eq!(native.disp_w, DEFAULT_WIDTH);
        assert_eq!(native.disp_h, DEFAULT_HEIGHT);
    }

    #[test]
    fn test_open_parses_explicit_dims() {
        let mut display = MemFbDisplay::new();
        let native = display.open(Some("320x240"), &source_format()).expect("parsed");
        assert_eq!(native.disp_w, 320);
        assert_eq!(native.disp_h, 240);
    }

    #[test]
    fn test_enable_centers_when_not_fullscreen() {
        let mut display = MemFbDisplay::new();
        let source = source_format();
        display.open(Some("640x480"), &source).expect("open");
        let enabled = display.enable(&source, Caps::empty(), None).expect("enable");
        assert_eq!(enabled.disp_w, 640);
        let scale = display.scale().expect("scale recorded");
        // source smaller than display and not fullscreen: unscaled, centred
        assert_eq!(scale.w, 64);
        assert_eq!(scale.h, 48);
    }

    #[test]
    fn test_enable_fits_when_fullscreen() {
        let mut display = MemFbDisplay::new();
        let source = source_format();
        display.open(Some("640x480"), &source).expect("open");
        display
            .enable(&source, Caps::FULLSCREEN, None)
            .expect("enable");
        let scale = display.scale().expect("scale recorded");
        assert!(scale.w <= 640 && scale.h <= 480);
        assert!(scale.w == 640 || scale.h == 480);
    }

    #[test]
    fn test_show_counts_frames() {
        let mut display = MemFbDisplay::new();
        let source = source_format();
        display.open(Some("64x48"), &source).expect("open");
        display.enable(&source, Caps::empty(), None).expect("enable");
        let frame = Frame::new(0, [128, 0, 0], [128 * 48, 0, 0]);
        display.prepare(&frame);
        display.show(&frame);
        assert_eq!(display.frames_shown(), 1);
    }
}
