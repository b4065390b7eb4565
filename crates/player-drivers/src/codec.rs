//! `raw-yuv`: a reference codec that treats every packet as an
//! already-decoded picture in one of the three supported pixel
//! formats, tightly packed with no padding. Stands in for the
//! out-of-scope entropy decoder so the rest of the pipeline has
//! something to exercise.

use player_core::driver::Codec;
use player_core::error::{PlayerError, Result};
use player_core::frame::{Frame, FrameFormat};
use player_core::pixfmt::PixelFormat;
use player_core::pool::Pool;
use tracing::trace;

/// Reference name this driver registers under.
pub const NAME: &str = "raw-yuv";

#[derive(Default)]
pub struct RawYuvCodec {
    format: Option<FrameFormat>,
    next_pic_num: i64,
}

impl RawYuvCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn parse_dims(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| PlayerError::usage(format!("invalid dimensions '{s}', expected WxH")))?;
    let w: u32 = w
        .parse()
        .map_err(|_| PlayerError::usage(format!("invalid width '{w}'")))?;
    let h: u32 = h
        .parse()
        .map_err(|_| PlayerError::usage(format!("invalid height '{h}'")))?;
    Ok((w, h))
}

fn parse_pixfmt(s: Option<&str>) -> Result<PixelFormat> {
    match s {
        None | Some("yuv420p") => Ok(PixelFormat::Yuv420p),
        Some("yuyv422") => Ok(PixelFormat::Yuyv422),
        Some("nv12") => Ok(PixelFormat::Nv12),
        Some(other) => Err(PlayerError::usage(format!("unknown raw-yuv pixel format '{other}'"))),
    }
}

/// Size of one tightly packed frame at `w x h` in `fmt`, as it appears
/// in the input stream (not the pool's padded/aligned layout).
#[must_use]
pub fn raw_packed_size(w: u32, h: u32, fmt: PixelFormat) -> usize {
    let (w, h) = (w as usize, h as usize);
    match fmt {
        PixelFormat::Yuv420p | PixelFormat::Nv12 => w * h + 2 * ((w / 2) * (h / 2)),
        PixelFormat::Yuyv422 => w * h * 2,
    }
}

fn copy_420p(src: &[u8], frame: &mut Frame, format: &FrameFormat) {
    let (w, h) = (format.disp_w as usize, format.disp_h as usize);
    let (y_src, rest) = src.split_at(w * h);
    let (cw, ch) = (w / 2, h / 2);
    let (u_src, v_src) = rest.split_at(cw * ch);

    let (dx, dy) = (format.disp_x as usize, format.disp_y as usize);
    for row in 0..h {
        let dst = (dy + row) * frame.stride[0] + dx;
        frame.virt[0][dst..dst + w].copy_from_slice(&y_src[row * w..row * w + w]);
    }
    for row in 0..ch {
        let dst = (dy / 2 + row) * frame.stride[1] + dx / 2;
        frame.virt[1][dst..dst + cw].copy_from_slice(&u_src[row * cw..row * cw + cw]);
        frame.virt[2][dst..dst + cw].copy_from_slice(&v_src[row * cw..row * cw + cw]);
    }
}

fn copy_yuyv422(src: &[u8], frame: &mut Frame, format: &FrameFormat) {
    let (w, h) = (format.disp_w as usize, format.disp_h as usize);
    let row_bytes = w * 2;
    let (dx, dy) = (format.disp_x as usize, format.disp_y as usize);
    for row in 0..h {
        let dst = (dy + row) * frame.stride[0] + dx * 2;
        let src_off = row * row_bytes;
        frame.virt[0][dst..dst + row_bytes].copy_from_slice(&src[src_off..src_off + row_bytes]);
    }
}

fn copy_nv12(src: &[u8], frame: &mut Frame, format: &FrameFormat) {
    let (w, h) = (format.disp_w as usize, format.disp_h as usize);
    let (y_src, uv_src) = src.split_at(w * h);
    let (dx, dy) = (format.disp_x as usize, format.disp_y as usize);
    for row in 0..h {
        let dst = (dy + row) * frame.stride[0] + dx;
        frame.virt[0][dst..dst + w].copy_from_slice(&y_src[row * w..row * w + w]);
    }
    let ch = h / 2;
    for row in 0..ch {
        let dst = (dy / 2 + row) * frame.stride[1] + dx;
        frame.virt[1][dst..dst + w].copy_from_slice(&uv_src[row * w..row * w + w]);
    }
}

fn copy_into_padded(src: &[u8], frame: &mut Frame, format: &FrameFormat) {
    match format.pixfmt {
        PixelFormat::Yuv420p => copy_420p(src, frame, format),
        PixelFormat::Yuyv422 => copy_yuyv422(src, frame, format),
        PixelFormat::Nv12 => copy_nv12(src, frame, format),
    }
}

impl Codec for RawYuvCodec {
    /// `params` is `WxH[:fmt]`, e.g. `"720x480"` or `"720x480:yuyv422"`.
    fn open(&mut self, params: Option<&str>) -> Result<FrameFormat> {
        let params = params
            .ok_or_else(|| PlayerError::usage("raw-yuv codec requires params: WxH[:fmt]"))?;
        let (dims, fmt_str) = match params.split_once(':') {
            Some((d, f)) => (d, Some(f)),
            None => (params, None),
        };
        let (w, h) = parse_dims(dims)?;
        let fmt = parse_pixfmt(fmt_str)?;

        let format = FrameFormat::for_decoded_picture(w, h, fmt);
        self.format = Some(format);
        self.next_pic_num = 0;
        Ok(format)
    }

    fn packet_size(&self) -> usize {
        match self.format {
            Some(f) => raw_packed_size(f.disp_w, f.disp_h, f.pixfmt),
            None => 0,
        }
    }

    fn decode(&mut self, packet: &[u8], pool: &Pool) -> Result<()> {
        let format = self
            .format
            .ok_or_else(|| PlayerError::usage("decode called before open()"))?;

        let expected = raw_packed_size(format.disp_w, format.disp_h, format.pixfmt);
        if packet.len() != expected {
            return Err(PlayerError::DecodeError(format!(
                "expected a {expected} byte packet, got {}",
                packet.len()
            )));
        }

        let idx = pool.get_frame();
        {
            let mut frame = pool.frame(idx);
            frame.pic_num = self.next_pic_num;
            copy_into_padded(packet, &mut frame, &format);
        }
        trace!(pic_num = self.next_pic_num, idx, "decoded picture");
        self.next_pic_num += 1;
        pool.post_frame(idx);
        pool.put_frame(idx);
        Ok(())
    }

    fn close(&mut self) {
        self.format = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use player_core::frame::Frame;

    fn make_pool(size: usize, format: &FrameFormat) -> Pool {
        let stride = [format.y_stride, format.uv_stride, format.uv_stride];
        let plane_sizes = [
            stride[0] * format.height as usize,
            stride[1] * (format.height as usize / 2),
            stride[2] * (format.height as usize / 2),
        ];
        let frames = (0..size)
            .map(|i| Frame::new(i, stride, plane_sizes))
            .collect();
        Pool::new(frames)
    }

    #[test]
    fn test_open_parses_dims_and_default_format() {
        let mut codec = RawYuvCodec::new();
        let format = codec.open(Some("16x16")).expect("valid params");
        assert_eq!(format.disp_w, 16);
        assert_eq!(format.disp_h, 16);
        assert!(matches!(format.pixfmt, PixelFormat::Yuv420p));
    }

    #[test]
    fn test_open_rejects_missing_params() {
        let mut codec = RawYuvCodec::new();
        assert!(codec.open(None).is_err());
    }

    #[test]
    fn test_packet_size_matches_420p_layout() {
        let mut codec = RawYuvCodec::new();
        codec.open(Some("16x16")).expect("valid");
        assert_eq!(codec.packet_size(), 16 * 16 + 2 * (8 * 8));
    }

    #[test]
    fn test_decode_rejects_wrong_size_packet() {
        let mut codec = RawYuvCodec::new();
        let format = codec.open(Some("16x16")).expect("valid");
        let pool = make_pool(2, &format);
        let short_packet = vec![0u8; 4];
        assert!(codec.decode(&short_packet, &pool).is_err());
    }

    #[test]
    fn test_decode_posts_a_frame_with_incrementing_pic_num() {
        let mut codec = RawYuvCodec::new();
        let format = codec.open(Some("16x16")).expect("valid");
        let pool = make_pool(4, &format);
        let packet_size = codec.packet_size();

        codec
            .decode(&vec![42u8; packet_size], &pool)
            .expect("decode ok");
        let idx = pool.wait_and_pop_display().expect("one frame queued");
        assert_eq!(pool.frame(idx).pic_num, 0);

        codec
            .decode(&vec![42u8; packet_size], &pool)
            .expect("decode ok");
        let idx2 = pool.wait_and_pop_display().expect("second frame queued");
        assert_eq!(pool.frame(idx2).pic_num, 1);
    }

    #[test]
    fn test_decode_releases_its_own_checkout_so_pool_never_starves() {
        // RawYuvCodec holds no inter-frame reference, so each decode must
        // release its own get_frame checkout right after posting, leaving
        // only the display queue's reference behind. Decoding more than
        // pool_size times must not block.
        let mut codec = RawYuvCodec::new();
        let format = codec.open(Some("16x16")).expect("valid");
        let pool = make_pool(2, &format);
        let packet_size = codec.packet_size();

        for _ in 0..5 {
            codec
                .decode(&vec![42u8; packet_size], &pool)
                .expect("decode ok");
            let idx = pool.wait_and_pop_display().expect("frame queued");
            assert_eq!(pool.frame(idx).refs, 1, "only the display queue holds a reference");
            pool.put_frame(idx);
        }
    }
}
