//! Pixel-format descriptor table.
//!
//! A [`PixFmtDesc`] is a data-only description of where each of the Y, U
//! and V components lives within a frame's up-to-three planes: which
//! plane, the byte offset of the first sample, the per-sample byte
//! stride, and the horizontal/vertical subsampling shift. Both the
//! decode driver and the pixel converter derive per-pixel plane offsets
//! from the same table via [`get_plane_offsets`], so the two agree on
//! layout without either hard-coding the other's format.

/// Supported source/display pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Planar YUV 4:2:0, three separate Y/U/V planes.
    Yuv420p,
    /// Interleaved YUYV 4:2:2, one packed plane.
    Yuyv422,
    /// Semi-planar YUV 4:2:0 (Y plane + interleaved UV plane).
    Nv12,
}

/// Data-only layout description for one [`PixelFormat`].
#[derive(Debug, Clone, Copy)]
pub struct PixFmtDesc {
    pub fmt: PixelFormat,
    /// Which of the frame's up-to-three planes backs each of Y, U, V.
    pub plane: [usize; 3],
    /// Byte offset of the first sample within that plane.
    pub start: [usize; 3],
    /// Byte stride between consecutive samples of that component.
    pub inc: [usize; 3],
    /// log2 horizontal subsampling for Y, U, V.
    pub hsub: [u32; 3],
    /// log2 vertical subsampling for Y, U, V.
    pub vsub: [u32; 3],
}

const YUV420P: PixFmtDesc = PixFmtDesc {
    fmt: PixelFormat::Yuv420p,
    plane: [0, 1, 2],
    start: [0, 0, 0],
    inc: [1, 1, 1],
    hsub: [0, 1, 1],
    vsub: [0, 1, 1],
};

const YUYV422: PixFmtDesc = PixFmtDesc {
    fmt: PixelFormat::Yuyv422,
    plane: [0, 0, 0],
    start: [0, 1, 3],
    inc: [2, 4, 4],
    hsub: [0, 1, 1],
    vsub: [0, 0, 0],
};

const NV12: PixFmtDesc = PixFmtDesc {
    fmt: PixelFormat::Nv12,
    plane: [0, 1, 1],
    start: [0, 0, 1],
    inc: [1, 2, 2],
    hsub: [0, 1, 1],
    vsub: [0, 1, 1],
};

/// Looks up the layout descriptor for a pixel format.
#[must_use]
pub fn get_pixfmt(fmt: PixelFormat) -> &'static PixFmtDesc {
    match fmt {
        PixelFormat::Yuv420p => &YUV420P,
        PixelFormat::Yuyv422 => &YUYV422,
        PixelFormat::Nv12 => &NV12,
    }
}

/// Computes the byte offset of pixel `(x, y)` within each of the Y, U, V
/// planes, given the per-(underlying-)plane byte strides in `stride`.
///
/// `stride` is indexed by the *underlying* plane number (0..=2), not by
/// component. For formats that pack multiple components into one plane
/// (NV12, YUYV422), several entries of `stride` will be equal, and are
/// looked up via `p.plane[c]`.
#[must_use]
pub fn get_plane_offsets(p: &PixFmtDesc, x: u32, y: u32, stride: &[usize; 3]) -> [usize; 3] {
    let mut offs = [0usize; 3];
    for c in 0..3 {
        let row = (y >> p.vsub[c]) as usize;
        let col = (x >> p.hsub[c]) as usize;
        offs[c] = row * stride[p.plane[c]] + p.start[c] + col * p.inc[c];
    }
    offs
}
