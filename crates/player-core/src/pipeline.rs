//! Pixel-pipeline negotiation: matching a pixel converter to the
//! source/display formats, checking `PHYS_MEM` compatibility across
//! display/memman/pixconv, and the aspect-fit scale policy.

use crate::driver::{Caps, PixConv};
use crate::error::{PlayerError, Result};
use crate::frame::FrameFormat;
use crate::registry::Registry;

/// Tries every registered converter in order and keeps the first whose
/// `open` succeeds against `(source, display)`. `None` means the
/// display advertised [`Caps::NOCONV`] and frames pass through
/// unconverted.
pub fn resolve_pixconv(
    registry: &Registry<dyn PixConv>,
    spec: Option<&str>,
    display_caps: Caps,
    source: &FrameFormat,
    display: &FrameFormat,
) -> Result<Option<Box<dyn PixConv>>> {
    if display_caps.contains(Caps::NOCONV) {
        return Ok(None);
    }

    let (mut conv, _params) = registry.find(spec)?;
    conv.open(source, display)?;
    Ok(Some(conv))
}

/// Verifies that a `PHYS_MEM`-advertising pixel converter is only ever
/// paired with a memory manager and display that also advertise it.
/// A converter reading/writing physical addresses through a heap
/// allocation is a silent corruption bug, not a soft failure.
pub fn check_phys_mem_compat(
    display_caps: Caps,
    memman_caps: Caps,
    pixconv_caps: Caps,
) -> Result<()> {
    let wants_phys = pixconv_caps.contains(Caps::PHYS_MEM);
    if !wants_phys {
        return Ok(());
    }

    if !display_caps.contains(Caps::PHYS_MEM) || !memman_caps.contains(Caps::PHYS_MEM) {
        return Err(PlayerError::IncompatibleDrivers(
            "pixconv requires PHYS_MEM but display/memman do not both advertise it".to_string(),
        ));
    }

    Ok(())
}

/// Computes the aspect-preserving fit of a `w x h` source within a
/// `dw x dh` destination, returning the scaled `(width, height)`.
///
/// Chooses the height-constrained fit when `w * dh > dw * h` (the
/// source is comparatively wider than the destination), otherwise the
/// width-constrained fit, cross-multiplied to avoid floating point.
#[must_use]
pub fn aspect_fit(w: u32, h: u32, dw: u32, dh: u32) -> (u32, u32) {
    if w == 0 || h == 0 {
        return (dw, dh);
    }

    if (w as u64) * (dh as u64) > (dw as u64) * (h as u64) {
        // Source is relatively wider than the destination: width fills
        // dw, height follows.
        let fit_h = ((h as u64) * (dw as u64) / (w as u64)) as u32;
        (dw, fit_h)
    } else {
        let fit_w = ((w as u64) * (dh as u64) / (h as u64)) as u32;
        (fit_w, dh)
    }
}

/// Output rectangle for placing a `w x h` source on a `dw x dh`
/// destination, centred on whichever axis isn't filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Fullscreen policy, selected by `-f`/`-F`. `Off` centres the source
/// unscaled unless it overflows the destination, in which case it still
/// falls back to an aspect-preserving fit (the source must always be
/// wholly visible).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FullscreenMode {
    #[default]
    Off,
    /// `-f`: scale to fill, preserving aspect ratio, centred on the
    /// unfilled axis.
    AspectPreserve,
    /// `-F`: stretch to fill both axes exactly, distorting aspect ratio.
    Distort,
}

/// Decides the output rectangle per the scale policy: `-F` always
/// stretches to the full destination; `-f` or an overflowing source
/// fits and centres, preserving aspect ratio; otherwise the source is
/// centred unscaled.
#[must_use]
pub fn set_scale(w: u32, h: u32, dw: u32, dh: u32, mode: FullscreenMode) -> ScaleRect {
    if mode == FullscreenMode::Distort {
        return ScaleRect { x: 0, y: 0, w: dw, h: dh };
    }

    let overflows = w > dw || h > dh;
    if mode == FullscreenMode::AspectPreserve || overflows {
        let (fw, fh) = aspect_fit(w, h, dw, dh);
        ScaleRect {
            x: (dw.saturating_sub(fw)) / 2,
            y: (dh.saturating_sub(fh)) / 2,
            w: fw,
            h: fh,
        }
    } else {
        ScaleRect {
            x: (dw.saturating_sub(w)) / 2,
            y: (dh.saturating_sub(h)) / 2,
            w,
            h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_fit_width_constrained() {
        // 320x200 source into a 640x640 destination: source is
        // relatively wider, so width fills and height follows.
        let (w, h) = aspect_fit(320, 200, 640, 640);
        assert_eq!((w, h), (640, 400));
    }

    #[test]
    fn test_aspect_fit_height_constrained() {
        // 200x320 source (tall) into a 640x640 destination.
        let (w, h) = aspect_fit(200, 320, 640, 640);
        assert_eq!((w, h), (400, 640));
    }

    #[test]
    fn test_set_scale_centers_when_not_fullscreen_and_fits() {
        let rect = set_scale(100, 80, 640, 480, FullscreenMode::Off);
        assert_eq!(rect.w, 100);
        assert_eq!(rect.h, 80);
        assert_eq!(rect.x, (640 - 100) / 2);
        assert_eq!(rect.y, (480 - 80) / 2);
    }

    #[test]
    fn test_set_scale_fits_when_overflowing_even_without_fullscreen() {
        let rect = set_scale(1920, 1080, 640, 480, FullscreenMode::Off);
        assert!(rect.w <= 640 && rect.h <= 480);
    }

    #[test]
    fn test_set_scale_fullscreen_always_fits() {
        let rect = set_scale(100, 80, 640, 480, FullscreenMode::AspectPreserve);
        assert!(rect.w <= 640 && rect.h <= 480);
        // Aspect preserved: 100/80 == w/h within integer rounding.
        assert!(rect.w > rect.h);
    }

    #[test]
    fn test_set_scale_distort_always_fills_exactly() {
        let rect = set_scale(100, 80, 640, 480, FullscreenMode::Distort);
        assert_eq!(rect, ScaleRect { x: 0, y: 0, w: 640, h: 480 });
    }

    #[test]
    fn test_check_phys_mem_compat_ok_when_not_requested() {
        check_phys_mem_compat(Caps::empty(), Caps::empty(), Caps::empty()).expect("no conflict");
    }

    #[test]
    fn test_check_phys_mem_compat_errors_on_mismatch() {
        let err = check_phys_mem_compat(Caps::empty(), Caps::empty(), Caps::PHYS_MEM)
            .expect_err("display/memman don't advertise PHYS_MEM");
        assert!(matches!(err, PlayerError::IncompatibleDrivers(_)));
    }

    #[test]
    fn test_check_phys_mem_compat_ok_when_all_advertise() {
        check_phys_mem_compat(Caps::PHYS_MEM, Caps::PHYS_MEM, Caps::PHYS_MEM)
            .expect("all three agree");
    }
}
