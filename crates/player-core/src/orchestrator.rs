//! Wires the five driver categories together: startup negotiation in
//! dependency order, the display thread, the decode loop, and strict
//! reverse-order teardown. Also implements the `-t` speed-test bypass,
//! which skips the decoder and the display thread altogether.

use crate::config::PlayerConfig;
use crate::driver::{Caps, Codec, Display, MemMan, PixConv, Timer};
use crate::error::{PlayerError, Result};
use crate::pipeline::{self, FullscreenMode};
use crate::pool::Pool;
use crate::registry::Registry;
use crate::scheduler::{self, DisplayStats};
use crate::testpattern;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const DEFAULT_FRAME_RATE_FPS: f64 = 25.0;

fn frame_interval_from(fps: f64) -> Duration {
    Duration::from_secs_f64(1.0 / fps.max(f64::EPSILON))
}

/// The five driver catalogues, assembled once at startup by whichever
/// `player-drivers`-style crate registers its implementations.
pub struct Drivers {
    pub codecs: Registry<dyn Codec>,
    pub displays: Registry<dyn Display>,
    pub memmans: Registry<dyn MemMan>,
    pub pixconvs: Registry<dyn PixConv>,
    pub timers: Registry<dyn Timer>,
}

/// Runs one playback session to completion (normal playback) or for a
/// fixed iteration count (speed test), honouring `stop` for early
/// shutdown.
pub fn run(drivers: &Drivers, config: &PlayerConfig, stop: Arc<AtomicBool>) -> Result<DisplayStats> {
    if let Some(test) = config.speed_test {
        return run_speed_test(drivers, config, test);
    }
    run_playback(drivers, config, stop)
}

fn run_playback(drivers: &Drivers, config: &PlayerConfig, stop: Arc<AtomicBool>) -> Result<DisplayStats> {
    let input_path = config
        .input
        .as_ref()
        .ok_or_else(|| PlayerError::usage("an input file is required"))?;

    let (mut codec, codec_params) = drivers.codecs.find(config.codec_spec.as_deref())?;
    let source_format = codec.open(codec_params.as_deref())?;
    let packet_size = codec.packet_size();
    if packet_size == 0 {
        return Err(PlayerError::DecodeError(
            "codec reported a zero packet size".to_string(),
        ));
    }

    let (mut display, display_params) = drivers.displays.find(config.display_spec.as_deref())?;
    let display_native = display.open(display_params.as_deref(), &source_format)?;
    let display_caps = display.caps();

    let (mut memman, _memman_params) = drivers.memmans.find(config.memman_spec.as_deref())?;
    let memman_caps = memman.caps();
    let frames = memman.alloc_frames(&source_format, config.pool_budget_bytes)?;
    if frames.is_empty() {
        return Err(PlayerError::resource_exhausted(
            "memory manager allocated zero frames for the configured budget",
        ));
    }
    let pool = Arc::new(Pool::new(frames));
    info!(pool_size = pool.pool_size(), "frame pool ready");

    let scale = pipeline::set_scale(
        source_format.disp_w,
        source_format.disp_h,
        display_native.width,
        display_native.height,
        config.fullscreen,
    );
    let mut display_format = display_native;
    display_format.disp_x = scale.x;
    display_format.disp_y = scale.y;
    display_format.disp_w = scale.w;
    display_format.disp_h = scale.h;

    let pixconv = pipeline::resolve_pixconv(
        &drivers.pixconvs,
        config.pixconv_spec.as_deref(),
        display_caps,
        &source_format,
        &display_format,
    )?;
    if let Some(pc) = &pixconv {
        pipeline::check_phys_mem_compat(display_caps, memman_caps, pc.caps())?;
    }

    let (mut timer, timer_params) = drivers.timers.find(config.timer_spec.as_deref())?;
    timer.open(timer_params.as_deref())?;

    let flags = {
        let mut flags = Caps::empty();
        match config.fullscreen {
            FullscreenMode::AspectPreserve => flags |= Caps::FULLSCREEN,
            FullscreenMode::Distort => flags |= Caps::FULLSCREEN | Caps::DISTORT,
            FullscreenMode::Off => {}
        }
        if !config.single_buffer {
            flags |= Caps::DOUBLE_BUF;
        }
        flags
    };
    display.enable(&source_format, flags, pixconv)?;

    let start = timer.start()?;
    let frame_interval = frame_interval_from(config.frame_rate_override.unwrap_or(DEFAULT_FRAME_RATE_FPS));

    let scheduler_pool = pool.clone();
    let scheduler_stop = stop.clone();
    let scheduler_handle = std::thread::Builder::new()
        .name("display".to_string())
        .spawn(move || {
            scheduler::run(
                &scheduler_pool,
                display.as_mut(),
                timer.as_ref(),
                frame_interval,
                start,
                &scheduler_stop,
            )
        })
        .map_err(PlayerError::Io)?;

    let packets = std::fs::read(input_path)?;
    let mut decoded = 0usize;
    for packet in packets.chunks(packet_size) {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        if packet.len() < packet_size {
            warn!(
                remaining = packet.len(),
                packet_size, "trailing short packet at end of input, dropping"
            );
            break;
        }
        codec.decode(packet, &pool)?;
        decoded += 1;
    }
    info!(decoded, "decode loop finished");

    stop.store(true, Ordering::Relaxed);
    pool.cancel_display_wait();

    let stats = scheduler_handle
        .join()
        .map_err(|_| PlayerError::DecodeError("display thread panicked".to_string()))?;

    codec.close();

    Ok(stats)
}

/// The `-t WxHxN` bypass: fills every pooled frame with a synthetic
/// pattern once, then loops `get_frame`/`prepare`/`show`/`put_frame` on
/// the calling thread with no timer pacing and no display thread,
/// purely to measure raw pipeline throughput.
fn run_speed_test(
    drivers: &Drivers,
    config: &PlayerConfig,
    test: crate::config::SpeedTest,
) -> Result<DisplayStats> {
    use crate::frame::FrameFormat;
    use crate::pixfmt::PixelFormat;

    let source_format = FrameFormat::for_decoded_picture(test.width, test.height, PixelFormat::Yuv420p);

    let (mut display, display_params) = drivers.displays.find(config.display_spec.as_deref())?;
    let display_native = display.open(display_params.as_deref(), &source_format)?;
    let display_caps = display.caps();

    let (mut memman, _) = drivers.memmans.find(config.memman_spec.as_deref())?;
    let memman_caps = memman.caps();
    let frames = memman.alloc_frames(&source_format, config.pool_budget_bytes)?;
    if frames.is_empty() {
        return Err(PlayerError::resource_exhausted(
            "memory manager allocated zero frames for the configured budget",
        ));
    }
    let pool_size = frames.len();
    let pool = Pool::new(frames);

    let scale = pipeline::set_scale(
        source_format.disp_w,
        source_format.disp_h,
        display_native.width,
        display_native.height,
        config.fullscreen,
    );
    let mut display_format = display_native;
    display_format.disp_x = scale.x;
    display_format.disp_y = scale.y;
    display_format.disp_w = scale.w;
    display_format.disp_h = scale.h;

    let pixconv = pipeline::resolve_pixconv(
        &drivers.pixconvs,
        config.pixconv_spec.as_deref(),
        display_caps,
        &source_format,
        &display_format,
    )?;
    if let Some(pc) = &pixconv {
        pipeline::check_phys_mem_compat(display_caps, memman_caps, pc.caps())?;
    }

    display.enable(&source_format, Caps::empty(), pixconv)?;

    for _ in 0..pool_size {
        let idx = pool.get_frame();
        testpattern::fill(&mut pool.frame(idx), &source_format);
        pool.put_frame(idx);
    }

    let start = std::time::Instant::now();
    let mut stats = DisplayStats::default();
    for _ in 0..test.frames {
        let idx = pool.get_frame();
        display.prepare(&pool.frame(idx));
        display.show(&pool.frame(idx));
        pool.put_frame(idx);
        stats.frames_shown += 1;
    }
    let elapsed = start.elapsed();
    info!(
        frames = stats.frames_shown,
        fps = stats.frames_shown as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        "speed test finished"
    );

    display.close();
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_interval_from_fps() {
        let interval = frame_interval_from(25.0);
        assert!((interval.as_secs_f64() - 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_frame_interval_from_zero_fps_does_not_divide_by_zero() {
        let interval = frame_interval_from(0.0);
        assert!(interval.as_secs_f64().is_finite());
    }
}
