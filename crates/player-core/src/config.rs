//! Player configuration, assembled via a builder so the CLI layer (or
//! any other caller) can set only the fields it has opinions about.
//! Mirrors the builder pattern used for pipeline configuration
//! elsewhere in this workspace.

use crate::error::{PlayerError, Result};
use crate::pipeline::FullscreenMode;

/// A parsed `-t WxHxN` speed-test specification: run with a synthetic
/// test pattern instead of decoding `input`, at `width x height`, for
/// `frames` iterations, bypassing the display thread entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedTest {
    pub width: u32,
    pub height: u32,
    pub frames: u32,
}

impl SpeedTest {
    /// Parses `WxHxN`, e.g. `"720x480x200"`.
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('x').collect();
        let [w, h, n] = parts.as_slice() else {
            return Err(PlayerError::usage(format!(
                "invalid speed-test spec '{s}', expected WxHxN"
            )));
        };
        let parse_dim = |field: &str, s: &str| {
            s.parse::<u32>()
                .map_err(|_| PlayerError::usage(format!("invalid {field} '{s}' in speed-test spec")))
        };
        Ok(Self {
            width: parse_dim("width", w)?,
            height: parse_dim("height", h)?,
            frames: parse_dim("frame count", n)?,
        })
    }
}

/// Fully resolved playback configuration.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Input media path. Ignored when `speed_test` is set.
    pub input: Option<String>,
    /// Video codec driver `name[:params]` (`-v`).
    pub codec_spec: Option<String>,
    /// Frame pool memory budget, in bytes (`-b`).
    pub pool_budget_bytes: usize,
    /// Display driver `name[:params]` (`-d`).
    pub display_spec: Option<String>,
    /// Fullscreen scale policy (`-f` aspect-preserving, `-F` distorting).
    pub fullscreen: FullscreenMode,
    /// Frame-rate override in frames per second (`--fps`); `None` uses
    /// the codec's reported rate.
    pub frame_rate_override: Option<f64>,
    /// Memory manager driver `name[:params]` (`-M`).
    pub memman_spec: Option<String>,
    /// Pixel converter driver `name[:params]` (`-P`).
    pub pixconv_spec: Option<String>,
    /// Force single-buffered display (`-s`).
    pub single_buffer: bool,
    /// Speed-test spec (`-t WxHxN`); bypasses decode and the display
    /// thread.
    pub speed_test: Option<SpeedTest>,
    /// Timer driver `name[:params]` (`-T`).
    pub timer_spec: Option<String>,
}

const DEFAULT_POOL_BUDGET_BYTES: usize = 64 * 1024 * 1024;

/// Builds a [`PlayerConfig`], defaulting unset fields the same way the
/// CLI's own flag defaults do.
#[derive(Debug, Default)]
pub struct PlayerConfigBuilder {
    input: Option<String>,
    codec_spec: Option<String>,
    pool_budget_bytes: Option<usize>,
    display_spec: Option<String>,
    fullscreen: FullscreenMode,
    frame_rate_override: Option<f64>,
    memman_spec: Option<String>,
    pixconv_spec: Option<String>,
    single_buffer: bool,
    speed_test: Option<SpeedTest>,
    timer_spec: Option<String>,
}

impl PlayerConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    #[must_use]
    pub fn codec_spec(mut self, spec: impl Into<String>) -> Self {
        self.codec_spec = Some(spec.into());
        self
    }

    #[must_use]
    pub fn pool_budget_bytes(mut self, bytes: usize) -> Self {
        self.pool_budget_bytes = Some(bytes);
        self
    }

    #[must_use]
    pub fn display_spec(mut self, spec: impl Into<String>) -> Self {
        self.display_spec = Some(spec.into());
        self
    }

    #[must_use]
    pub fn fullscreen(mut self, fullscreen: FullscreenMode) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    #[must_use]
    pub fn frame_rate_override(mut self, fps: f64) -> Self {
        self.frame_rate_override = Some(fps);
        self
    }

    #[must_use]
    pub fn memman_spec(mut self, spec: impl Into<String>) -> Self {
        self.memman_spec = Some(spec.into());
        self
    }

    #[must_use]
    pub fn pixconv_spec(mut self, spec: impl Into<String>) -> Self {
        self.pixconv_spec = Some(spec.into());
        self
    }

    #[must_use]
    pub fn single_buffer(mut self, single_buffer: bool) -> Self {
        self.single_buffer = single_buffer;
        self
    }

    #[must_use]
    pub fn speed_test(mut self, spec: SpeedTest) -> Self {
        self.speed_test = Some(spec);
        self
    }

    #[must_use]
    pub fn timer_spec(mut self, spec: impl Into<String>) -> Self {
        self.timer_spec = Some(spec.into());
        self
    }

    /// Validates and assembles the configuration. An input path is
    /// required unless a speed test is configured.
    pub fn build(self) -> Result<PlayerConfig> {
        if self.input.is_none() && self.speed_test.is_none() {
            return Err(PlayerError::usage(
                "an input file is required unless -t is given",
            ));
        }

        Ok(PlayerConfig {
            input: self.input,
            codec_spec: self.codec_spec,
            pool_budget_bytes: self.pool_budget_bytes.unwrap_or(DEFAULT_POOL_BUDGET_BYTES),
            display_spec: self.display_spec,
            fullscreen: self.fullscreen,
            frame_rate_override: self.frame_rate_override,
            memman_spec: self.memman_spec,
            pixconv_spec: self.pixconv_spec,
            single_buffer: self.single_buffer,
            speed_test: self.speed_test,
            timer_spec: self.timer_spec,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speed_test_spec() {
        let t = SpeedTest::parse("720x480x200").expect("valid spec");
        assert_eq!(t.width, 720);
        assert_eq!(t.height, 480);
        assert_eq!(t.frames, 200);
    }

    #[test]
    fn test_parse_speed_test_rejects_malformed_spec() {
        assert!(SpeedTest::parse("720x480").is_err());
        assert!(SpeedTest::parse("720xAx200").is_err());
    }

    #[test]
    fn test_build_requires_input_or_speed_test() {
        let err = PlayerConfigBuilder::new().build().unwrap_err();
        assert!(matches!(err, PlayerError::UsageError(_)));
    }

    #[test]
    fn test_build_accepts_speed_test_without_input() {
        let cfg = PlayerConfigBuilder::new()
            .speed_test(SpeedTest {
                width: 320,
                height: 240,
                frames: 10,
            })
            .build()
            .expect("speed test alone is enough");
        assert!(cfg.input.is_none());
    }

    #[test]
    fn test_build_applies_default_pool_budget() {
        let cfg = PlayerConfigBuilder::new()
            .input("movie.raw")
            .build()
            .expect("valid");
        assert_eq!(cfg.pool_budget_bytes, DEFAULT_POOL_BUDGET_BYTES);
    }

    #[test]
    fn test_builder_overrides_defaults() {
        let cfg = PlayerConfigBuilder::new()
            .input("movie.raw")
            .pool_budget_bytes(1024)
            .fullscreen(FullscreenMode::AspectPreserve)
            .single_buffer(true)
            .build()
            .expect("valid");
        assert_eq!(cfg.pool_budget_bytes, 1024);
        assert_eq!(cfg.fullscreen, FullscreenMode::AspectPreserve);
        assert!(cfg.single_buffer);
    }
}
