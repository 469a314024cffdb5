//! Compile-time tuning for the panel.
//!
//! Every constant has a matching field in one of the config structs so tests
//! can shrink or stretch timings without touching the defaults.

use crate::peripherals::Rgb;

/// Number of cells in the indicator matrix (5x5).
pub const CELL_COUNT: usize = 25;

/// Exclusive upper bound of a raw ADC sample (12-bit converter).
pub const ADC_FULL_SCALE: u16 = 4096;

/// Filtered level below which the microphone is considered silent.
pub const NOISE_THRESHOLD: u16 = 2000;

/// Smoothing coefficient. Values above 1.0 overshoot towards the newest
/// sample on purpose.
pub const EMA_ALPHA: f32 = 1.4;

/// Brightness of a lit level cell.
pub const LEVEL_BRIGHTNESS: f32 = 0.5;

pub const DOT_MS: u32 = 250;
pub const DASH_MS: u32 = 750;
pub const ELEMENT_GAP_MS: u32 = 250;
pub const LETTER_GAP_MS: u32 = 750;

/// Granularity of the interruptible sleep.
pub const POLL_TICK_MS: u32 = 10;

/// Time after entering SOS mode during which the buzzer follows the pattern.
pub const FULL_PATTERN_WINDOW_MS: u32 = 2000;

/// Pause after every mode change so one press is not seen twice.
pub const SETTLE_MS: u32 = 200;
pub const MENU_POLL_MS: u32 = 100;

/// Visualizer frame period (20 Hz).
pub const FRAME_MS: u32 = 50;

/// Audio pipeline parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LevelConfig {
    pub alpha: f32,
    pub noise_threshold: u16,
    pub full_scale: u16,
    pub cell_count: usize,
    pub on_color: Rgb,
}

impl LevelConfig {
    /// Largest filtered value a full-scale sample can produce at steady state.
    #[must_use]
    pub const fn max_filtered(&self) -> u16 {
        self.full_scale.saturating_sub(self.noise_threshold)
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            alpha: EMA_ALPHA,
            noise_threshold: NOISE_THRESHOLD,
            full_scale: ADC_FULL_SCALE,
            cell_count: CELL_COUNT,
            on_color: Rgb::new(0.0, LEVEL_BRIGHTNESS, 0.0),
        }
    }
}

/// Morse timing for the SOS pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EncoderTiming {
    pub dot_ms: u32,
    pub dash_ms: u32,
    pub element_gap_ms: u32,
    pub letter_gap_ms: u32,
    pub poll_ms: u32,
}

impl Default for EncoderTiming {
    fn default() -> Self {
        Self {
            dot_ms: DOT_MS,
            dash_ms: DASH_MS,
            element_gap_ms: ELEMENT_GAP_MS,
            letter_gap_ms: LETTER_GAP_MS,
            poll_ms: POLL_TICK_MS,
        }
    }
}

/// Mode loop cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerTiming {
    pub settle_ms: u32,
    pub menu_poll_ms: u32,
    pub frame_ms: u32,
    pub full_pattern_window_ms: u32,
}

impl Default for ControllerTiming {
    fn default() -> Self {
        Self {
            settle_ms: SETTLE_MS,
            menu_poll_ms: MENU_POLL_MS,
            frame_ms: FRAME_MS,
            full_pattern_window_ms: FULL_PATTERN_WINDOW_MS,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PanelConfig {
    pub level: LevelConfig,
    pub encoder: EncoderTiming,
    pub controller: ControllerTiming,
}
