//! Microphone level pipeline: noise filter, level-to-cell mapping and the
//! matrix bar graph.

use crate::config::LevelConfig;
use crate::peripherals::{IndicatorMatrix, Rgb};

/// Accumulator of the exponential moving average.
///
/// Starts at zero and is carried across visualizer sessions.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FilterState {
    pub ema: f32,
}

pub struct AudioLevelPipeline {
    config: LevelConfig,
    state: FilterState,
}

impl AudioLevelPipeline {
    #[must_use]
    pub fn new(config: LevelConfig) -> Self {
        Self { config, state: FilterState::default() }
    }

    #[must_use]
    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Feeds one raw sample and returns the level above the noise floor.
    ///
    /// `ema = alpha * raw + (1 - alpha) * ema`, then anything under the
    /// threshold reads as silence. The result is not clipped at the top;
    /// [`map_to_indicator_count`] does that.
    pub fn filter(&mut self, raw: u16) -> u16 {
        let alpha = self.config.alpha;
        self.state.ema = alpha * f32::from(raw) + (1.0 - alpha) * self.state.ema;

        let threshold = f32::from(self.config.noise_threshold);
        if self.state.ema < threshold {
            0
        } else {
            // float-to-int `as` truncates and saturates at u16::MAX
            (self.state.ema - threshold) as u16
        }
    }

    /// Maps a filtered value onto the configured matrix size.
    #[must_use]
    pub fn indicator_count(&self, filtered: u16) -> usize {
        map_to_indicator_count(filtered, self.config.max_filtered(), self.config.cell_count)
    }

    /// One visualizer frame: filter `raw` and draw the resulting bar.
    pub fn update<M: IndicatorMatrix>(&mut self, matrix: &mut M, raw: u16) -> usize {
        let filtered = self.filter(raw);
        let lit = self.indicator_count(filtered);
        render_level(matrix, lit, self.config.cell_count, self.config.on_color);
        lit
    }
}

/// `floor(filtered * cell_count / max_filtered)`, clamped to `cell_count`.
#[must_use]
pub fn map_to_indicator_count(filtered: u16, max_filtered: u16, cell_count: usize) -> usize {
    if max_filtered == 0 {
        return if filtered == 0 { 0 } else { cell_count };
    }
    let scaled = u64::from(filtered) * cell_count as u64 / u64::from(max_filtered);
    usize::try_from(scaled).map_or(cell_count, |count| count.min(cell_count))
}

/// Lights cells `0..lit` with `on_color` and turns the rest off.
pub fn render_level<M: IndicatorMatrix>(matrix: &mut M, lit: usize, cell_count: usize, on_color: Rgb) {
    for index in 0..cell_count {
        let color = if index < lit { on_color } else { Rgb::OFF };
        matrix.set_cell(index, color);
    }
    matrix.flush();
}
