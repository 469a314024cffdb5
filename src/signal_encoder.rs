//! SOS signalling on the alarm output.
//!
//! The pattern is a fixed list of [`SignalStep`]s. Each step waits through
//! [`sleep_with_exit`], which checks the cancel predicate every poll tick,
//! so a button press is noticed within one tick whatever step is running.

use embedded_hal::delay::DelayNs;

use crate::config::EncoderTiming;
use crate::peripherals::AlarmOutput;

/// Output level held for a duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalStep {
    pub alarm_on: bool,
    pub duration_ms: u32,
}

impl SignalStep {
    #[must_use]
    pub const fn on(duration_ms: u32) -> Self {
        Self { alarm_on: true, duration_ms }
    }

    #[must_use]
    pub const fn off(duration_ms: u32) -> Self {
        Self { alarm_on: false, duration_ms }
    }
}

/// Which half of SOS mode is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SosPhase {
    /// LED and buzzer follow the pattern.
    FullPattern,
    /// Buzzer held on, LED keeps signalling.
    ContinuousAlarm,
}

impl SosPhase {
    /// Phase for a given time since SOS mode was entered. The boundary
    /// belongs to the alarm phase.
    #[must_use]
    pub const fn at(elapsed_ms: u32, full_pattern_window_ms: u32) -> Self {
        if elapsed_ms < full_pattern_window_ms {
            Self::FullPattern
        } else {
            Self::ContinuousAlarm
        }
    }
}

const DOTS: u8 = 3;
const LETTERS: [Letter; 3] = [Letter::S, Letter::O, Letter::S];
const STEPS_PER_LETTER: usize = 2 * DOTS as usize;

/// Number of steps in one SOS: three letters of on/off pairs plus two
/// letter gaps.
pub const SOS_STEP_COUNT: usize = LETTERS.len() * STEPS_PER_LETTER + LETTERS.len() - 1;

#[derive(Clone, Copy)]
enum Letter {
    S,
    O,
}

/// Lazily yields the SOS step sequence.
#[derive(Clone, Debug)]
pub struct SosSteps {
    timing: EncoderTiming,
    index: usize,
}

impl SosSteps {
    #[must_use]
    pub const fn new(timing: EncoderTiming) -> Self {
        Self { timing, index: 0 }
    }

    fn step_at(&self, index: usize) -> Option<SignalStep> {
        // Each letter block is followed by a single gap step, except the last
        let block = STEPS_PER_LETTER + 1;
        let letter = LETTERS.get(index / block)?;
        let offset = index % block;
        let t = &self.timing;

        Some(match offset {
            n if n == STEPS_PER_LETTER => SignalStep::off(t.letter_gap_ms),
            n if n % 2 == 0 => SignalStep::on(match letter {
                Letter::S => t.dot_ms,
                Letter::O => t.dash_ms,
            }),
            _ => SignalStep::off(t.element_gap_ms),
        })
    }
}

impl Iterator for SosSteps {
    type Item = SignalStep;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= SOS_STEP_COUNT {
            return None;
        }
        let step = self.step_at(self.index)?;
        self.index += 1;
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = SOS_STEP_COUNT.saturating_sub(self.index);
        (left, Some(left))
    }
}

impl ExactSizeIterator for SosSteps {}

/// Sleeps `duration_ms` in `tick_ms` slices, checking `cancel` after each.
///
/// Returns `true` as soon as `cancel` does. Durations that are not a
/// multiple of the tick round up.
pub fn sleep_with_exit<D, F>(delay: &mut D, duration_ms: u32, tick_ms: u32, cancel: &mut F) -> bool
where
    D: DelayNs,
    F: FnMut() -> bool,
{
    let tick_ms = tick_ms.max(1);
    let mut waited = 0u32;
    while waited < duration_ms {
        delay.delay_ms(tick_ms);
        waited = waited.saturating_add(tick_ms);
        if cancel() {
            return true;
        }
    }
    false
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Drive {
    LedAndBuzzer,
    LedOnly,
}

pub struct SignalEncoder {
    timing: EncoderTiming,
}

impl SignalEncoder {
    #[must_use]
    pub const fn new(timing: EncoderTiming) -> Self {
        Self { timing }
    }

    #[must_use]
    pub const fn steps(&self) -> SosSteps {
        SosSteps::new(self.timing)
    }

    /// Plays one SOS on LED and buzzer. Returns `true` if cancelled, leaving
    /// the outputs in whatever state they had at that moment.
    pub fn run_full_pattern<A, D, F>(&self, alarm: &mut A, delay: &mut D, mut cancel: F) -> bool
    where
        A: AlarmOutput,
        D: DelayNs,
        F: FnMut() -> bool,
    {
        self.play(alarm, delay, &mut cancel, Drive::LedAndBuzzer)
    }

    /// Same pattern on the LED alone; the buzzer is left untouched.
    pub fn run_led_only_pattern<A, D, F>(&self, alarm: &mut A, delay: &mut D, mut cancel: F) -> bool
    where
        A: AlarmOutput,
        D: DelayNs,
        F: FnMut() -> bool,
    {
        self.play(alarm, delay, &mut cancel, Drive::LedOnly)
    }

    fn play<A, D, F>(&self, alarm: &mut A, delay: &mut D, cancel: &mut F, drive: Drive) -> bool
    where
        A: AlarmOutput,
        D: DelayNs,
        F: FnMut() -> bool,
    {
        for step in self.steps() {
            match drive {
                Drive::LedAndBuzzer => alarm.set_on(step.alarm_on),
                Drive::LedOnly => alarm.set_visual(step.alarm_on),
            }
            if sleep_with_exit(delay, step.duration_ms, self.timing.poll_ms, cancel) {
                #[cfg(feature = "defmt")]
                defmt::debug!("SOS cancelled during {}", step);
                return true;
            }
        }
        false
    }
}
