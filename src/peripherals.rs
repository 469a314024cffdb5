//! Collaborator interfaces consumed by the controller.
//!
//! The controller only ever talks to hardware through these traits. Generic
//! adapters over `embedded-hal` pins live here too; chip-specific ones are in
//! the firmware binary.

use embedded_hal::digital::{InputPin, OutputPin};
use smart_leds::RGB8;

/// The two front-panel buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Button {
    A,
    B,
}

/// Fixed status text shown for each mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Screen {
    Menu,
    AudioVisualizer,
    SosSignal,
}

impl Screen {
    #[must_use]
    pub const fn lines(self) -> &'static [&'static str] {
        match self {
            Self::Menu => &["Options:", "A: Audio capture", "B: SOS signal", "Press A or B"],
            Self::AudioVisualizer => &["Audio Visualizer", "Press B to exit"],
            Self::SosSignal => &["SOS Mode", "Press A to exit"],
        }
    }
}

/// Colour with each component in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const OFF: Self = Self::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Quantizes to 8-bit channels, truncating.
    #[must_use]
    pub fn to_rgb8(self) -> RGB8 {
        RGB8::new(quantize(self.r), quantize(self.g), quantize(self.b))
    }
}

fn quantize(component: f32) -> u8 {
    (component.clamp(0.0, 1.0) * 255.0) as u8
}

/// Packs a pixel into the word a WS2812 PIO program shifts out MSB first:
/// green, red, blue, then 8 unused bits.
#[must_use]
pub fn pack_grb(color: RGB8) -> u32 {
    (u32::from(color.g) << 24) | (u32::from(color.r) << 16) | (u32::from(color.b) << 8)
}

pub trait InputSource {
    /// Current button level. Buttons are not debounced here.
    fn is_pressed(&mut self, button: Button) -> bool;

    /// One microphone sample in `[0, ADC_FULL_SCALE)`.
    fn read_raw_sample(&mut self) -> u16;
}

pub trait IndicatorMatrix {
    fn set_cell(&mut self, index: usize, color: Rgb);

    /// Pushes the cells set since the last flush out to the LEDs.
    fn flush(&mut self) {}
}

/// Red LED and buzzer. They are normally driven together.
pub trait AlarmOutput {
    fn set_visual(&mut self, on: bool);
    fn set_audible(&mut self, on: bool);

    fn set_on(&mut self, on: bool) {
        self.set_visual(on);
        self.set_audible(on);
    }
}

/// Free-running millisecond counter. Wraps after ~49 days; callers use
/// wrapping arithmetic.
pub trait Clock {
    fn now_ms(&mut self) -> u32;
}

pub trait StatusDisplay {
    fn show(&mut self, screen: Screen);
}

pub trait SampleSource {
    fn read_sample(&mut self) -> u16;
}

/// Active-low buttons plus an analog sampler.
pub struct PinButtons<PA, PB, S> {
    button_a: PA,
    button_b: PB,
    sampler: S,
}

impl<PA: InputPin, PB: InputPin, S: SampleSource> PinButtons<PA, PB, S> {
    pub fn new(button_a: PA, button_b: PB, sampler: S) -> Self {
        Self { button_a, button_b, sampler }
    }
}

impl<PA: InputPin, PB: InputPin, S: SampleSource> InputSource for PinButtons<PA, PB, S> {
    fn is_pressed(&mut self, button: Button) -> bool {
        // A pin that cannot be read counts as released
        match button {
            Button::A => self.button_a.is_low().unwrap_or(false),
            Button::B => self.button_b.is_low().unwrap_or(false),
        }
    }

    fn read_raw_sample(&mut self) -> u16 {
        self.sampler.read_sample()
    }
}

/// Alarm wired to two push-pull outputs, active-high.
pub struct PinAlarm<V, Z> {
    led: V,
    buzzer: Z,
}

impl<V: OutputPin, Z: OutputPin> PinAlarm<V, Z> {
    pub fn new(led: V, buzzer: Z) -> Self {
        Self { led, buzzer }
    }
}

impl<V: OutputPin, Z: OutputPin> AlarmOutput for PinAlarm<V, Z> {
    fn set_visual(&mut self, on: bool) {
        let _ = self.led.set_state(on.into());
    }

    fn set_audible(&mut self, on: bool) {
        let _ = self.buzzer.set_state(on.into());
    }
}
