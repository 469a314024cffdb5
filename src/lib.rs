//! SPDX-License-Identifier: MIT OR Apache-2.0
//!
//! # SOS / Audio Level Panel
//!
//! Two buttons pick one of three modes:
//! - **Menu:** waits for A (audio visualizer) or B (SOS).
//! - **Audio visualizer:** microphone level as a bar on a 5x5 LED matrix.
//!   B returns to the menu.
//! - **SOS:** Morse SOS on the red LED and buzzer; after two seconds the
//!   buzzer stays on while the LED keeps signalling. A returns to the menu.
//!
//! The logic here is hardware-agnostic; the firmware binary supplies the
//! RP2350 implementations of the [`peripherals`] traits.

#![cfg_attr(not(test), no_std)]

pub mod audio_level;
pub mod config;
pub mod controller;
pub mod mode_fsm;
pub mod peripherals;
pub mod signal_encoder;

#[cfg(test)]
mod fakes;

pub use audio_level::{AudioLevelPipeline, FilterState, map_to_indicator_count, render_level};
pub use config::PanelConfig;
pub use controller::{ModeController, Peripherals};
pub use mode_fsm::{Mode, ModeEvent, ModeFsm};
pub use signal_encoder::{SignalEncoder, SignalStep, SosPhase, sleep_with_exit};
