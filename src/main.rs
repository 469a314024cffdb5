//! SPDX-License-Identifier: MIT OR Apache-2.0
//!
//! # SOS / Audio Level Panel Firmware
//!
//! This application wires the hardware-agnostic `sos_panel` library to the board:
//! - **Hardware Module:** HAL setup and board adapters (`hardware.rs`).
//! - **USB Module:** Serial console with interrupts (`usb_module.rs`).
//! - **WS2812 Module:** PIO driver for the 5x5 LED matrix (`ws2812.rs`).
//! - **FSM:** Typed state machine for the operating modes (`sos_panel::mode_fsm`).
//!
//! Target: Raspberry Pi Pico 2 W (RP2350).

#![no_std]
#![no_main]

// --- Imports ---
use core::fmt::Write as FmtWrite;
use defmt::*;
use defmt_rtt as _;
use heapless::String;
use panic_probe as _;

use sos_panel::peripherals::{PinAlarm, PinButtons};
use sos_panel::{ModeController, PanelConfig, Peripherals};

// --- Modules ---
mod hardware;
mod usb_module;
mod ws2812;

// --- HAL Selection ---
use rp235x_hal as hal;
use hal::entry;

// --- Bootloader Configuration ---

#[unsafe(link_section = ".start_block")]
#[used]
pub static IMAGE_DEF: hal::block::ImageDef = hal::block::ImageDef::secure_exe();

/// Entry point.
#[entry]
fn main() -> ! {
    info!("Program start");

    // 1. Initialize Hardware Stack (Clocks, GPIO, Timer, ADC, PIO, USB)
    let hw = hardware::init();

    // 2. Hand the board to the mode controller (enters Menu)
    let io = Peripherals {
        input: PinButtons::new(hw.button_a, hw.button_b, hw.mic),
        matrix: hw.matrix,
        alarm: PinAlarm::new(hw.led, hw.buzzer),
        timer: hw.timer,
        display: usb_module::UsbConsole,
    };
    let mut controller = ModeController::new(io, PanelConfig::default());
    report_state(controller.mode().label());

    // 3. Main Application Loop
    loop {
        let before = controller.mode();
        let after = controller.step();
        if after != before {
            report_state(after.label());
        }
    }
}

/// Log state to USB
fn report_state(state: &str) {
    let mut msg: String<64> = String::new();
    if FmtWrite::write_fmt(&mut msg, format_args!("State: {}\r\n", state)).is_ok() {
        usb_module::write(msg.as_bytes());
    }
}

// --- Metadata ---

#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [hal::binary_info::EntryAddr; 4] = [
    hal::binary_info::rp_cargo_bin_name!(),
    hal::binary_info::rp_cargo_version!(),
    hal::binary_info::rp_program_description!(c"SOS / Audio Level Panel"),
    hal::binary_info::rp_program_build_attribute!()
];
