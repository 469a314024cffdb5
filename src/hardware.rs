//! Hardware Abstraction Module
//!
//! This module handles the low-level configuration of the RP2350 peripherals.
//! It encapsulates the setup of Clocks, PLLs, Timer, GPIOs, ADC and PIO,
//! exposing a `Hardware` struct whose parts implement the panel traits.

use embedded_hal::delay::DelayNs;
use rp235x_hal as hal;
use hal::Clock as _;
use hal::pac;

use sos_panel::peripherals::{Clock, SampleSource};

use crate::usb_module;
use crate::ws2812::PioMatrix;

/// External crystal frequency used by the Raspberry Pi Pico 2 W.
const XTAL_FREQ_HZ: u32 = 12_000_000u32;

/// ADC input wired to the microphone (GPIO28).
const MIC_ADC_CHANNEL: u8 = 2;

pub type ButtonAPin = hal::gpio::Pin<
    hal::gpio::bank0::Gpio5,
    hal::gpio::FunctionSio<hal::gpio::SioInput>,
    hal::gpio::PullUp,
>;

pub type ButtonBPin = hal::gpio::Pin<
    hal::gpio::bank0::Gpio6,
    hal::gpio::FunctionSio<hal::gpio::SioInput>,
    hal::gpio::PullUp,
>;

pub type SosLedPin = hal::gpio::Pin<
    hal::gpio::bank0::Gpio13,
    hal::gpio::FunctionSio<hal::gpio::SioOutput>,
    hal::gpio::PullDown,
>;

pub type BuzzerPin = hal::gpio::Pin<
    hal::gpio::bank0::Gpio21,
    hal::gpio::FunctionSio<hal::gpio::SioOutput>,
    hal::gpio::PullDown,
>;

/// Microsecond timer seen as a millisecond clock.
pub struct TimerClock(hal::Timer<hal::timer::CopyableTimer0>);

impl DelayNs for TimerClock {
    fn delay_ns(&mut self, ns: u32) {
        self.0.delay_ns(ns);
    }

    fn delay_us(&mut self, us: u32) {
        self.0.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.delay_ms(ms);
    }
}

impl Clock for TimerClock {
    fn now_ms(&mut self) -> u32 {
        // Truncation wraps the counter; elapsed times use wrapping_sub
        (self.0.get_counter().ticks() / 1_000) as u32
    }
}

/// Single-shot reads of the microphone channel.
pub struct MicAdc {
    _adc: hal::Adc,
}

impl SampleSource for MicAdc {
    fn read_sample(&mut self) -> u16 {
        unsafe {
            let adc_regs = &(*pac::ADC::ptr());
            adc_regs.cs().modify(|_, w| w.start_once().set_bit());
            while adc_regs.cs().read().ready().bit_is_clear() {}
            adc_regs.result().read().result().bits()
        }
    }
}

pub struct Hardware {
    pub button_a: ButtonAPin,
    pub button_b: ButtonBPin,
    pub led: SosLedPin,
    pub buzzer: BuzzerPin,
    pub mic: MicAdc,
    pub matrix: PioMatrix,
    pub timer: TimerClock,
}

/// Initializes the entire hardware stack.
///
/// This function:
/// 1.  Takes ownership of the raw PAC peripherals.
/// 2.  Configures the Watchdog and Clocks (System & USB).
/// 3.  Initializes the Microsecond Timer.
/// 4.  Configures GPIO pins (buttons, SOS LED, buzzer).
/// 5.  Sets up the ADC for polled single-shot reads of the microphone.
/// 6.  Loads the WS2812 program for the LED matrix.
/// 7.  Initializes the USB Serial module.
pub fn init() -> Hardware {
    // 1. Take ownership of raw peripherals
    let Some(mut pac) = pac::Peripherals::take() else {
        defmt::panic!("peripherals already taken");
    };
    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);

    // 2. Configure Clocks
    let Ok(clocks) = hal::clocks::init_clocks_and_plls(
        XTAL_FREQ_HZ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    ) else {
        defmt::panic!("clock init failed");
    };

    // 3. Configure Timer (Microsecond precision)
    let timer = hal::Timer::new_timer0(pac.TIMER0, &mut pac.RESETS, &clocks);

    // 4. Configure GPIOs
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    let button_a = pins.gpio5.into_pull_up_input();
    let button_b = pins.gpio6.into_pull_up_input();
    let led = pins.gpio13.into_push_pull_output();
    let buzzer = pins.gpio21.into_push_pull_output();

    // 5. Configure ADC (polled, single channel)
    let adc = hal::Adc::new(pac.ADC, &mut pac.RESETS);
    let Ok(_mic_pin) = hal::adc::AdcPin::new(pins.gpio28) else {
        defmt::panic!("GPIO28 is not an ADC pin");
    };

    unsafe {
        let adc_regs = &(*pac::ADC::ptr());

        // FIFO off: results are read straight from RESULT
        adc_regs.fcs().modify(|_, w| w.en().clear_bit());

        // Channel Control: Ch2 (GPIO28), Enable, Single-Shot
        adc_regs.cs().modify(|_, w| {
            w.ainsel().bits(MIC_ADC_CHANNEL)
             .en().set_bit()
             .start_many().clear_bit()
        });
    }

    // 6. Configure the LED matrix state machine
    let matrix = PioMatrix::new(
        pac.PIO0,
        pins.gpio7.into_function(),
        clocks.system_clock.freq().to_Hz(),
        &mut pac.RESETS,
    );

    // 7. Configure USB Serial (via module)
    usb_module::init(
        pac.USB,
        pac.USB_DPRAM,
        clocks.usb_clock,
        &mut pac.RESETS,
    );

    // Return ready-to-use hardware
    Hardware {
        button_a,
        button_b,
        led,
        buzzer,
        mic: MicAdc { _adc: adc },
        matrix,
        timer: TimerClock(timer),
    }
}
