//! WS2812 driver for the 5x5 matrix on PIO0 / SM0.
//!
//! The CPU keeps a frame of quantized pixels and pushes it through the TX
//! FIFO on `flush`, one GRB word per pixel.

use pio::{Assembler, JmpCondition, OutDestination, SideSet};
use rp235x_hal as hal;
use hal::pac;
use hal::pio::{PIOBuilder, PIOExt, PinDir, Running, ShiftDirection, StateMachine, Tx, SM0};
use smart_leds::RGB8;

use sos_panel::config::CELL_COUNT;
use sos_panel::peripherals::{pack_grb, IndicatorMatrix, Rgb};

pub type MatrixPin = hal::gpio::Pin<
    hal::gpio::bank0::Gpio7,
    hal::gpio::FunctionPio0,
    hal::gpio::PullDown,
>;

// Cycle split of one bit: T1 low-high edge, T2 data, T3 tail
const T1: u8 = 2;
const T2: u8 = 5;
const T3: u8 = 3;
const CYCLES_PER_BIT: u32 = (T1 + T2 + T3) as u32;
const BIT_RATE_HZ: u32 = 800_000;

pub struct PioMatrix {
    tx: Tx<(pac::PIO0, SM0)>,
    frame: [RGB8; CELL_COUNT],
    _sm: StateMachine<(pac::PIO0, SM0), Running>,
    _pin: MatrixPin,
}

impl PioMatrix {
    pub fn new(
        pio0: pac::PIO0,
        pin: MatrixPin,
        system_clock_hz: u32,
        resets: &mut pac::RESETS,
    ) -> Self {
        let (mut pio, sm0, _, _, _) = pio0.split(resets);
        let Ok(installed) = pio.install(&ws2812_program()) else {
            defmt::panic!("no PIO0 space for the WS2812 program");
        };

        // 16.8 fixed-point divider
        let divisor = u64::from(system_clock_hz) * 256 / u64::from(BIT_RATE_HZ * CYCLES_PER_BIT);
        let pin_id = pin.id().num;

        let (mut sm, _, tx) = PIOBuilder::from_installed_program(installed)
            .side_set_pin_base(pin_id)
            .out_shift_direction(ShiftDirection::Left)
            .autopull(true)
            .pull_threshold(24)
            .clock_divisor_fixed_point((divisor >> 8) as u16, (divisor & 0xff) as u8)
            .build(sm0);
        sm.set_pindirs([(pin_id, PinDir::Output)]);

        Self {
            tx,
            frame: [RGB8::default(); CELL_COUNT],
            _sm: sm.start(),
            _pin: pin,
        }
    }
}

impl IndicatorMatrix for PioMatrix {
    fn set_cell(&mut self, index: usize, color: Rgb) {
        if let Some(pixel) = self.frame.get_mut(index) {
            *pixel = color.to_rgb8();
        }
    }

    fn flush(&mut self) {
        for pixel in self.frame {
            // Blocks while the FIFO is full. Frames are far enough apart
            // for the line to latch between them.
            while !self.tx.write(pack_grb(pixel)) {}
        }
    }
}

fn ws2812_program() -> pio::Program<{ pio::RP2040_MAX_PROGRAM_SIZE }> {
    let side_set = SideSet::new(false, 1, false);
    let mut assembler = Assembler::<{ pio::RP2040_MAX_PROGRAM_SIZE }>::new_with_side_set(side_set);

    let mut wrap_target = assembler.label();
    let mut wrap_source = assembler.label();
    let mut do_zero = assembler.label();
    assembler.bind(&mut wrap_target);
    assembler.out_with_delay_and_side_set(OutDestination::X, 1, T3 - 1, 0);
    assembler.jmp_with_delay_and_side_set(JmpCondition::XIsZero, &mut do_zero, T1 - 1, 1);
    assembler.jmp_with_delay_and_side_set(JmpCondition::Always, &mut wrap_target, T2 - 1, 1);
    assembler.bind(&mut do_zero);
    assembler.nop_with_delay_and_side_set(T2 - 1, 0);
    assembler.bind(&mut wrap_source);

    assembler.assemble_with_wrap(wrap_source, wrap_target)
}
