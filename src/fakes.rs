//! Host-side stand-ins for the panel hardware.
//!
//! Everything shares one simulated clock that only moves when something
//! sleeps, so tests run instantly and timings are exact.

use core::cell::{Cell, RefCell};
use core::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::peripherals::{
    AlarmOutput, Button, Clock, IndicatorMatrix, InputSource, Rgb, SampleSource, Screen,
    StatusDisplay,
};

const NS_PER_MS: u64 = 1_000_000;

#[derive(Clone, Default)]
pub struct SimTimer {
    elapsed_ns: Rc<Cell<u64>>,
}

impl SimTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u32 {
        u32::try_from(self.elapsed_ns.get() / NS_PER_MS).expect("simulation ran past u32 ms")
    }

    fn advance_ns(&self, ns: u64) {
        self.elapsed_ns.set(self.elapsed_ns.get() + ns);
    }
}

impl DelayNs for SimTimer {
    fn delay_ns(&mut self, ns: u32) {
        self.advance_ns(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.advance_ns(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance_ns(u64::from(ms) * NS_PER_MS);
    }
}

impl Clock for SimTimer {
    fn now_ms(&mut self) -> u32 {
        self.now()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Element {
    Visual,
    Audible,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlarmWrite {
    pub at_ms: u32,
    pub element: Element,
    pub on: bool,
}

#[derive(Default)]
struct AlarmLog {
    writes: Vec<AlarmWrite>,
    visual: bool,
    audible: bool,
}

/// Alarm that timestamps every write.
#[derive(Clone)]
pub struct RecordingAlarm {
    clock: SimTimer,
    log: Rc<RefCell<AlarmLog>>,
}

impl RecordingAlarm {
    pub fn new(clock: SimTimer) -> Self {
        Self { clock, log: Rc::default() }
    }

    pub fn visual(&self) -> bool {
        self.log.borrow().visual
    }

    pub fn audible(&self) -> bool {
        self.log.borrow().audible
    }

    pub fn audible_writes(&self) -> usize {
        self.count(Element::Audible)
    }

    pub fn last_write_at(&self) -> Option<u32> {
        self.log.borrow().writes.last().map(|w| w.at_ms)
    }

    pub fn ever_on(&self) -> bool {
        self.log.borrow().writes.iter().any(|w| w.on)
    }

    pub fn visual_on_durations(&self) -> Vec<u32> {
        self.on_durations(Element::Visual)
    }

    pub fn audible_on_durations(&self) -> Vec<u32> {
        self.on_durations(Element::Audible)
    }

    fn count(&self, element: Element) -> usize {
        self.log.borrow().writes.iter().filter(|w| w.element == element).count()
    }

    /// Lengths of completed on-intervals, ignoring repeated writes of the
    /// same level.
    fn on_durations(&self, element: Element) -> Vec<u32> {
        let mut durations = Vec::new();
        let mut rose_at = None;
        for w in self.log.borrow().writes.iter().filter(|w| w.element == element) {
            match (w.on, rose_at) {
                (true, None) => rose_at = Some(w.at_ms),
                (false, Some(start)) => {
                    durations.push(w.at_ms - start);
                    rose_at = None;
                }
                _ => {}
            }
        }
        durations
    }

    fn record(&mut self, element: Element, on: bool) {
        let at_ms = self.clock.now();
        let mut log = self.log.borrow_mut();
        match element {
            Element::Visual => log.visual = on,
            Element::Audible => log.audible = on,
        }
        log.writes.push(AlarmWrite { at_ms, element, on });
    }
}

impl AlarmOutput for RecordingAlarm {
    fn set_visual(&mut self, on: bool) {
        self.record(Element::Visual, on);
    }

    fn set_audible(&mut self, on: bool) {
        self.record(Element::Audible, on);
    }
}

struct MatrixLog {
    cells: Vec<Rgb>,
    ever_lit: bool,
    flushes: usize,
}

#[derive(Clone)]
pub struct RecordingMatrix {
    log: Rc<RefCell<MatrixLog>>,
}

impl RecordingMatrix {
    pub fn new(cell_count: usize) -> Self {
        Self {
            log: Rc::new(RefCell::new(MatrixLog {
                cells: vec![Rgb::OFF; cell_count],
                ever_lit: false,
                flushes: 0,
            })),
        }
    }

    pub fn cell(&self, index: usize) -> Rgb {
        self.log.borrow().cells[index]
    }

    pub fn lit(&self) -> usize {
        self.log.borrow().cells.iter().filter(|c| **c != Rgb::OFF).count()
    }

    pub fn ever_lit(&self) -> bool {
        self.log.borrow().ever_lit
    }

    pub fn flushes(&self) -> usize {
        self.log.borrow().flushes
    }
}

impl IndicatorMatrix for RecordingMatrix {
    fn set_cell(&mut self, index: usize, color: Rgb) {
        let mut log = self.log.borrow_mut();
        log.ever_lit |= color != Rgb::OFF;
        log.cells[index] = color;
    }

    fn flush(&mut self) {
        self.log.borrow_mut().flushes += 1;
    }
}

#[derive(Clone, Default)]
pub struct RecordingDisplay {
    shown: Rc<RefCell<Vec<Screen>>>,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Vec<Screen> {
        self.shown.borrow().clone()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn show(&mut self, screen: Screen) {
        self.shown.borrow_mut().push(screen);
    }
}

/// How a scripted button behaves over simulated time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Press {
    Released,
    Held,
    /// Pressed from this instant on.
    From(u32),
}

impl Press {
    fn at(self, now_ms: u32) -> bool {
        match self {
            Self::Released => false,
            Self::Held => true,
            Self::From(start) => now_ms >= start,
        }
    }
}

struct Script {
    a: Press,
    b: Press,
    sample: u16,
    samples_read: usize,
}

/// Buttons and microphone driven by the test.
#[derive(Clone)]
pub struct ScriptedInput {
    clock: SimTimer,
    script: Rc<RefCell<Script>>,
}

impl ScriptedInput {
    pub fn new(clock: SimTimer) -> Self {
        Self {
            clock,
            script: Rc::new(RefCell::new(Script {
                a: Press::Released,
                b: Press::Released,
                sample: 0,
                samples_read: 0,
            })),
        }
    }

    pub fn set(&self, button: Button, press: Press) {
        let mut script = self.script.borrow_mut();
        match button {
            Button::A => script.a = press,
            Button::B => script.b = press,
        }
    }

    pub fn release_all(&self) {
        self.set(Button::A, Press::Released);
        self.set(Button::B, Press::Released);
    }

    pub fn set_sample(&self, sample: u16) {
        self.script.borrow_mut().sample = sample;
    }

    pub fn samples_read(&self) -> usize {
        self.script.borrow().samples_read
    }
}

impl InputSource for ScriptedInput {
    fn is_pressed(&mut self, button: Button) -> bool {
        let script = self.script.borrow();
        let press = match button {
            Button::A => script.a,
            Button::B => script.b,
        };
        press.at(self.clock.now())
    }

    fn read_raw_sample(&mut self) -> u16 {
        let mut script = self.script.borrow_mut();
        script.samples_read += 1;
        script.sample
    }
}

/// GPIO whose level can be flipped from the test. `true` is high.
#[derive(Clone)]
pub struct FakePin {
    high: Rc<Cell<bool>>,
}

impl FakePin {
    pub fn new(high: bool) -> Self {
        Self { high: Rc::new(Cell::new(high)) }
    }

    pub fn get(&self) -> bool {
        self.high.get()
    }

    pub fn set(&self, high: bool) {
        self.high.set(high);
    }
}

impl ErrorType for FakePin {
    type Error = Infallible;
}

impl InputPin for FakePin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high.get())
    }
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high.set(true);
        Ok(())
    }
}

pub struct FixedSample(pub u16);

impl SampleSource for FixedSample {
    fn read_sample(&mut self) -> u16 {
        self.0
    }
}
