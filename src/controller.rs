//! Cooperative main loop.
//!
//! [`ModeController::step`] performs one unit of work for the active mode
//! (a menu poll, a visualizer frame or one SOS iteration), turns what it saw
//! into a [`ModeEvent`], dispatches it to the mode FSM and then applies the
//! effects the FSM's entry actions asked for.

use embedded_hal::delay::DelayNs;

use crate::audio_level::{render_level, AudioLevelPipeline, FilterState};
use crate::config::{ControllerTiming, PanelConfig};
use crate::mode_fsm::{Effects, Mode, ModeContext, ModeEvent, ModeFsm};
use crate::peripherals::{
    AlarmOutput, Button, Clock, IndicatorMatrix, InputSource, Rgb, StatusDisplay,
};
use crate::signal_encoder::{SignalEncoder, SosPhase};

/// Everything the controller drives.
pub struct Peripherals<I, M, A, T, S> {
    pub input: I,
    pub matrix: M,
    pub alarm: A,
    pub timer: T,
    pub display: S,
}

pub struct ModeController<I, M, A, T, S> {
    fsm: ModeFsm,
    ctx: ModeContext,
    pipeline: AudioLevelPipeline,
    encoder: SignalEncoder,
    timing: ControllerTiming,
    io: Peripherals<I, M, A, T, S>,
}

impl<I, M, A, T, S> ModeController<I, M, A, T, S>
where
    I: InputSource,
    M: IndicatorMatrix,
    A: AlarmOutput,
    T: DelayNs + Clock,
    S: StatusDisplay,
{
    /// Enters `Menu`: alarm off, matrix blank, menu screen shown.
    pub fn new(io: Peripherals<I, M, A, T, S>, config: PanelConfig) -> Self {
        let mut controller = Self {
            fsm: ModeFsm::Menu,
            ctx: ModeContext::default(),
            pipeline: AudioLevelPipeline::new(config.level),
            encoder: SignalEncoder::new(config.encoder),
            timing: config.controller,
            io,
        };
        controller.ctx.now_ms = controller.io.timer.now_ms();
        controller.fsm.init(&mut controller.ctx);
        // No button was pressed at power-up, so there is nothing to settle
        let boot = Effects { settle: false, ..controller.ctx.take_effects() };
        controller.apply_effects(boot);
        controller
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.fsm.mode()
    }

    #[must_use]
    pub fn filter_state(&self) -> FilterState {
        self.pipeline.state()
    }

    /// Runs the active mode once and returns the mode afterwards.
    pub fn step(&mut self) -> Mode {
        let event = match self.fsm.mode() {
            Mode::Menu => self.poll_menu(),
            Mode::AudioVisualizer => self.visualizer_frame(),
            Mode::SosSignal => self.sos_iteration(),
        };
        self.dispatch(event)
    }

    fn poll_menu(&mut self) -> ModeEvent {
        if self.io.input.is_pressed(Button::A) {
            ModeEvent::ButtonA
        } else if self.io.input.is_pressed(Button::B) {
            ModeEvent::ButtonB
        } else {
            self.io.timer.delay_ms(self.timing.menu_poll_ms);
            ModeEvent::Tick
        }
    }

    fn visualizer_frame(&mut self) -> ModeEvent {
        if self.io.input.is_pressed(Button::B) {
            return ModeEvent::ButtonB;
        }
        let raw = self.io.input.read_raw_sample();
        let lit = self.pipeline.update(&mut self.io.matrix, raw);
        #[cfg(feature = "defmt")]
        defmt::trace!("raw={} lit={}", raw, lit);
        #[cfg(not(feature = "defmt"))]
        let _ = lit;
        self.io.timer.delay_ms(self.timing.frame_ms);
        ModeEvent::Tick
    }

    /// One pass of the SOS pattern, in whichever phase applies right now.
    fn sos_iteration(&mut self) -> ModeEvent {
        if self.io.input.is_pressed(Button::A) {
            return ModeEvent::ButtonA;
        }

        let elapsed = self.io.timer.now_ms().wrapping_sub(self.ctx.sos_started_ms);
        let phase = SosPhase::at(elapsed, self.timing.full_pattern_window_ms);

        let Peripherals { input, alarm, timer, .. } = &mut self.io;
        let cancel = || input.is_pressed(Button::A);
        let cancelled = match phase {
            SosPhase::FullPattern => self.encoder.run_full_pattern(alarm, timer, cancel),
            SosPhase::ContinuousAlarm => {
                alarm.set_audible(true);
                self.encoder.run_led_only_pattern(alarm, timer, cancel)
            }
        };

        if cancelled { ModeEvent::ButtonA } else { ModeEvent::Tick }
    }

    fn dispatch(&mut self, event: ModeEvent) -> Mode {
        #[cfg(feature = "defmt")]
        let before = self.fsm.mode();
        self.ctx.now_ms = self.io.timer.now_ms();
        self.fsm.dispatch(&mut self.ctx, &event);
        let after = self.fsm.mode();

        #[cfg(feature = "defmt")]
        if after != before {
            defmt::info!("{} -> {} on {}", before, after, event);
        }
        let effects = self.ctx.take_effects();
        self.apply_effects(effects);
        after
    }

    fn apply_effects(&mut self, effects: Effects) {
        let Effects { settle, alarm_off, clear_matrix, screen } = effects;
        if alarm_off {
            self.io.alarm.set_on(false);
        }
        if clear_matrix {
            let cells = self.pipeline.config().cell_count;
            render_level(&mut self.io.matrix, 0, cells, Rgb::OFF);
        }
        if let Some(screen) = screen {
            self.io.display.show(screen);
        }
        if settle {
            self.io.timer.delay_ms(self.timing.settle_ms);
        }
    }
}
