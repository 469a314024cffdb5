use typed_fsm::{state_machine, Transition};

use crate::peripherals::Screen;

/// Operating mode, as seen from outside the state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Menu,
    AudioVisualizer,
    SosSignal,
}

impl Mode {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Menu => "MENU",
            Self::AudioVisualizer => "AUDIO_VISUALIZER",
            Self::SosSignal => "SOS",
        }
    }
}

/// Peripheral work requested by entry actions, applied by the controller
/// right after the dispatch that caused it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Effects {
    pub settle: bool,
    pub alarm_off: bool,
    pub clear_matrix: bool,
    pub screen: Option<Screen>,
}

// FSM Context
#[derive(Debug, Default)]
pub struct ModeContext {
    pub now_ms: u32, // Timestamp of the event being dispatched
    pub sos_started_ms: u32,
    pub effects: Effects,
}

impl ModeContext {
    pub fn take_effects(&mut self) -> Effects {
        core::mem::take(&mut self.effects)
    }
}

// FSM Events
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ModeEvent {
    ButtonA,
    ButtonB,
    /// A frame or pattern iteration finished with no button involved.
    Tick,
}

state_machine! {
    Name: ModeFsm,
    Context: ModeContext,
    Event: ModeEvent,
    States: {
        Menu => {
            entry: |ctx| {
                ctx.effects.alarm_off = true;
                ctx.effects.clear_matrix = true;
                ctx.effects.screen = Some(Screen::Menu);
                ctx.effects.settle = true;
            }
            process: |_ctx, evt| {
                match evt {
                    ModeEvent::ButtonA => Transition::To(ModeFsm::AudioVisualizer),
                    ModeEvent::ButtonB => Transition::To(ModeFsm::SosSignal),
                    ModeEvent::Tick => Transition::None,
                }
            }
        },

        AudioVisualizer => {
            entry: |ctx| {
                ctx.effects.screen = Some(Screen::AudioVisualizer);
                ctx.effects.settle = true;
            }
            process: |_ctx, evt| {
                match evt {
                    ModeEvent::ButtonB => Transition::To(ModeFsm::Menu),
                    ModeEvent::ButtonA | ModeEvent::Tick => Transition::None,
                }
            }
        },

        SosSignal => {
            entry: |ctx| {
                ctx.sos_started_ms = ctx.now_ms; // Phase is measured from here
                ctx.effects.screen = Some(Screen::SosSignal);
                ctx.effects.settle = true;
            }
            process: |_ctx, evt| {
                match evt {
                    ModeEvent::ButtonA => Transition::To(ModeFsm::Menu),
                    ModeEvent::ButtonB | ModeEvent::Tick => Transition::None,
                }
            }
        }
    }
}

impl ModeFsm {
    #[must_use]
    pub fn mode(&self) -> Mode {
        match self {
            ModeFsm::Menu => Mode::Menu,
            ModeFsm::AudioVisualizer => Mode::AudioVisualizer,
            ModeFsm::SosSignal => Mode::SosSignal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started() -> (ModeFsm, ModeContext) {
        let mut ctx = ModeContext::default();
        let mut fsm = ModeFsm::Menu;
        fsm.init(&mut ctx);
        (fsm, ctx)
    }

    #[test]
    fn starts_in_menu_with_outputs_quiet() {
        let (fsm, mut ctx) = started();
        assert_eq!(fsm.mode(), Mode::Menu);
        let effects = ctx.take_effects();
        assert!(effects.alarm_off);
        assert!(effects.clear_matrix);
        assert_eq!(effects.screen, Some(Screen::Menu));
        assert_eq!(ctx.effects, Effects::default());
    }

    #[test]
    fn menu_buttons_pick_a_mode() {
        let (mut fsm, mut ctx) = started();
        fsm.dispatch(&mut ctx, &ModeEvent::ButtonA);
        assert_eq!(fsm.mode(), Mode::AudioVisualizer);

        let (mut fsm, mut ctx) = started();
        fsm.dispatch(&mut ctx, &ModeEvent::ButtonB);
        assert_eq!(fsm.mode(), Mode::SosSignal);
    }

    #[test]
    fn ticks_never_change_mode() {
        let (mut fsm, mut ctx) = started();
        fsm.dispatch(&mut ctx, &ModeEvent::Tick);
        assert_eq!(fsm.mode(), Mode::Menu);
        fsm.dispatch(&mut ctx, &ModeEvent::ButtonA);
        fsm.dispatch(&mut ctx, &ModeEvent::Tick);
        assert_eq!(fsm.mode(), Mode::AudioVisualizer);
    }

    #[test]
    fn each_mode_exits_on_its_own_button() {
        let (mut fsm, mut ctx) = started();
        fsm.dispatch(&mut ctx, &ModeEvent::ButtonA);
        fsm.dispatch(&mut ctx, &ModeEvent::ButtonA);
        assert_eq!(fsm.mode(), Mode::AudioVisualizer);
        fsm.dispatch(&mut ctx, &ModeEvent::ButtonB);
        assert_eq!(fsm.mode(), Mode::Menu);

        fsm.dispatch(&mut ctx, &ModeEvent::ButtonB);
        fsm.dispatch(&mut ctx, &ModeEvent::ButtonB);
        assert_eq!(fsm.mode(), Mode::SosSignal);
        fsm.dispatch(&mut ctx, &ModeEvent::ButtonA);
        assert_eq!(fsm.mode(), Mode::Menu);
    }

    #[test]
    fn sos_entry_stamps_start_time() {
        let (mut fsm, mut ctx) = started();
        ctx.take_effects();
        ctx.now_ms = 4321;
        fsm.dispatch(&mut ctx, &ModeEvent::ButtonB);

        assert_eq!(ctx.sos_started_ms, 4321);
        let effects = ctx.take_effects();
        assert!(effects.settle);
        assert!(!effects.alarm_off);
        assert_eq!(effects.screen, Some(Screen::SosSignal));
    }

    #[test]
    fn leaving_sos_silences_alarm() {
        let (mut fsm, mut ctx) = started();
        fsm.dispatch(&mut ctx, &ModeEvent::ButtonB);
        ctx.take_effects();
        fsm.dispatch(&mut ctx, &ModeEvent::ButtonA);
        assert!(ctx.take_effects().alarm_off);
    }
}
