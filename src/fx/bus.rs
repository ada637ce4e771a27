use serde::{Deserialize, Serialize};
use tracing::debug;

use super::delay::{Delay, MAX_DELAY_SECS, MAX_FEEDBACK};
use super::drive::{DriveCurve, WaveShaper};
use super::limiter::Limiter;
use crate::command::{CommandSender, GraphCommand};

/// Control-side parameter state of the effects bus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsBusState {
    pub master_gain: f32,
    pub drive: f32,
    pub delay_time: f32,
    pub delay_feedback: f32,
    pub delay_mix: f32,
    pub metronome_gain: f32,
}

impl Default for EffectsBusState {
    fn default() -> Self {
        Self {
            master_gain: 0.92,
            drive: 0.25,
            delay_time: 0.25,
            delay_feedback: 0.25,
            delay_mix: 0.15,
            metronome_gain: 0.0,
        }
    }
}

/// `value` clamped into `[lo, hi]`, or None when it is NaN or infinite
fn finite_clamp(value: f32, lo: f32, hi: f32) -> Option<f32> {
    value.is_finite().then(|| value.clamp(lo, hi))
}

impl EffectsBusState {
    /// Copy with every field forced into its legal range. Non-finite fields take the default.
    pub fn clamped(&self) -> Self {
        let d = Self::default();
        Self {
            master_gain: finite_clamp(self.master_gain, 0.0, 1.0).unwrap_or(d.master_gain),
            drive: finite_clamp(self.drive, 0.0, 1.0).unwrap_or(d.drive),
            delay_time: finite_clamp(self.delay_time, 0.0, MAX_DELAY_SECS).unwrap_or(d.delay_time),
            delay_feedback: finite_clamp(self.delay_feedback, 0.0, MAX_FEEDBACK)
                .unwrap_or(d.delay_feedback),
            delay_mix: finite_clamp(self.delay_mix, 0.0, 1.0).unwrap_or(d.delay_mix),
            metronome_gain: finite_clamp(self.metronome_gain, 0.0, 1.0)
                .unwrap_or(d.metronome_gain),
        }
    }
}

/// Owner of the bus parameters on the control thread.
///
/// Setters clamp, compare against the current value, and only talk to the audio graph when
/// something actually changed. NaN or infinite input leaves the current value in place. The drive curve is the one derived resource; it is rebuilt
/// here and shipped to the graph ready to use.
pub struct EffectsBus {
    state: EffectsBusState,
    curve: DriveCurve,
    sender: Option<CommandSender>,
}

impl EffectsBus {
    pub fn new(initial: EffectsBusState) -> Self {
        let state = initial.clamped();
        Self {
            curve: DriveCurve::new(state.drive),
            state,
            sender: None,
        }
    }

    /// Connect to a running graph. Until attached, setters only update local state.
    pub fn attach(&mut self, sender: CommandSender) {
        self.sender = Some(sender);
    }

    pub fn detach(&mut self) {
        self.sender = None;
    }

    pub fn state(&self) -> &EffectsBusState {
        &self.state
    }

    pub fn curve(&self) -> &DriveCurve {
        &self.curve
    }

    fn emit(&self, cmd: GraphCommand) {
        if let Some(sender) = &self.sender {
            sender.send(cmd);
        }
    }

    pub fn set_master_gain(&mut self, gain: f32) -> bool {
        let Some(gain) = finite_clamp(gain, 0.0, 1.0) else {
            return false;
        };
        if gain == self.state.master_gain {
            return false;
        }
        self.state.master_gain = gain;
        self.emit(GraphCommand::SetMasterGain(gain));
        true
    }

    pub fn set_drive_amount(&mut self, amount: f32) -> bool {
        let Some(amount) = finite_clamp(amount, 0.0, 1.0) else {
            return false;
        };
        if amount == self.state.drive {
            return false;
        }
        self.state.drive = amount;
        self.curve = DriveCurve::new(amount);
        debug!(amount, "drive curve regenerated");
        self.emit(GraphCommand::SetDrive {
            amount,
            curve: self.curve.clone(),
        });
        true
    }

    pub fn set_delay_time(&mut self, secs: f32) -> bool {
        let Some(secs) = finite_clamp(secs, 0.0, MAX_DELAY_SECS) else {
            return false;
        };
        if secs == self.state.delay_time {
            return false;
        }
        self.state.delay_time = secs;
        self.emit(GraphCommand::SetDelayTime(secs));
        true
    }

    pub fn set_delay_feedback(&mut self, feedback: f32) -> bool {
        let Some(feedback) = finite_clamp(feedback, 0.0, MAX_FEEDBACK) else {
            return false;
        };
        if feedback == self.state.delay_feedback {
            return false;
        }
        self.state.delay_feedback = feedback;
        self.emit(GraphCommand::SetDelayFeedback(feedback));
        true
    }

    pub fn set_delay_mix(&mut self, mix: f32) -> bool {
        let Some(mix) = finite_clamp(mix, 0.0, 1.0) else {
            return false;
        };
        if mix == self.state.delay_mix {
            return false;
        }
        self.state.delay_mix = mix;
        self.emit(GraphCommand::SetDelayMix(mix));
        true
    }

    pub fn set_metronome_gain(&mut self, gain: f32) -> bool {
        let Some(gain) = finite_clamp(gain, 0.0, 1.0) else {
            return false;
        };
        if gain == self.state.metronome_gain {
            return false;
        }
        self.state.metronome_gain = gain;
        self.emit(GraphCommand::SetMetronomeGain(gain));
        true
    }
}

/// Audio-side bus DSP.
///
/// master -> drive gain -> waveshaper -> limiter
///                                   \-> delay (feedback) -> mix -> limiter
/// metronome -> metronome gain -> limiter
/// limiter -> output gain
pub struct BusProcessor {
    master_gain: f32,
    drive_gain: f32,
    shaper: WaveShaper,
    delay: Delay,
    delay_mix: f32,
    metronome_gain: f32,
    limiter: Limiter,
    output_gain: f32,
}

impl BusProcessor {
    pub fn new(sample_rate: f32, state: &EffectsBusState, curve: DriveCurve) -> Self {
        let state = state.clamped();
        let mut delay = Delay::new(sample_rate);
        delay.snap_time(state.delay_time);
        delay.set_feedback(state.delay_feedback);
        Self {
            master_gain: state.master_gain,
            drive_gain: state.drive,
            shaper: WaveShaper::new(curve),
            delay,
            delay_mix: state.delay_mix,
            metronome_gain: state.metronome_gain,
            limiter: Limiter::new(sample_rate),
            output_gain: 1.0,
        }
    }

    /// Apply a bus parameter command. Returns false for commands that are not bus parameters.
    pub fn apply(&mut self, cmd: GraphCommand) -> bool {
        match cmd {
            GraphCommand::SetMasterGain(v) => self.master_gain = v,
            GraphCommand::SetDrive { amount, curve } => {
                self.drive_gain = amount;
                self.shaper.set_curve(curve);
            }
            GraphCommand::SetDelayTime(v) => self.delay.set_time(v),
            GraphCommand::SetDelayFeedback(v) => self.delay.set_feedback(v),
            GraphCommand::SetDelayMix(v) => self.delay_mix = v,
            GraphCommand::SetMetronomeGain(v) => self.metronome_gain = v,
            _ => return false,
        }
        true
    }

    /// Process one sample of the master and metronome inputs
    pub fn process(&mut self, master_in: f32, metronome_in: f32) -> f32 {
        let driven = self
            .shaper
            .process(master_in * self.master_gain * self.drive_gain);
        let wet = self.delay.process(driven) * self.delay_mix;
        let sum = driven + wet + metronome_in * self.metronome_gain;
        self.limiter.process(sum) * self.output_gain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandBus;

    fn attached_bus() -> (EffectsBus, crate::command::CommandReceiver) {
        let commands = CommandBus::new();
        let mut bus = EffectsBus::new(EffectsBusState::default());
        bus.attach(commands.sender());
        (bus, commands.receiver())
    }

    #[test]
    fn test_setters_are_idempotent() {
        let (mut bus, rx) = attached_bus();
        assert!(bus.set_delay_mix(0.4));
        assert!(!bus.set_delay_mix(0.4));
        assert!(!bus.set_delay_time(0.25));
        assert_eq!(rx.pending(), 1);
    }

    #[test]
    fn test_clamped_values_compare_after_clamping() {
        let (mut bus, rx) = attached_bus();
        assert!(bus.set_delay_feedback(2.0));
        assert_eq!(bus.state().delay_feedback, MAX_FEEDBACK);
        // Still 0.95 after clamping, so nothing new goes out
        assert!(!bus.set_delay_feedback(5.0));
        assert_eq!(rx.pending(), 1);
    }

    #[test]
    fn test_drive_change_regenerates_curve() {
        let (mut bus, rx) = attached_bus();
        let before = bus.curve().clone();
        assert!(bus.set_drive_amount(0.8));
        assert!(!before.shares_table_with(bus.curve()));
        match rx.try_recv() {
            Some(GraphCommand::SetDrive { amount, curve }) => {
                assert_eq!(amount, 0.8);
                assert!(curve.shares_table_with(bus.curve()));
            }
            other => panic!("unexpected {:?}", other.map(|c| c.description())),
        }
        let current = bus.curve().clone();
        assert!(!bus.set_drive_amount(0.8));
        assert!(current.shares_table_with(bus.curve()));
    }

    #[test]
    fn test_non_finite_settings_keep_current_values() {
        let (mut bus, rx) = attached_bus();
        let before = *bus.state();
        assert!(!bus.set_drive_amount(f32::NAN));
        assert!(!bus.set_delay_time(f32::NAN));
        assert!(!bus.set_delay_feedback(f32::INFINITY));
        assert!(!bus.set_delay_mix(f32::NEG_INFINITY));
        assert!(!bus.set_master_gain(f32::NAN));
        assert!(!bus.set_metronome_gain(f32::NAN));
        assert_eq!(*bus.state(), before);
        assert_eq!(rx.pending(), 0);
        assert!(bus.set_drive_amount(0.5));
        assert_eq!(bus.state().drive, 0.5);
    }

    #[test]
    fn test_clamped_state_replaces_nan_fields() {
        let state = EffectsBusState {
            drive: f32::NAN,
            delay_time: f32::INFINITY,
            ..EffectsBusState::default()
        }
        .clamped();
        assert_eq!(state, EffectsBusState::default());
    }

    #[test]
    fn test_processor_output_stays_finite_after_nan_commands() {
        let state = EffectsBusState::default();
        let mut bus = BusProcessor::new(1000.0, &state, DriveCurve::new(state.drive));
        bus.apply(GraphCommand::SetDelayTime(f32::NAN));
        bus.apply(GraphCommand::SetDelayFeedback(f32::NAN));
        for i in 0..2000 {
            let y = bus.process(if i % 50 == 0 { 0.8 } else { 0.0 }, 0.0);
            assert!(y.is_finite() && y.abs() <= 1.0);
        }
    }

    #[test]
    fn test_detached_bus_updates_state_only() {
        let mut bus = EffectsBus::new(EffectsBusState::default());
        assert!(bus.set_metronome_gain(0.5));
        assert_eq!(bus.state().metronome_gain, 0.5);
    }

    #[test]
    fn test_processor_silent_in_silent_out() {
        let state = EffectsBusState::default();
        let mut bus = BusProcessor::new(44100.0, &state, DriveCurve::new(state.drive));
        for _ in 0..1000 {
            // The curve's centre sits half a table step off zero
            assert!(bus.process(0.0, 0.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_metronome_muted_by_default() {
        let state = EffectsBusState::default();
        let mut bus = BusProcessor::new(44100.0, &state, DriveCurve::new(state.drive));
        for _ in 0..1000 {
            assert!(bus.process(0.0, 1.0).abs() < 1e-3);
        }
        assert!(bus.apply(GraphCommand::SetMetronomeGain(1.0)));
        let peak = (0..1000)
            .map(|_| bus.process(0.0, 0.5).abs())
            .fold(0.0f32, f32::max);
        assert!(peak > 0.1);
    }

    #[test]
    fn test_zero_drive_silences_master_path() {
        let state = EffectsBusState {
            drive: 0.0,
            ..EffectsBusState::default()
        };
        let mut bus = BusProcessor::new(44100.0, &state, DriveCurve::new(0.0));
        for _ in 0..1000 {
            assert!(bus.process(0.8, 0.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_delay_echo_reaches_output() {
        let state = EffectsBusState {
            delay_time: 0.01,
            delay_mix: 1.0,
            delay_feedback: 0.0,
            ..EffectsBusState::default()
        };
        let sr = 1000.0;
        let mut bus = BusProcessor::new(sr, &state, DriveCurve::new(state.drive));
        let out: Vec<f32> = (0..40)
            .map(|i| bus.process(if i == 0 { 0.5 } else { 0.0 }, 0.0))
            .collect();
        assert!(out[0].abs() > 0.1);
        assert!(out[5].abs() < 1e-3);
        assert!(out[10].abs() > 0.1);
    }
}
