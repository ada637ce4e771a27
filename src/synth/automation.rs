/// A single timed change on a parameter timeline. Times are seconds on the audio clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`
    Set { time: f64, value: f32 },
    /// Linear ramp from the previous event, reaching `value` at `time`
    LinearTo { time: f64, value: f32 },
    /// Exponential ramp from the previous event, reaching `value` at `time`
    ExponentialTo { time: f64, value: f32 },
    /// Starting at `time`, approach `target` exponentially with `time_constant`
    Target {
        time: f64,
        target: f32,
        time_constant: f64,
    },
}

impl AutomationEvent {
    pub fn time(&self) -> f64 {
        match *self {
            AutomationEvent::Set { time, .. }
            | AutomationEvent::LinearTo { time, .. }
            | AutomationEvent::ExponentialTo { time, .. }
            | AutomationEvent::Target { time, .. } => time,
        }
    }
}

/// Parameter timeline evaluated per sample on the audio thread.
///
/// Built once at trigger time and never mutated after the voice is handed to the graph.
/// Events are kept ordered by time; events sharing a time keep insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Automation {
    initial: f32,
    events: Vec<AutomationEvent>,
}

/// Segment in effect between two events
#[derive(Clone, Copy)]
struct Anchor {
    time: f64,
    value: f32,
    /// Active exponential approach: (target, time constant)
    target: Option<(f32, f64)>,
}

impl Anchor {
    fn value_at(&self, t: f64) -> f32 {
        match self.target {
            None => self.value,
            Some((target, tau)) => {
                let elapsed = (t - self.time).max(0.0);
                target + (self.value - target) * (-elapsed / tau).exp() as f32
            }
        }
    }
}

impl Automation {
    pub fn new(initial: f32) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    pub fn constant(value: f32) -> Self {
        Self::new(value)
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    pub fn initial(&self) -> f32 {
        self.initial
    }

    fn insert(&mut self, event: AutomationEvent) -> &mut Self {
        let at = self
            .events
            .partition_point(|existing| existing.time() <= event.time());
        self.events.insert(at, event);
        self
    }

    pub fn set(&mut self, time: f64, value: f32) -> &mut Self {
        self.insert(AutomationEvent::Set { time, value })
    }

    pub fn linear_to(&mut self, time: f64, value: f32) -> &mut Self {
        self.insert(AutomationEvent::LinearTo { time, value })
    }

    pub fn exponential_to(&mut self, time: f64, value: f32) -> &mut Self {
        self.insert(AutomationEvent::ExponentialTo { time, value })
    }

    pub fn target(&mut self, time: f64, target: f32, time_constant: f64) -> &mut Self {
        self.insert(AutomationEvent::Target {
            time,
            target,
            time_constant: time_constant.max(1e-6),
        })
    }

    /// Value of the parameter at time `t`
    pub fn value_at(&self, t: f64) -> f32 {
        let mut anchor = Anchor {
            time: f64::NEG_INFINITY,
            value: self.initial,
            target: None,
        };

        for event in &self.events {
            match *event {
                AutomationEvent::Set { time, value } => {
                    if t < time {
                        return anchor.value_at(t);
                    }
                    anchor = Anchor {
                        time,
                        value,
                        target: None,
                    };
                }
                AutomationEvent::LinearTo { time, value } => {
                    if t < time {
                        let start = anchor.value_at(anchor.time);
                        let span = time - anchor.time;
                        if !span.is_finite() || span <= 0.0 {
                            return start;
                        }
                        let frac = ((t - anchor.time) / span) as f32;
                        return start + (value - start) * frac;
                    }
                    anchor = Anchor {
                        time,
                        value,
                        target: None,
                    };
                }
                AutomationEvent::ExponentialTo { time, value } => {
                    if t < time {
                        let start = anchor.value_at(anchor.time);
                        let span = time - anchor.time;
                        // Geometric interpolation needs both ends nonzero with the same sign
                        if !span.is_finite() || span <= 0.0 || start * value <= 0.0 {
                            return start;
                        }
                        let frac = (t - anchor.time) / span;
                        return start * (value / start).powf(frac as f32);
                    }
                    anchor = Anchor {
                        time,
                        value,
                        target: None,
                    };
                }
                AutomationEvent::Target {
                    time,
                    target,
                    time_constant,
                } => {
                    if t < time {
                        return anchor.value_at(t);
                    }
                    anchor = Anchor {
                        time,
                        value: anchor.value_at(time),
                        target: Some((target, time_constant)),
                    };
                }
            }
        }

        anchor.value_at(t)
    }
}
