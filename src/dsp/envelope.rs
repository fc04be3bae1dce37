//! Breakpoint envelopes with AudioParam-style set / linear / exponential
//! segments, evaluated at absolute times in seconds.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment {
    Set,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    time: f64,
    value: f64,
    segment: Segment,
}

/// A parameter automation curve.
///
/// A `Set` breakpoint jumps to its value at its time. `Linear` and
/// `Exponential` breakpoints ramp from the previous breakpoint so that
/// they arrive at their value exactly at their time. After the last
/// breakpoint the value holds.
#[derive(Debug, Clone)]
pub struct Envelope {
    initial: f64,
    points: Vec<Breakpoint>,
}

impl Envelope {
    pub fn new(initial: f64) -> Self {
        Envelope {
            initial,
            points: Vec::new(),
        }
    }

    pub fn set_value_at_time(self, value: f64, time: f64) -> Self {
        self.push(Segment::Set, value, time)
    }

    pub fn linear_ramp_to_value_at_time(self, value: f64, time: f64) -> Self {
        self.push(Segment::Linear, value, time)
    }

    pub fn exponential_ramp_to_value_at_time(self, value: f64, time: f64) -> Self {
        self.push(Segment::Exponential, value, time)
    }

    fn push(mut self, segment: Segment, value: f64, time: f64) -> Self {
        // Stable insert keeps same-time breakpoints in call order
        let at = self.points.partition_point(|p| p.time <= time);
        self.points.insert(
            at,
            Breakpoint {
                time,
                value,
                segment,
            },
        );
        self
    }

    /// Value of the curve at `t` seconds.
    pub fn value_at(&self, t: f64) -> f64 {
        let (mut prev_time, mut prev_value) = (0.0, self.initial);

        for p in &self.points {
            if p.time <= t {
                prev_time = p.time;
                prev_value = p.value;
                continue;
            }

            let span = p.time - prev_time;
            let progress = if span > 0.0 { (t - prev_time) / span } else { 1.0 };
            return match p.segment {
                Segment::Set => prev_value,
                Segment::Linear => prev_value + (p.value - prev_value) * progress,
                Segment::Exponential => {
                    // Undefined through zero or across a sign change; hold instead
                    if prev_value == 0.0 || p.value == 0.0 || prev_value.signum() != p.value.signum() {
                        prev_value
                    } else {
                        prev_value * (p.value / prev_value).powf(progress)
                    }
                }
            };
        }

        prev_value
    }
}
