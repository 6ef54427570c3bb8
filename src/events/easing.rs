// src/events/easing.rs

//! Easing curves for progressive events. Every curve maps step `k` of `n` to
//! a cumulative progress in `[0, 1]`, is non-decreasing in `k`, and reaches
//! exactly `1.0` at `k == n`.

use serde::{Deserialize, Serialize};

/// End of the slow "research" stretch of [`EasingKind::Piecewise`].
const RESEARCH_END: (f64, f64) = (0.3, 0.1);
/// End of the "breakthrough" jump.
const BREAKTHROUGH_END: (f64, f64) = (0.5, 0.6);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EasingKind {
    Linear,
    /// S-curve centred on the midpoint.
    Logistic { steepness: f64 },
    /// Slow start, fast finish.
    Exponential { rate: f64 },
    /// Fast start, slow finish.
    LogSaturating { rate: f64 },
    /// Research, then breakthrough, then rollout.
    Piecewise,
}

impl EasingKind {
    pub fn progress(&self, step: u32, total_steps: u32) -> f64 {
        if total_steps == 0 || step >= total_steps {
            return 1.0;
        }
        let t = f64::from(step) / f64::from(total_steps);
        let eased = match *self {
            EasingKind::Linear => t,
            EasingKind::Logistic { steepness } => {
                let k = steepness.max(f64::EPSILON);
                let sigmoid = |x: f64| 1.0 / (1.0 + (-k * (x - 0.5)).exp());
                let (lo, hi) = (sigmoid(0.0), sigmoid(1.0));
                (sigmoid(t) - lo) / (hi - lo)
            }
            EasingKind::Exponential { rate } => {
                if rate.abs() < 1e-9 {
                    t
                } else {
                    (rate * t).exp_m1() / rate.exp_m1()
                }
            }
            EasingKind::LogSaturating { rate } => {
                if rate <= 1e-9 {
                    t
                } else {
                    (rate * t).ln_1p() / rate.ln_1p()
                }
            }
            EasingKind::Piecewise => piecewise(t),
        };
        if eased.is_finite() {
            eased.clamp(0.0, 1.0)
        } else {
            t
        }
    }
}

fn piecewise(t: f64) -> f64 {
    let lerp = |(x0, y0): (f64, f64), (x1, y1): (f64, f64), x: f64| {
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    };
    if t <= RESEARCH_END.0 {
        lerp((0.0, 0.0), RESEARCH_END, t)
    } else if t <= BREAKTHROUGH_END.0 {
        lerp(RESEARCH_END, BREAKTHROUGH_END, t)
    } else {
        lerp(BREAKTHROUGH_END, (1.0, 1.0), t)
    }
}
