//! Torque curve sampling.

use kitcar_core::definition::TorquePoint;
use kitcar_core::fixed::Fixed64;

/// Full-throttle torque at `rpm`, linearly interpolated between samples.
///
/// Outside the sampled range the nearest end value holds. An empty curve
/// yields zero.
pub fn sample(curve: &[TorquePoint], rpm: Fixed64) -> Fixed64 {
    let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
        return Fixed64::ZERO;
    };
    if rpm <= first.rpm {
        return first.torque;
    }
    if rpm >= last.rpm {
        return last.torque;
    }
    for pair in curve.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if rpm <= b.rpm {
            let span = b.rpm - a.rpm;
            if span <= Fixed64::ZERO {
                return b.torque;
            }
            let t = (rpm - a.rpm) / span;
            return a.torque + (b.torque - a.torque) * t;
        }
    }
    last.torque
}

/// Highest torque anywhere on the curve.
pub fn peak(curve: &[TorquePoint]) -> Fixed64 {
    curve
        .iter()
        .map(|p| p.torque)
        .max()
        .unwrap_or(Fixed64::ZERO)
}
