use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Every simulation quantity (torque, RPM, liters, durability, dt) is a
/// `Fixed64` so that two runs with the same inputs are bit-identical.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Ratios with a magnitude below this are treated as "no coupling".
pub const RATIO_EPSILON: Fixed64 = Fixed64::from_bits(0x0041_8937); // ~0.001

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display/logging, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Clamp `v` into `[lo, hi]`.
#[inline]
pub fn clamp(v: Fixed64, lo: Fixed64, hi: Fixed64) -> Fixed64 {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}

/// Clamp `v` into `[0, 1]`.
#[inline]
pub fn clamp01(v: Fixed64) -> Fixed64 {
    clamp(v, Fixed64::ZERO, Fixed64::ONE)
}

/// Returns true if `|v| < RATIO_EPSILON`.
#[inline]
pub fn is_near_zero(v: Fixed64) -> bool {
    v.abs() < RATIO_EPSILON
}

/// Checked division that returns `None` for a near-zero divisor.
#[inline]
pub fn guarded_div(a: Fixed64, b: Fixed64) -> Option<Fixed64> {
    if is_near_zero(b) {
        None
    } else {
        a.checked_div(b)
    }
}
