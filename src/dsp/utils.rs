/// Smallest linear level treated as non-silent before dB conversion.
pub const DB_EPS: f32 = 1e-10;

/// Floor for every dB conversion in the signal path.
pub const MIN_DB: f32 = -100.0;

/// Per-sample coefficient for a one-pole follower with the given time constant.
///
/// `coeff = 1 - exp(-1 / (sr * ms * 0.001))`, applied as
/// `state += coeff * (target - state)`.
#[inline]
pub fn one_pole_coeff(time_ms: f32, sample_rate: f32) -> f32 {
    let samples = (sample_rate * time_ms * 0.001).max(DB_EPS);
    1.0 - (-1.0 / samples).exp()
}

/// Linear gain to dB, floored at [`MIN_DB`] (never `-inf`).
#[inline]
pub fn lin_to_db(x: f32) -> f32 {
    if x <= 0.0 {
        return MIN_DB;
    }
    (20.0 * x.log10()).max(MIN_DB)
}

#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    10.0f32.powf(db / 20.0)
}
