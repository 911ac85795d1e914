//! Decade bucket computation for accepted age estimates.

use agegate_types::{BUCKET_WIDTH, DisplayBucket};

/// Compute the display bucket for a raw age estimate.
///
/// The value is the floored estimate. Boundaries use floor division, so
/// `lower <= value < upper` also holds for negative estimates. No upper
/// clamp is applied: the panel clips its own indicator. Estimates beyond
/// the `i64` range saturate.
///
/// An absent or non-finite estimate yields the all-zero
/// [`DisplayBucket::IDLE`], so a malformed reading shows as `0` with no
/// decade.
pub fn bucket(raw_age: Option<f64>) -> DisplayBucket {
    let Some(age) = raw_age.filter(|age| age.is_finite()) else {
        return DisplayBucket::IDLE;
    };
    let value = floor_to_i64(age);
    let lower = value.div_euclid(BUCKET_WIDTH).saturating_mul(BUCKET_WIDTH);
    DisplayBucket {
        value,
        lower,
        upper: lower.saturating_add(BUCKET_WIDTH),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn floor_to_i64(age: f64) -> i64 {
    // Float-to-int `as` saturates at the i64 bounds.
    age.floor() as i64
}
