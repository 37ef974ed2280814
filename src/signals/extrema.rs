//! Best buy/sell selection: global minimum and maximum of a trajectory.

use crate::error::ForecastError;
use crate::models::forecast::{ExtremumPoint, PointKind, Trajectory};

/// Single linear scan returning `(buy, sell)`.
///
/// The first occurrence wins ties on both sides. An empty trajectory, or one
/// carrying a non-finite price, has no meaningful extremum.
pub fn select_extrema(
    trajectory: &Trajectory,
) -> Result<(ExtremumPoint, ExtremumPoint), ForecastError> {
    let steps = trajectory.steps();
    let first = steps.first().ok_or(ForecastError::EmptyTrajectory)?;
    if steps.iter().any(|s| !s.price.is_finite()) {
        return Err(ForecastError::EmptyTrajectory);
    }

    let mut min_idx = 0;
    let mut max_idx = 0;
    let mut min_price = first.price;
    let mut max_price = first.price;

    for (idx, step) in steps.iter().enumerate().skip(1) {
        if step.price < min_price {
            min_price = step.price;
            min_idx = idx;
        }
        if step.price > max_price {
            max_price = step.price;
            max_idx = idx;
        }
    }

    let buy = ExtremumPoint {
        timestamp: steps[min_idx].timestamp,
        price: min_price,
        kind: PointKind::Buy,
        index: min_idx,
    };
    let sell = ExtremumPoint {
        timestamp: steps[max_idx].timestamp,
        price: max_price,
        kind: PointKind::Sell,
        index: max_idx,
    };
    Ok((buy, sell))
}
