use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum StrokeError {
    #[error("Deform weight count {weights} does not match point count {points}")]
    DeformLength { points: usize, weights: usize },
    #[error("Index range {from}..={to} outside stroke of {len} points")]
    RangeOutOfBounds { from: usize, to: usize, len: usize },
}

/// Check that an optional deform buffer lines up with the points
pub fn check_deform_length(points: usize, weights: Option<usize>) -> Result<(), StrokeError> {
    match weights {
        Some(weights) if weights != points => Err(StrokeError::DeformLength { points, weights }),
        _ => Ok(()),
    }
}

/// Check that `from..=to` addresses existing points
pub fn check_range(from: usize, to: usize, len: usize) -> Result<(), StrokeError> {
    if from > to || to >= len {
        return Err(StrokeError::RangeOutOfBounds { from, to, len });
    }
    Ok(())
}
