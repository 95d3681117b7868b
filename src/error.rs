use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatchError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("arithmetic overflow: {lhs} {op} {rhs} does not fit in i32")]
    ArithmeticOverflow {
        op: &'static str,
        lhs: i64,
        rhs: i64,
    },

    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
}

impl MatchError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}

pub(crate) fn checked_shift(value: i32, delta: i64) -> Result<i32> {
    i64::from(value)
        .checked_add(delta)
        .and_then(|shifted| i32::try_from(shifted).ok())
        .ok_or(MatchError::ArithmeticOverflow {
            op: if delta < 0 { "-" } else { "+" },
            lhs: value.into(),
            rhs: delta.saturating_abs(),
        })
}

pub(crate) fn checked_sub(lhs: i32, rhs: i32) -> Result<i32> {
    lhs.checked_sub(rhs).ok_or(MatchError::ArithmeticOverflow {
        op: "-",
        lhs: lhs.into(),
        rhs: rhs.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_arithmetic_reports_operands() {
        assert_eq!(checked_shift(1, 2), Ok(3));
        assert_eq!(checked_shift(5, -7), Ok(-2));
        assert_eq!(
            checked_shift(i32::MAX, 1),
            Err(MatchError::ArithmeticOverflow {
                op: "+",
                lhs: i32::MAX as i64,
                rhs: 1,
            })
        );
        assert!(matches!(
            checked_sub(i32::MIN, 1),
            Err(MatchError::ArithmeticOverflow { op: "-", .. })
        ));
        assert!(matches!(
            checked_shift(i32::MIN, -1),
            Err(MatchError::ArithmeticOverflow { op: "-", rhs: 1, .. })
        ));
    }
}
