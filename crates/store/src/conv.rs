use txidx_errors::CoreError;

/// Postgres `BIGINT` is signed; block numbers and counts are unsigned in the
/// domain model. These helpers are the single place that conversion happens.
pub(crate) fn to_i64(value: u64) -> Result<i64, CoreError> {
    i64::try_from(value)
        .map_err(|_| CoreError::Internal(format!("{value} does not fit in a signed 64-bit column")))
}

pub(crate) fn to_i64_opt(value: Option<u64>) -> Result<Option<i64>, CoreError> {
    value.map(to_i64).transpose()
}

pub(crate) fn from_i64(value: i64) -> Result<u64, CoreError> {
    u64::try_from(value).map_err(|_| CoreError::Internal(format!("negative value {value} read back from a block/count column")))
}

pub(crate) fn from_i64_opt(value: Option<i64>) -> Result<Option<u64>, CoreError> {
    value.map(from_i64).transpose()
}

pub(crate) fn to_i32(value: u32) -> Result<i32, CoreError> {
    i32::try_from(value)
        .map_err(|_| CoreError::Internal(format!("{value} does not fit in a signed 32-bit column")))
}

pub(crate) fn from_i32(value: i32) -> Result<u32, CoreError> {
    u32::try_from(value).map_err(|_| CoreError::Internal(format!("negative value {value} read back from a count column")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_within_range() {
        assert_eq!(from_i64(to_i64(42).unwrap()).unwrap(), 42);
        assert_eq!(from_i32(to_i32(7).unwrap()).unwrap(), 7);
    }

    #[test]
    fn rejects_values_that_overflow_a_signed_column() {
        assert!(to_i64(u64::MAX).is_err());
        assert!(to_i32(u32::MAX).is_err());
    }

    #[test]
    fn rejects_negative_values_read_back() {
        assert!(from_i64(-1).is_err());
        assert!(from_i32(-1).is_err());
    }
}
