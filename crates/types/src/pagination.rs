use serde::{Deserialize, Serialize};
use txidx_errors::CoreError;

/// Sort order for a paginated transaction query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    /// Ascending by block number.
    Asc,
    /// Descending by block number.
    Desc,
}

impl Order {
    /// SQL-safe fragment for this order. Not used to interpolate untrusted
    /// input -- `Order` is a closed enum, so this is always one of two
    /// fixed literals.
    pub const fn sql_keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Lowercase wire form, used for cache keys and the explorer's `sort`
    /// query parameter.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Validated pagination parameters for `get_transactions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationParams {
    page: u32,
    limit: u32,
    order: Order,
}

impl PaginationParams {
    /// The requested page, 1-based.
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// The requested page size.
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// The requested sort order.
    pub const fn order(&self) -> Order {
        self.order
    }

    /// Row offset for this page, given `limit`.
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

/// Validate pagination parameters: `1 <= limit <= 1000`, `1 <= page`.
pub fn validate_pagination(page: u32, limit: u32, order: Order) -> Result<PaginationParams, CoreError> {
    if page < 1 {
        return Err(CoreError::InvalidInput("page must be >= 1".into()));
    }
    if !(1..=1000).contains(&limit) {
        return Err(CoreError::InvalidInput("limit must be between 1 and 1000".into()));
    }
    Ok(PaginationParams { page, limit, order })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_page() {
        assert!(validate_pagination(0, 10, Order::Asc).is_err());
    }

    #[test]
    fn rejects_out_of_range_limit() {
        assert!(validate_pagination(1, 0, Order::Asc).is_err());
        assert!(validate_pagination(1, 1001, Order::Asc).is_err());
    }

    #[test]
    fn accepts_boundary_limits() {
        assert!(validate_pagination(1, 1, Order::Asc).is_ok());
        assert!(validate_pagination(1, 1000, Order::Asc).is_ok());
    }

    #[test]
    fn offset_is_zero_based() {
        let p = validate_pagination(1, 50, Order::Asc).unwrap();
        assert_eq!(p.offset(), 0);
        let p2 = validate_pagination(3, 50, Order::Asc).unwrap();
        assert_eq!(p2.offset(), 100);
    }
}
