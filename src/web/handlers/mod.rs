pub mod auth_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod upload_handlers;

use crate::error::StorefrontError;
use std::str::FromStr;

// Ids in paths that do not parse cannot name an existing record.
pub(crate) fn parse_path_id<T: FromStr>(raw: &str, what: &str) -> Result<T, StorefrontError> {
    raw.parse()
        .map_err(|_| StorefrontError::NotFound(format!("{what} {raw}")))
}
