use chrono::Utc;
use rand::Rng;

use crate::db_types::OrderId;

pub const DEFAULT_ORDER_ID_PREFIX: &str = "AVIRA";

/// Generates a human-readable order id of the form `{prefix}-{unix millis}-{random}`.
///
/// The millisecond timestamp keeps ids ordered and the six-digit random suffix separates orders created in the same
/// millisecond. The storage layer still enforces uniqueness.
pub fn generate_order_id(prefix: &str) -> OrderId {
    let millis = Utc::now().timestamp_millis();
    let suffix = rand::thread_rng().gen_range(0..1_000_000);
    OrderId(format!("{prefix}-{millis}-{suffix:06}"))
}
