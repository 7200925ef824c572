mod order_id;
pub mod signature;

pub use order_id::{generate_order_id, DEFAULT_ORDER_ID_PREFIX};
pub use signature::{
    calculate_hmac,
    payment_signature,
    verify_payment_signature,
    verify_webhook_signature,
    SignatureError,
    WEBHOOK_SIGNATURE_HEADER,
};
