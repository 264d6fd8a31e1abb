//! Checkout pipeline: cart snapshot + payment proof -> pending order
//!
//! The order is persisted first and the cart is cleared only after the gateway
//! acknowledges the write. A failed submission leaves the cart exactly as it
//! was, so the whole call can be repeated.
use super::cart::{Cart, CartItem};
use super::error::{Result, ValidationError};
use super::order::Order;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Wire shape of an order submission (`POST /api/orders`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OrderSubmission {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    pub items: Vec<CartItem>,
    pub total_cents: u64,
    #[serde(default)]
    pub screenshot: String,
}

/// The persistence boundary an order is written through.
pub trait OrderGateway {
    fn submit_order(&self, submission: &OrderSubmission) -> Result<Order>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// Order recorded; the buyer waits for manual payment verification.
    PendingVerification(Order),
}

pub fn require_payment_proof(reference: &str) -> Result<&str, ValidationError> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(ValidationError::MissingPaymentProof);
    }
    Ok(reference)
}

#[instrument(name = "checkout::run", skip(cart, gateway), fields(lines = cart.items().len()))]
pub fn checkout<G: OrderGateway>(
    cart: &mut Cart,
    customer_email: &str,
    payment_proof: &str,
    gateway: &G,
) -> Result<CheckoutOutcome> {
    // both are rejected before the gateway is touched
    let payment_proof = require_payment_proof(payment_proof)?;
    let (items, total_cents) = cart.snapshot()?;

    let submission = OrderSubmission {
        customer_email: Some(customer_email.to_string()),
        items,
        total_cents,
        screenshot: payment_proof.to_string(),
    };

    match gateway.submit_order(&submission) {
        Ok(order) => {
            cart.clear();
            info!(order_id = %order.id, total_cents, "order submitted, awaiting verification");
            Ok(CheckoutOutcome::PendingVerification(order))
        }
        Err(e) => {
            warn!(error = %e, retryable = e.is_retryable(), "order submission failed; cart kept");
            Err(e)
        }
    }
}
