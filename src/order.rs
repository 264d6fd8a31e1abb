//! Order records and the two-state approval machine
use super::cart::CartItem;
use super::types::{OrderId, TimeStamp};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(
    minicbor::Encode,
    minicbor::Decode,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Approved,
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "approved" => Ok(OrderStatus::Approved),
            other => Err(format!("unknown order status `{other}`")),
        }
    }
}

/// Outcome of applying an approval to a stored order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    AlreadyApproved,
}

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq,
)]
pub struct Order {
    #[n(0)]
    pub id: OrderId,
    #[n(1)]
    pub customer_email: String,
    #[n(2)]
    pub items: Vec<CartItem>, // frozen at checkout
    #[n(3)]
    pub total_cents: u64,
    #[n(4)]
    pub screenshot: String, // payment proof reference
    #[n(5)]
    pub status: OrderStatus,
    #[n(6)]
    pub created_at: TimeStamp,
}

impl Order {
    pub fn new_pending(
        customer_email: String,
        items: Vec<CartItem>,
        total_cents: u64,
        screenshot: String,
    ) -> Self {
        Self {
            id: OrderId::new(),
            customer_email,
            items,
            total_cents,
            screenshot,
            status: OrderStatus::Pending,
            created_at: TimeStamp::new(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.status == OrderStatus::Approved
    }

    /// The order as its buyer may see it. Download links stay hidden until approval.
    pub fn buyer_view(&self) -> Self {
        let mut view = self.clone();
        if !view.is_approved() {
            for item in &mut view.items {
                item.download_url = None;
            }
        }
        view
    }

    /// Pending -> Approved. There is no way back.
    pub fn approve(&mut self) -> Transition {
        match self.status {
            OrderStatus::Approved => Transition::AlreadyApproved,
            OrderStatus::Pending => {
                self.status = OrderStatus::Approved;
                Transition::Applied
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Order {
        Order::new_pending("buyer@example.com".into(), vec![], 0, "receipt.png".into())
    }

    #[test]
    fn new_orders_start_pending() {
        let order = pending();
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.is_approved());
    }

    #[test]
    fn approval_is_one_way_and_idempotent() {
        let mut order = pending();
        assert_eq!(order.approve(), Transition::Applied);
        let approved = order.clone();

        assert_eq!(order.approve(), Transition::AlreadyApproved);
        assert_eq!(order, approved);
    }

    #[test]
    fn buyer_view_withholds_links_until_approved() {
        let line = CartItem {
            product_id: crate::types::ProductId::new(),
            name: "Font Pack".into(),
            price_cents: 1_000,
            category: "Fonts".into(),
            image: "https://cdn.example/font.png".into(),
            additional_images: vec![],
            download_url: Some("https://files.example/font.zip".into()),
            quantity: 1,
        };
        let mut order =
            Order::new_pending("buyer@example.com".into(), vec![line], 1_000, "receipt.png".into());

        let hidden = order.buyer_view();
        assert_eq!(hidden.items[0].download_url, None);
        assert_eq!(hidden.total_cents, order.total_cents);
        assert!(order.items[0].download_url.is_some());

        order.approve();
        assert_eq!(order.buyer_view(), order);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Pending".parse(), Ok(OrderStatus::Pending));
        assert_eq!("APPROVED".parse(), Ok(OrderStatus::Approved));
        assert!("rejected".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn order_record_encoding() {
        let order = pending();
        let encoded = minicbor::to_vec(&order).unwrap();
        let decoded: Order = minicbor::decode(&encoded).unwrap();
        assert_eq!(order, decoded);
    }
}
