//! Buyer-facing read model over stored orders
//!
//! Unlock state is derived from the stored order status every time a view is
//! built. Nothing submitted by a client feeds into it.
use super::order::{Order, OrderStatus};
use super::types::{OrderId, ProductId, TimeStamp};
use serde::Serialize;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Download {
    Unlocked { url: String },
    Locked,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EntitledItem {
    pub product_id: ProductId,
    pub name: String,
    pub category: String,
    pub image: String,
    pub additional_images: Vec<String>,
    pub price_cents: u64,
    pub quantity: u32,
    pub unlocked: bool,
    pub download: Download,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct OrderEntitlement {
    pub id: OrderId,
    pub status: OrderStatus,
    pub total_cents: u64,
    pub created_at: TimeStamp,
    pub items: Vec<EntitledItem>,
}

impl OrderEntitlement {
    pub fn from_order(order: &Order) -> Self {
        let unlocked = order.is_approved();
        let items = order
            .items
            .iter()
            .map(|item| {
                let download = match (&item.download_url, unlocked) {
                    (Some(url), true) => Download::Unlocked { url: url.clone() },
                    _ => Download::Locked,
                };
                EntitledItem {
                    product_id: item.product_id,
                    name: item.name.clone(),
                    category: item.category.clone(),
                    image: item.image.clone(),
                    additional_images: item.additional_images.clone(),
                    price_cents: item.price_cents,
                    quantity: item.quantity,
                    unlocked: matches!(download, Download::Unlocked { .. }),
                    download,
                }
            })
            .collect();

        Self {
            id: order.id,
            status: order.status,
            total_cents: order.total_cents,
            created_at: order.created_at.clone(),
            items,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct EntitlementView {
    pub customer_email: String,
    pub orders: Vec<OrderEntitlement>,
}

impl EntitlementView {
    pub fn build<'a>(customer_email: &str, orders: impl IntoIterator<Item = &'a Order>) -> Self {
        Self {
            customer_email: customer_email.to_string(),
            orders: orders
                .into_iter()
                .filter(|order| order.customer_email == customer_email)
                .map(OrderEntitlement::from_order)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::CartItem;

    fn item(url: &str) -> CartItem {
        CartItem {
            product_id: ProductId::new(),
            name: "Brush Set".into(),
            price_cents: 900,
            category: "Brushes".into(),
            image: "https://cdn.example/brush.png".into(),
            additional_images: vec![],
            download_url: Some(url.into()),
            quantity: 1,
        }
    }

    fn order_for(email: &str) -> Order {
        Order::new_pending(
            email.into(),
            vec![item("https://cdn.example/a.zip"), item("https://cdn.example/b.zip")],
            1_800,
            "receipt.png".into(),
        )
    }

    #[test]
    fn pending_orders_expose_no_downloads() {
        let order = order_for("buyer@example.com");
        let view = OrderEntitlement::from_order(&order);

        assert!(view.items.iter().all(|i| i.download == Download::Locked));
        assert!(view.items.iter().all(|i| !i.unlocked));

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("cdn.example/a.zip"));
    }

    #[test]
    fn approval_unlocks_every_item_and_nothing_else() {
        let mut order = order_for("buyer@example.com");
        let before = OrderEntitlement::from_order(&order);
        order.approve();
        let after = OrderEntitlement::from_order(&order);

        assert!(after.items.iter().all(|i| i.unlocked));
        assert_eq!(
            after.items[0].download,
            Download::Unlocked {
                url: "https://cdn.example/a.zip".into()
            }
        );
        assert_eq!(before.total_cents, after.total_cents);
        assert_eq!(before.id, after.id);
        for (b, a) in before.items.iter().zip(&after.items) {
            assert_eq!(b.name, a.name);
            assert_eq!(b.price_cents, a.price_cents);
            assert_eq!(b.quantity, a.quantity);
        }
    }

    #[test]
    fn view_only_contains_the_buyers_orders() {
        let mine = order_for("buyer@example.com");
        let theirs = order_for("other@example.com");
        let view = EntitlementView::build("buyer@example.com", [&mine, &theirs]);

        assert_eq!(view.orders.len(), 1);
        assert_eq!(view.orders[0].id, mine.id);
    }
}
