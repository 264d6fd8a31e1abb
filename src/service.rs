//! Service layer API for catalog and order workflow operations
use super::auth::Principal;
use super::cart::{CartItem, sum_lines};
use super::catalog::{NewProduct, Product};
use super::checkout::{OrderGateway, OrderSubmission, require_payment_proof};
use super::entitlement::EntitlementView;
use super::error::{Result, StorefrontError, ValidationError};
use super::order::{Order, OrderStatus, Transition};
use super::store::{Store, get_record, insert_new_record, scan_records};
use super::types::{OrderId, ProductId};
use super::utils::normalize_email;
use serde::Serialize;
use sled::Transactional;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    pub products: usize,
    pub users: usize,
    pub orders: usize,
    pub pending_orders: usize,
    pub approved_revenue_cents: u64,
}

#[derive(Clone)]
pub struct StorefrontService {
    store: Store,
}

impl StorefrontService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Catalog listing. Deliverable links are only shown to admins.
    pub fn list_products(
        &self,
        viewer: Option<&Principal>,
        category: Option<&str>,
    ) -> Result<Vec<Product>> {
        let reveal = viewer.is_some_and(Principal::is_admin);
        let mut products: Vec<Product> = scan_records(&self.store.products)?;
        if let Some(category) = category {
            products.retain(|p| p.category.eq_ignore_ascii_case(category));
        }
        products.reverse(); // newest first
        Ok(products
            .into_iter()
            .map(|p| if reveal { p } else { p.public_view() })
            .collect())
    }

    pub fn get_product(&self, viewer: Option<&Principal>, id: &ProductId) -> Result<Product> {
        let product = self.load_product(id)?;
        if viewer.is_some_and(Principal::is_admin) {
            Ok(product)
        } else {
            Ok(product.public_view())
        }
    }

    fn load_product(&self, id: &ProductId) -> Result<Product> {
        get_record(&self.store.products, id.as_key())?
            .ok_or_else(|| StorefrontError::NotFound(format!("product {id}")))
    }

    #[instrument(name = "catalog::create", skip(self, draft), fields(actor = %actor.email))]
    pub fn create_product(&self, actor: &Principal, draft: NewProduct) -> Result<Product> {
        actor.require_admin("create products")?;
        let product = draft.validate_and_finalise()?;
        insert_new_record(&self.store.products, product.id.as_key(), &product)?;
        info!(product_id = %product.id, name = %product.name, "product published");
        Ok(product)
    }

    /// Orders keep their own copy of the product, so nothing else changes here.
    #[instrument(name = "catalog::delete", skip(self), fields(actor = %actor.email))]
    pub fn delete_product(&self, actor: &Principal, id: &ProductId) -> Result<Product> {
        actor.require_admin("delete products")?;
        let removed = self
            .store
            .products
            .remove(id.as_key())?
            .ok_or_else(|| StorefrontError::NotFound(format!("product {id}")))?;
        info!(product_id = %id, "product removed");
        Ok(minicbor::decode(&removed)?)
    }

    /// Validates a submission and records it as a pending order.
    ///
    /// Each submitted line is checked against the catalog as it stands right
    /// now; that state becomes the order's frozen snapshot and is never
    /// consulted again for this order.
    #[instrument(name = "orders::place", skip(self, submission), fields(actor = %actor.email, lines = submission.items.len()))]
    pub fn place_order(&self, actor: &Principal, submission: &OrderSubmission) -> Result<Order> {
        let screenshot = require_payment_proof(&submission.screenshot)?.to_string();

        let customer_email = match &submission.customer_email {
            Some(email) => normalize_email(email)?,
            None => actor.email.clone(),
        };
        actor.require_self_or_admin(&customer_email)?;

        if submission.items.is_empty() {
            return Err(ValidationError::EmptyOrder.into());
        }
        let mut seen = HashSet::new();
        for line in &submission.items {
            if line.quantity == 0 {
                return Err(ValidationError::InvalidQuantity(line.product_id.to_string()).into());
            }
            if !seen.insert(line.product_id) {
                return Err(ValidationError::DuplicateLine(line.product_id.to_string()).into());
            }
        }

        let computed = sum_lines(&submission.items).ok_or(ValidationError::AmountOverflow)?;
        if computed != submission.total_cents {
            return Err(ValidationError::TotalMismatch {
                submitted: submission.total_cents,
                computed,
            }
            .into());
        }

        let frozen = submission
            .items
            .iter()
            .map(|line| self.freeze_line(line))
            .collect::<Result<Vec<_>>>()?;
        let total_cents = sum_lines(&frozen).ok_or(ValidationError::AmountOverflow)?;

        let order = Order::new_pending(customer_email, frozen, total_cents, screenshot);
        self.insert_order(&order)?;

        info!(order_id = %order.id, customer = %order.customer_email, total_cents, "order recorded as pending");
        Ok(visible_to(actor, order))
    }

    fn freeze_line(&self, line: &CartItem) -> Result<CartItem> {
        let product = get_record::<Product>(&self.store.products, line.product_id.as_key())?
            .ok_or_else(|| ValidationError::UnknownProduct(line.product_id.to_string()))?;

        if product.price_cents != line.price_cents {
            warn!(product_id = %product.id, submitted = line.price_cents, current = product.price_cents, "price drift at checkout");
            return Err(StorefrontError::Conflict(format!(
                "price of {} changed from {} to {}",
                product.name, line.price_cents, product.price_cents
            )));
        }

        Ok(CartItem::from_product(&product, line.quantity))
    }

    // order record and customer index entry land together or not at all
    fn insert_order(&self, order: &Order) -> Result<()> {
        let key = order.id.as_key().to_vec();
        let value = minicbor::to_vec(order)?;
        let index_key = customer_index_key(&order.customer_email, &order.id);

        (&self.store.orders, &self.store.orders_by_customer)
            .transaction(|(orders, index)| {
                if orders.get(key.clone())?.is_some() {
                    return Err(ConflictableTransactionError::Abort(StorefrontError::Conflict(
                        "order id collision".into(),
                    )));
                }
                orders.insert(key.clone(), value.clone())?;
                index.insert(index_key.clone(), key.clone())?;
                Ok(())
            })
            .map_err(|e| match e {
                TransactionError::Abort(e) => e,
                TransactionError::Storage(e) => StorefrontError::TransientIo(e),
            })
    }

    /// Pending -> Approved. Approving twice is not an error.
    ///
    /// The record is replaced by compare-and-swap against the bytes that were
    /// read, so concurrent approvals of one order cannot clobber each other.
    #[instrument(name = "orders::approve", skip(self), fields(actor = %actor.email, order_id = %id))]
    pub fn approve_order(&self, actor: &Principal, id: &OrderId) -> Result<Order> {
        actor.require_admin("approve orders")?;

        loop {
            let Some(current) = self.store.orders.get(id.as_key())? else {
                return Err(StorefrontError::NotFound(format!("order {id}")));
            };
            let mut order: Order = minicbor::decode(&current)?;

            if order.approve() == Transition::AlreadyApproved {
                debug!("order already approved");
                return Ok(order);
            }

            let updated = minicbor::to_vec(&order)?;
            match self
                .store
                .orders
                .compare_and_swap(id.as_key(), Some(&current), Some(updated))?
            {
                Ok(()) => {
                    info!("order approved");
                    return Ok(order);
                }
                Err(_) => debug!("order changed underneath approval, retrying"),
            }
        }
    }

    /// All orders, newest first, optionally filtered by status.
    pub fn list_orders(
        &self,
        actor: &Principal,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        actor.require_admin("list all orders")?;
        let mut orders: Vec<Order> = scan_records(&self.store.orders)?;
        if let Some(status) = status {
            orders.retain(|o| o.status == status);
        }
        orders.reverse();
        Ok(orders)
    }

    pub fn get_order(&self, actor: &Principal, id: &OrderId) -> Result<Order> {
        let order: Order = get_record(&self.store.orders, id.as_key())?
            .ok_or_else(|| StorefrontError::NotFound(format!("order {id}")))?;
        // do not reveal that someone else's order exists
        actor
            .require_self_or_admin(&order.customer_email)
            .map_err(|_| StorefrontError::NotFound(format!("order {id}")))?;
        Ok(visible_to(actor, order))
    }

    /// One buyer's orders, newest first, read through the customer index.
    pub fn orders_for(&self, actor: &Principal, email: &str) -> Result<Vec<Order>> {
        let email = normalize_email(email)?;
        actor.require_self_or_admin(&email)?;
        Ok(self
            .stored_orders_for(&email)?
            .into_iter()
            .map(|order| visible_to(actor, order))
            .collect())
    }

    fn stored_orders_for(&self, email: &str) -> Result<Vec<Order>> {
        let mut orders = Vec::new();
        for entry in self
            .store
            .orders_by_customer
            .scan_prefix(customer_index_prefix(email))
            .values()
        {
            let key = entry?;
            match get_record::<Order>(&self.store.orders, &key)? {
                Some(order) => orders.push(order),
                None => warn!(email, "customer index points at a missing order"),
            }
        }
        orders.reverse();
        Ok(orders)
    }

    /// Built from the stored records; unlock state comes from their status.
    pub fn entitlements_for(&self, actor: &Principal, email: &str) -> Result<EntitlementView> {
        let email = normalize_email(email)?;
        actor.require_self_or_admin(&email)?;
        let orders = self.stored_orders_for(&email)?;
        Ok(EntitlementView::build(&email, &orders))
    }

    pub fn stats(&self, actor: &Principal) -> Result<DashboardStats> {
        actor.require_admin("view dashboard statistics")?;
        let orders: Vec<Order> = scan_records(&self.store.orders)?;
        let pending_orders = orders.iter().filter(|o| !o.is_approved()).count();
        let approved_revenue_cents = orders
            .iter()
            .filter(|o| o.is_approved())
            .fold(0u64, |acc, o| acc.saturating_add(o.total_cents));

        Ok(DashboardStats {
            products: self.store.products.len(),
            users: self.store.users.len(),
            orders: orders.len(),
            pending_orders,
            approved_revenue_cents,
        })
    }

    /// An [`OrderGateway`] that submits on behalf of `buyer`.
    pub fn gateway_for(&self, buyer: Principal) -> BuyerGateway<'_> {
        BuyerGateway {
            service: self,
            buyer,
        }
    }
}

pub struct BuyerGateway<'a> {
    service: &'a StorefrontService,
    buyer: Principal,
}

impl OrderGateway for BuyerGateway<'_> {
    fn submit_order(&self, submission: &OrderSubmission) -> Result<Order> {
        self.service.place_order(&self.buyer, submission)
    }
}

fn visible_to(actor: &Principal, order: Order) -> Order {
    if actor.is_admin() {
        order
    } else {
        order.buyer_view()
    }
}

fn customer_index_prefix(email: &str) -> Vec<u8> {
    let mut prefix = email.as_bytes().to_vec();
    prefix.push(0);
    prefix
}

fn customer_index_key(email: &str, id: &OrderId) -> Vec<u8> {
    let mut key = customer_index_prefix(email);
    key.extend_from_slice(id.as_key());
    key
}
