//! Buyer-side cart aggregate
//!
//! The cart lives on the buyer's device only. It holds one line per product and
//! never a line with a zero quantity. Persistence is a single CBOR blob in a
//! local sled tree, see [`Cart::save_to_db`].
use super::catalog::Product;
use super::error::{Result, ValidationError};
use super::types::ProductId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

const CART_KEY: &[u8] = b"cart";

/// A product snapshot plus the quantity the buyer wants.
#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq,
)]
pub struct CartItem {
    #[n(0)]
    pub product_id: ProductId,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub price_cents: u64,
    #[n(3)]
    pub category: String,
    #[n(4)]
    pub image: String,
    #[n(5)]
    #[serde(default)]
    pub additional_images: Vec<String>,
    #[n(6)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[n(7)]
    pub quantity: u32,
}

impl CartItem {
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            price_cents: product.price_cents,
            category: product.category.clone(),
            image: product.image.clone(),
            additional_images: product.additional_images.clone(),
            download_url: product.download_url.clone(),
            quantity,
        }
    }

    pub fn line_total(&self) -> Option<u64> {
        self.price_cents.checked_mul(u64::from(self.quantity))
    }
}

/// Sum of price x quantity, `None` on overflow.
pub fn sum_lines(items: &[CartItem]) -> Option<u64> {
    items
        .iter()
        .try_fold(0u64, |acc, item| acc.checked_add(item.line_total()?))
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a cart from stored lines, refusing zero quantities and repeated products.
    pub fn from_lines(items: Vec<CartItem>) -> Result<Self, ValidationError> {
        let mut seen = HashSet::new();
        for item in &items {
            if item.quantity == 0 {
                return Err(ValidationError::InvalidQuantity(item.product_id.to_string()));
            }
            if !seen.insert(item.product_id) {
                return Err(ValidationError::DuplicateLine(item.product_id.to_string()));
            }
        }
        Ok(Self { items })
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn quantity_of(&self, product_id: &ProductId) -> Option<u32> {
        self.items
            .iter()
            .find(|item| item.product_id == *product_id)
            .map(|item| item.quantity)
    }

    pub fn add(&mut self, product: &Product) {
        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product.id)
        {
            Some(item) => item.quantity = item.quantity.saturating_add(1),
            None => self.items.push(CartItem::from_product(product, 1)),
        }
    }

    /// Lowers the quantity by one, dropping the line instead of reaching zero.
    pub fn decrement(&mut self, product_id: &ProductId) {
        let Some(pos) = self
            .items
            .iter()
            .position(|item| item.product_id == *product_id)
        else {
            warn!(product_id = %product_id, "decrement on a product that is not in the cart");
            return;
        };

        if self.items[pos].quantity > 1 {
            self.items[pos].quantity -= 1;
        } else {
            self.items.remove(pos);
        }
    }

    pub fn remove(&mut self, product_id: &ProductId) {
        self.items.retain(|item| item.product_id != *product_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Recomputed on every call. Saturates instead of wrapping on absurd carts;
    /// checkout uses [`Cart::snapshot`] which rejects overflow outright.
    pub fn total(&self) -> u64 {
        self.items.iter().fold(0u64, |acc, item| {
            acc.saturating_add(item.price_cents.saturating_mul(u64::from(item.quantity)))
        })
    }

    /// Copies the lines and their total in one step.
    pub fn snapshot(&self) -> Result<(Vec<CartItem>, u64), ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::EmptyOrder);
        }
        let total = sum_lines(&self.items).ok_or(ValidationError::AmountOverflow)?;
        Ok((self.items.clone(), total))
    }

    /// Decoding goes through [`Cart::from_lines`].
    pub fn load_from_db(tree: &sled::Tree) -> Result<Self> {
        match tree.get(CART_KEY)? {
            Some(bytes) => Ok(minicbor::decode(&bytes)?),
            None => Ok(Self::new()),
        }
    }

    pub fn save_to_db(&self, tree: &sled::Tree) -> Result<()> {
        tree.insert(CART_KEY, minicbor::to_vec(self)?)?;
        tree.flush()?;
        Ok(())
    }
}

impl<C> minicbor::Encode<C> for Cart {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.encode_with(&self.items, ctx)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Cart {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let items: Vec<CartItem> = d.decode_with(ctx)?;
        Cart::from_lines(items).map_err(|e| {
            warn!(error = %e, "stored cart rejected");
            minicbor::decode::Error::message("cart has a zero quantity or repeated product line")
        })
    }
}
