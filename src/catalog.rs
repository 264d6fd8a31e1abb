//! Catalog records and the admin-facing product builder
use super::error::ValidationError;
use super::types::{ProductId, TimeStamp};
use serde::{Deserialize, Serialize};

#[derive(
    minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, PartialEq, Eq,
)]
pub struct Product {
    #[n(0)]
    pub id: ProductId,
    #[n(1)]
    pub name: String,
    #[n(2)]
    #[serde(default)]
    pub description: String,
    #[n(3)]
    pub price_cents: u64, // integer minor units
    #[n(4)]
    pub category: String,
    #[n(5)]
    pub image: String,
    #[n(6)]
    #[serde(default)]
    pub additional_images: Vec<String>,
    // withheld from public listings; present on stored records and order snapshots
    #[n(7)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[n(8)]
    #[serde(default)]
    pub created_at: TimeStamp,
}

impl Product {
    /// Copy of the record with the deliverable reference stripped.
    pub fn public_view(&self) -> Self {
        Self {
            download_url: None,
            ..self.clone()
        }
    }
}

// Used for constructing products before they are published
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct NewProduct {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    price_cents: u64,
    #[serde(default)]
    category: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    additional_images: Vec<String>,
    #[serde(default)]
    download_url: String,
}

impl NewProduct {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
    pub fn set_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
    pub fn set_price_cents(mut self, price: u64) -> Self {
        self.price_cents = price;
        self
    }
    pub fn set_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
    pub fn set_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }
    pub fn add_image(mut self, image: impl Into<String>) -> Self {
        self.additional_images.push(image.into());
        self
    }
    pub fn set_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = url.into();
        self
    }

    /// Checks required fields and assigns a fresh id. A price of zero is allowed (free assets).
    pub fn validate_and_finalise(self) -> Result<Product, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        if self.category.trim().is_empty() {
            return Err(ValidationError::MissingField("category"));
        }
        if self.image.trim().is_empty() {
            return Err(ValidationError::MissingField("image"));
        }
        if self.download_url.trim().is_empty() {
            return Err(ValidationError::MissingField("download_url"));
        }

        Ok(Product {
            id: ProductId::new(),
            name: self.name.trim().to_string(),
            description: self.description,
            price_cents: self.price_cents,
            category: self.category.trim().to_string(),
            image: self.image,
            additional_images: self
                .additional_images
                .into_iter()
                .filter(|img| !img.trim().is_empty())
                .collect(),
            download_url: Some(self.download_url),
            created_at: TimeStamp::new(),
        })
    }
}
