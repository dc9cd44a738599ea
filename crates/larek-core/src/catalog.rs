//! Catalog product types.

use crate::ids::ProductId;
use serde::{Deserialize, Serialize};

/// Product category.
///
/// Categories only drive display styling; they carry no pricing or
/// availability rules. The serialized form is the label used by the store
/// API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Category {
    #[serde(rename = "софт-скил")]
    SoftSkill,
    #[serde(rename = "хард-скил")]
    HardSkill,
    #[serde(rename = "кнопка")]
    Button,
    #[serde(rename = "дополнительное")]
    Additional,
    #[default]
    #[serde(rename = "другое")]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::SoftSkill,
        Category::HardSkill,
        Category::Button,
        Category::Additional,
        Category::Other,
    ];

    /// The API label for this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SoftSkill => "софт-скил",
            Category::HardSkill => "хард-скил",
            Category::Button => "кнопка",
            Category::Additional => "дополнительное",
            Category::Other => "другое",
        }
    }

    /// Styling key used by card views (`card__category_<modifier>`).
    pub fn modifier(&self) -> &'static str {
        match self {
            Category::SoftSkill => "soft",
            Category::HardSkill => "hard",
            Category::Button => "button",
            Category::Additional => "additional",
            Category::Other => "other",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s.trim())
    }
}

/// A product in the catalog.
///
/// Products are immutable once loaded; the catalog is replaced wholesale
/// rather than edited in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Price in synapses. `None` means the product is not for sale.
    #[serde(default)]
    pub price: Option<u64>,
    /// Full description.
    #[serde(default)]
    pub description: String,
    /// Image reference, relative to the CDN until resolved.
    #[serde(default)]
    pub image: String,
    /// Display category.
    #[serde(default)]
    pub category: Category,
}

impl Product {
    /// Create a product with an empty description and image.
    pub fn new(id: impl Into<ProductId>, title: impl Into<String>, price: Option<u64>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            price,
            description: String::new(),
            image: String::new(),
            category: Category::default(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check if the product can be added to an order.
    pub fn is_for_sale(&self) -> bool {
        self.price.is_some()
    }

    /// Price contribution to an order total.
    pub fn price_or_zero(&self) -> u64 {
        self.price.unwrap_or(0)
    }

    /// Resolve the image reference against a CDN base URL.
    ///
    /// Absolute references (`http://`, `https://`) are left untouched.
    pub fn with_cdn(&self, cdn_url: &str) -> Self {
        let mut product = self.clone();
        if !cdn_url.is_empty()
            && !self.image.starts_with("http://")
            && !self.image.starts_with("https://")
        {
            product.image = format!(
                "{}/{}",
                cdn_url.trim_end_matches('/'),
                self.image.trim_start_matches('/')
            );
        }
        product
    }
}

/// Catalog listing as returned by the store API.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductList {
    /// Number of products the API reports.
    #[serde(default)]
    pub total: usize,
    /// Products in display order.
    pub items: Vec<Product>,
}

impl ProductList {
    pub fn new(items: Vec<Product>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }

    /// Parse a listing from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
