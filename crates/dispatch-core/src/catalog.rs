//! Read-only catalog lookups supplied by the caller

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductType {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsCompany {
    pub id: String,
    pub name: String,
}

/// Catalog product a line item may be attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Fully materialized lookup lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub product_types: Vec<ProductType>,
    #[serde(default)]
    pub logistics_companies: Vec<LogisticsCompany>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl Catalog {
    pub fn product_type(&self, id: &str) -> Option<&ProductType> {
        self.product_types.iter().find(|t| t.id == id)
    }

    pub fn logistics_company(&self, id: &str) -> Option<&LogisticsCompany> {
        self.logistics_companies.iter().find(|c| c.id == id)
    }

    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Existing images of a persisted item.
    ///
    /// Precedence: the item's own list, then the attached product's list,
    /// then the product's single image.
    pub fn resolve_images(&self, item_images: &[String], product_id: Option<&str>) -> Vec<String> {
        if !item_images.is_empty() {
            return item_images.to_vec();
        }
        let Some(product) = product_id.and_then(|id| self.product(id)) else {
            return Vec::new();
        };
        if !product.images.is_empty() {
            return product.images.clone();
        }
        product.image.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog {
            products: vec![
                Product {
                    id: "p1".into(),
                    name: "Polo".into(),
                    code: "POLO".into(),
                    images: vec!["p1-a".into(), "p1-b".into()],
                    image: Some("p1-single".into()),
                },
                Product {
                    id: "p2".into(),
                    name: "Tee".into(),
                    code: "TEE".into(),
                    images: Vec::new(),
                    image: Some("p2-single".into()),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_item_images_win() {
        let images = catalog().resolve_images(&["own".to_string()], Some("p1"));
        assert_eq!(images, vec!["own".to_string()]);
    }

    #[test]
    fn test_product_list_then_single_image() {
        let catalog = catalog();
        assert_eq!(catalog.resolve_images(&[], Some("p1")), vec!["p1-a", "p1-b"]);
        assert_eq!(catalog.resolve_images(&[], Some("p2")), vec!["p2-single"]);
        assert!(catalog.resolve_images(&[], Some("missing")).is_empty());
        assert!(catalog.resolve_images(&[], None).is_empty());
    }
}
