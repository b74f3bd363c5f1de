use serde::{Deserialize, Serialize};
use shop_blob::{AssetLocator, AssetPayload};

use crate::ValidationError;

/// Operator-entered product fields, still in text form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub category: String,
    pub price: String,
    /// May be empty
    pub offer_price: String,
    /// May be empty
    pub description: String,
    /// ARGB color values
    pub colors: Vec<i32>,
    /// Comma separated, may be empty
    pub sizes: String,
    pub quantity: String,
}

impl ProductFields {
    /// Local checks an input form runs before submitting.
    ///
    /// Name, category and price must be non-blank and at least one asset
    /// must be attached. The pipeline itself accepts drafts without assets.
    pub fn check_required(&self, asset_count: usize) -> Result<(), ValidationError> {
        for (field, value) in [
            ("name", &self.name),
            ("category", &self.category),
            ("price", &self.price),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::new(field, value.as_str(), "is required"));
            }
        }
        if asset_count == 0 {
            return Err(ValidationError::new(
                "images",
                "",
                "at least one image must be attached",
            ));
        }
        Ok(())
    }
}

/// Input state of one submission: fields plus the attached assets
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub fields: ProductFields,
    pub assets: Vec<AssetPayload>,
}

impl ProductDraft {
    pub fn new(fields: ProductFields) -> Self {
        Self {
            fields,
            assets: Vec::new(),
        }
    }

    pub fn with_asset(mut self, payload: AssetPayload) -> Self {
        self.assets.push(payload);
        self
    }

    /// Reset fields, colors and attached assets
    pub fn clear(&mut self) {
        self.fields = ProductFields::default();
        self.assets.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.fields == ProductFields::default() && self.assets.is_empty()
    }
}

/// A product as stored in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    pub id: String,
    pub name: String,
    pub category: String,
    pub price: i64,
    pub offer_price: Option<f32>,
    pub description: Option<String>,
    pub colors: Option<Vec<i32>>,
    pub sizes: Option<Vec<String>>,
    pub quantity: String,
    /// Asset locators in the order the assets were attached
    pub images: Vec<AssetLocator>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> ProductFields {
        ProductFields {
            name: "Linen shirt".into(),
            category: "Shirts".into(),
            price: "25".into(),
            ..Default::default()
        }
    }

    #[test]
    fn required_fields_pass_with_an_asset() {
        assert!(filled().check_required(1).is_ok());
    }

    #[test]
    fn blank_name_is_reported_first() {
        let fields = ProductFields {
            name: "   ".into(),
            category: String::new(),
            ..filled()
        };
        let err = fields.check_required(1).unwrap_err();
        assert_eq!(err.field, "name");
    }

    #[test]
    fn missing_assets_are_reported() {
        let err = filled().check_required(0).unwrap_err();
        assert_eq!(err.field, "images");
    }

    #[test]
    fn clearing_a_draft_drops_everything() {
        let mut draft = ProductDraft::new(ProductFields {
            colors: vec![-16777216],
            ..filled()
        })
        .with_asset(AssetPayload::jpeg(b"img".to_vec()));

        draft.clear();

        assert!(draft.is_empty());
    }

    #[test]
    fn record_serializes_with_camel_case_keys_and_nulls() {
        let record = CatalogRecord {
            id: "p-1".into(),
            name: "Linen shirt".into(),
            category: "Shirts".into(),
            price: 25,
            offer_price: None,
            description: None,
            colors: None,
            sizes: Some(vec!["S".into(), "M".into()]),
            quantity: "3".into(),
            images: vec![AssetLocator::new("https://cdn.test/a")],
        };

        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["offerPrice"], serde_json::Value::Null);
        assert_eq!(value["description"], serde_json::Value::Null);
        assert_eq!(value["sizes"], serde_json::json!(["S", "M"]));
        assert_eq!(value["images"], serde_json::json!(["https://cdn.test/a"]));
        assert_eq!(value["price"], 25);
    }
}
