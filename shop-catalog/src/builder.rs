use shop_blob::AssetLocator;
use uuid::Uuid;

use crate::{CatalogRecord, ProductFields, ValidationError};

/// Turns text fields and uploaded locators into a [`CatalogRecord`].
///
/// Pure: no I/O, and the same inputs with the same id always give the same
/// record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordBuilder;

impl RecordBuilder {
    /// Build under a fresh UUID v4 record id
    pub fn build(
        fields: &ProductFields,
        images: Vec<AssetLocator>,
    ) -> Result<CatalogRecord, ValidationError> {
        Self::build_with_id(Uuid::new_v4().to_string(), fields, images)
    }

    pub fn build_with_id(
        id: impl Into<String>,
        fields: &ProductFields,
        images: Vec<AssetLocator>,
    ) -> Result<CatalogRecord, ValidationError> {
        Ok(CatalogRecord {
            id: id.into(),
            name: fields.name.clone(),
            category: fields.category.clone(),
            price: parse_price(&fields.price)?,
            offer_price: parse_offer_price(&fields.offer_price)?,
            description: non_empty(&fields.description).map(str::to_string),
            colors: (!fields.colors.is_empty()).then(|| fields.colors.clone()),
            sizes: parse_sizes(&fields.sizes),
            quantity: fields.quantity.clone(),
            images,
        })
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn parse_price(raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|e| ValidationError::new("price", raw, format!("not a whole number: {e}")))
}

fn parse_offer_price(raw: &str) -> Result<Option<f32>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value = trimmed
        .parse::<f32>()
        .map_err(|e| ValidationError::new("offerPrice", raw, format!("not a number: {e}")))?;
    if !value.is_finite() {
        return Err(ValidationError::new("offerPrice", raw, "must be finite"));
    }
    Ok(Some(value))
}

/// Sizes are split on commas and kept verbatim, whitespace included
fn parse_sizes(raw: &str) -> Option<Vec<String>> {
    non_empty(raw).map(|sizes| sizes.split(',').map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> ProductFields {
        ProductFields {
            name: "Linen shirt".into(),
            category: "Shirts".into(),
            price: "25".into(),
            quantity: "4".into(),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_fields_build_with_empty_optionals() {
        let record = RecordBuilder::build_with_id("p-1", &fields(), Vec::new()).unwrap();

        assert_eq!(record.id, "p-1");
        assert_eq!(record.price, 25);
        assert_eq!(record.offer_price, None);
        assert_eq!(record.description, None);
        assert_eq!(record.colors, None);
        assert_eq!(record.sizes, None);
        assert_eq!(record.quantity, "4");
        assert!(record.images.is_empty());
    }

    #[test]
    fn optional_fields_are_carried_over() {
        let fields = ProductFields {
            offer_price: " 19.5 ".into(),
            description: "Breathable".into(),
            colors: vec![-65536, -16776961],
            sizes: "S, M,L".into(),
            ..fields()
        };
        let images = vec![AssetLocator::new("u0"), AssetLocator::new("u1")];

        let record = RecordBuilder::build_with_id("p-2", &fields, images.clone()).unwrap();

        assert_eq!(record.offer_price, Some(19.5));
        assert_eq!(record.description.as_deref(), Some("Breathable"));
        assert_eq!(record.colors, Some(vec![-65536, -16776961]));
        assert_eq!(
            record.sizes,
            Some(vec!["S".to_string(), " M".to_string(), "L".to_string()])
        );
        assert_eq!(record.images, images);
    }

    #[test]
    fn price_is_trimmed_before_parsing() {
        let fields = ProductFields {
            price: " 40\n".into(),
            ..fields()
        };
        assert_eq!(RecordBuilder::build(&fields, Vec::new()).unwrap().price, 40);
    }

    #[test]
    fn fractional_price_is_rejected() {
        let fields = ProductFields {
            price: "25.5".into(),
            ..fields()
        };
        let err = RecordBuilder::build(&fields, Vec::new()).unwrap_err();
        assert_eq!(err.field, "price");
        assert_eq!(err.value, "25.5");
    }

    #[test]
    fn non_numeric_and_non_finite_offer_prices_are_rejected() {
        for raw in ["cheap", "NaN", "inf"] {
            let fields = ProductFields {
                offer_price: raw.into(),
                ..fields()
            };
            let err = RecordBuilder::build(&fields, Vec::new()).unwrap_err();
            assert_eq!(err.field, "offerPrice", "input {raw:?}");
        }
    }

    #[test]
    fn build_generates_distinct_ids() {
        let a = RecordBuilder::build(&fields(), Vec::new()).unwrap();
        let b = RecordBuilder::build(&fields(), Vec::new()).unwrap();
        assert_ne!(a.id, b.id);
        assert!(Uuid::parse_str(&a.id).is_ok());
    }
}
