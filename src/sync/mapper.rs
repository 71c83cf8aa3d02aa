// SPDX-License-Identifier: GPL-3.0-only
use serde_json::Value;
use tracing::{debug, warn};

use crate::medusa::SeedData;

/// Seed payload routed to one local content type
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSync {
    /// Local resource key, `api::<slug>.<slug>`
    pub resource_key: String,
    /// Medusa field the payload came from
    pub field: String,
    pub payload: Value,
}

/// Turn a Medusa seed field (`shippingOptionsX`) into a kebab-case slug
/// (`shipping-option`): drop the last two characters, then split before
/// every internal uppercase letter.
pub fn resource_slug(field: &str) -> Option<String> {
    let chars: Vec<char> = field.chars().collect();
    if chars.len() <= 2 {
        return None;
    }

    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for &c in &chars[..chars.len() - 2] {
        if c.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    Some(words.join("-"))
}

pub fn resource_key(slug: &str) -> String {
    format!("api::{slug}.{slug}")
}

/// Map every seed field to its local resource key, keeping Medusa's order.
///
/// Two fields landing on the same key keep the first position and the last
/// payload.
pub fn map_fields_to_resource_keys(seed: &SeedData) -> Vec<ServiceSync> {
    let mut syncs: Vec<ServiceSync> = Vec::with_capacity(seed.len());

    for (field, payload) in seed {
        let Some(slug) = resource_slug(field) else {
            warn!(field = %field, "Seed field name too short to map, skipping");
            continue;
        };
        let key = resource_key(&slug);
        debug!(field = %field, resource = %key, "Mapped seed field");

        match syncs.iter_mut().find(|s| s.resource_key == key) {
            Some(existing) => {
                warn!(field = %field, previous = %existing.field, resource = %key, "Seed fields collide, last one wins");
                existing.field = field.clone();
                existing.payload = payload.clone();
            }
            None => syncs.push(ServiceSync {
                resource_key: key,
                field: field.clone(),
                payload: payload.clone(),
            }),
        }
    }

    syncs
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn seed(value: Value) -> SeedData {
        match value {
            Value::Object(map) => map,
            _ => panic!("seed must be an object"),
        }
    }

    #[test]
    fn test_camel_case_becomes_kebab_case() {
        assert_eq!(resource_slug("fooBarBazXX").as_deref(), Some("foo-bar-baz"));
        assert_eq!(resource_slug("shippingOptionsX").as_deref(), Some("shipping-option"));
        assert_eq!(resource_slug("fulfillmentProviderXX").as_deref(), Some("fulfillment-provider"));
    }

    #[test]
    fn test_single_word_field() {
        assert_eq!(resource_slug("region##").as_deref(), Some("region"));
        assert_eq!(resource_key("region"), "api::region.region");
    }

    #[test]
    fn test_plural_field_keeps_its_plural() {
        assert_eq!(resource_slug("regions##").as_deref(), Some("regions"));
        assert_eq!(resource_key("regions"), "api::regions.regions");
    }

    #[test]
    fn test_strips_exactly_two_characters() {
        assert_eq!(resource_slug("regions").as_deref(), Some("regio"));
        assert_eq!(resource_slug("productsXX").as_deref(), Some("products"));
    }

    #[test]
    fn test_suffix_uppercase_is_not_a_boundary() {
        // The stripped suffix never produces a trailing word
        assert_eq!(resource_slug("storeAB").as_deref(), Some("store"));
    }

    #[test]
    fn test_leading_uppercase_does_not_add_empty_word() {
        assert_eq!(resource_slug("ShippingProfileXX").as_deref(), Some("shipping-profile"));
    }

    #[test]
    fn test_too_short_fields() {
        assert_eq!(resource_slug(""), None);
        assert_eq!(resource_slug("ab"), None);
        assert_eq!(resource_slug("abc").as_deref(), Some("a"));
    }

    #[test]
    fn test_mapping_preserves_input_order() {
        let data = seed(json!({
            "fulfillmentProviderXX": [],
            "paymentProviderXX": [],
            "regionXX": [{ "id": "reg_1" }],
            "shippingOptionXX": [],
            "shippingProfileXX": [],
            "productXX": [{ "id": "prod_1" }],
            "storeXX": {},
        }));

        let keys: Vec<String> = map_fields_to_resource_keys(&data)
            .into_iter()
            .map(|s| s.resource_key)
            .collect();
        assert_eq!(
            keys,
            [
                "api::fulfillment-provider.fulfillment-provider",
                "api::payment-provider.payment-provider",
                "api::region.region",
                "api::shipping-option.shipping-option",
                "api::shipping-profile.shipping-profile",
                "api::product.product",
                "api::store.store",
            ]
        );
    }

    #[test]
    fn test_mapping_carries_payload_and_field() {
        let data = seed(json!({ "regionXX": [{ "id": "reg_1" }] }));
        let syncs = map_fields_to_resource_keys(&data);
        assert_eq!(
            syncs,
            vec![ServiceSync {
                resource_key: "api::region.region".to_string(),
                field: "regionXX".to_string(),
                payload: json!([{ "id": "reg_1" }]),
            }]
        );
    }

    #[test]
    fn test_mapping_skips_unmappable_and_merges_collisions() {
        let data = seed(json!({
            "regionXX": [1],
            "ok": [],
            "productXX": [],
            "regionYY": [2],
        }));

        let syncs = map_fields_to_resource_keys(&data);
        assert_eq!(syncs.len(), 2);
        assert_eq!(syncs[0].resource_key, "api::region.region");
        assert_eq!(syncs[0].field, "regionYY");
        assert_eq!(syncs[0].payload, json!([2]));
        assert_eq!(syncs[1].resource_key, "api::product.product");
    }
}
