//! Typed attributes attached to pools and devices.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::quantity::Quantity;

/// A named, typed attribute. Pool attributes are inherited by every
/// device in the pool; a device attribute shadows a same-named pool
/// attribute during constraint evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub name: String,
    #[serde(flatten)]
    pub value: AttributeValue,
}

/// The value of an attribute; exactly one kind on the wire
/// (`stringValue`, `intValue`, `quantityValue`, or `semVerValue`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeValue {
    StringValue(String),
    IntValue(i64),
    QuantityValue(Quantity),
    SemVerValue(semver::Version),
}

/// Merge pool and device attributes into a lookup map, with device
/// attributes shadowing same-named pool attributes.
pub fn merge_attributes<'a>(
    pool: &'a [Attribute],
    device: &'a [Attribute],
) -> HashMap<&'a str, &'a AttributeValue> {
    let mut merged = HashMap::with_capacity(pool.len() + device.len());
    for attr in pool.iter().chain(device) {
        merged.insert(attr.name.as_str(), &attr.value);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_attr(name: &str, value: &str) -> Attribute {
        Attribute {
            name: name.to_string(),
            value: AttributeValue::StringValue(value.to_string()),
        }
    }

    #[test]
    fn device_shadows_pool() {
        let pool = vec![string_attr("model", "base"), string_attr("os", "linux")];
        let device = vec![string_attr("model", "turbo")];

        let merged = merge_attributes(&pool, &device);
        assert_eq!(
            merged.get("model"),
            Some(&&AttributeValue::StringValue("turbo".to_string()))
        );
        assert_eq!(
            merged.get("os"),
            Some(&&AttributeValue::StringValue("linux".to_string()))
        );
    }

    #[test]
    fn serializes_with_variant_selector() {
        let attr = Attribute {
            name: "net-speed".to_string(),
            value: AttributeValue::QuantityValue("10G".parse().unwrap()),
        };
        let json = serde_json::to_value(&attr).unwrap();
        assert_eq!(json["name"], "net-speed");
        assert_eq!(json["quantityValue"], "10G");
    }

    #[test]
    fn deserializes_semver() {
        let attr: Attribute = serde_json::from_str(
            r#"{"name": "driver-version", "semVerValue": "7.8.1-gen6"}"#,
        )
        .unwrap();
        match attr.value {
            AttributeValue::SemVerValue(v) => {
                assert_eq!(v.major, 7);
                assert_eq!(v.pre.as_str(), "gen6");
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }
}
