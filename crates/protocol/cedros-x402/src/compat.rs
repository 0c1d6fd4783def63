//! Translation between server wire variants and canonical types.
//!
//! Two generations of paywall server are in the field. Every difference
//! between them is handled here and nowhere else:
//!
//! | Direction             | Accepted / emitted                                   | Canonical             |
//! |-----------------------|------------------------------------------------------|-----------------------|
//! | quote response        | `crypto`, `accepts[0]`, `requirement`, bare object   | `PaymentRequirement`  |
//! | cart quote response   | `quote` holding any quote response shape, `cartId`   | [`CartQuote`]         |
//! | cart quote request    | emits both `coupon` and `couponCode`                 | coupon code           |
//! | requirement amount    | `maxAmountRequired`, `amount`                        | `max_amount_required` |
//! | requirement asset     | `asset`, `assetId`                                   | `asset`               |
//! | requirement recipient | `payTo`, `payToAddress`                              | `pay_to`              |
//!
//! When `accepts` carries more than one option the first one is used.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{X402Error, X402Result};
use crate::types::{CartItem, CartQuote, PaymentRequirement, RequirementExtra};

/// Requirement as either server generation may send it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRequirement {
    #[serde(default)]
    scheme: Option<String>,
    #[serde(default)]
    network: Option<String>,
    #[serde(default, alias = "payToAddress")]
    pay_to: Option<String>,
    #[serde(default, alias = "assetId")]
    asset: Option<String>,
    #[serde(default, alias = "amount")]
    max_amount_required: Option<AmountValue>,
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    max_timeout_seconds: Option<u64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    extra: Option<RequirementExtra>,
}

/// Amounts arrive as strings from current servers and as numbers from
/// older ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AmountValue {
    Text(String),
    Number(u64),
}

impl AmountValue {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number(n) => n.to_string(),
        }
    }
}

/// Default validity window when the server omits it.
const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 300;

impl WireRequirement {
    fn into_canonical(self, fallback_resource: Option<&str>) -> X402Result<PaymentRequirement> {
        fn required(field: &str, value: Option<String>) -> X402Result<String> {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| X402Error::invalid_requirement(format!("missing {}", field)))
        }

        let resource = self
            .resource
            .or_else(|| fallback_resource.map(str::to_string));

        let requirement = PaymentRequirement {
            scheme: required("scheme", self.scheme)?,
            network: required("network", self.network)?,
            pay_to: required("payTo", self.pay_to)?,
            asset: required("asset", self.asset)?,
            max_amount_required: required(
                "maxAmountRequired",
                self.max_amount_required.map(AmountValue::into_string),
            )?,
            resource: required("resource", resource)?,
            max_timeout_seconds: self.max_timeout_seconds.unwrap_or(DEFAULT_MAX_TIMEOUT_SECONDS),
            description: self.description,
            extra: self.extra,
        };
        requirement.validate()?;
        Ok(requirement)
    }
}

fn requirement_from_value(value: Value, fallback_resource: Option<&str>) -> X402Result<PaymentRequirement> {
    let wire: WireRequirement = serde_json::from_value(value)
        .map_err(|e| X402Error::invalid_requirement(format!("undecodable requirement: {}", e)))?;
    wire.into_canonical(fallback_resource)
}

/// Extract the requirement from any quote response shape.
///
/// `resource` fills in the requirement's resource when the server omits it.
pub fn parse_quote_response(body: Value, resource: Option<&str>) -> X402Result<PaymentRequirement> {
    let Value::Object(mut map) = body else {
        return Err(X402Error::invalid_requirement("quote response is not an object"));
    };

    if let Some(crypto) = map.remove("crypto").filter(|v| !v.is_null()) {
        return requirement_from_value(crypto, resource);
    }

    if let Some(accepts) = map.remove("accepts").filter(|v| !v.is_null()) {
        let Value::Array(mut options) = accepts else {
            return Err(X402Error::invalid_requirement("accepts is not an array"));
        };
        if options.is_empty() {
            return Err(X402Error::invalid_requirement("accepts is empty"));
        }
        if options.len() > 1 {
            debug!(options = options.len(), "Quote offers several options, using the first");
        }
        return requirement_from_value(options.swap_remove(0), resource);
    }

    if let Some(requirement) = map.remove("requirement").filter(|v| !v.is_null()) {
        return requirement_from_value(requirement, resource);
    }

    requirement_from_value(Value::Object(map), resource)
}

/// Extract cart id and requirement from a cart quote response.
pub fn parse_cart_quote_response(body: Value) -> X402Result<CartQuote> {
    let Value::Object(mut map) = body else {
        return Err(X402Error::invalid_requirement("cart quote response is not an object"));
    };

    let cart_id = match map.remove("cartId") {
        Some(Value::String(id)) if !id.trim().is_empty() => id,
        _ => return Err(X402Error::invalid_requirement("missing cartId")),
    };

    let quote = map
        .remove("quote")
        .filter(|v| !v.is_null())
        .ok_or_else(|| X402Error::invalid_requirement("missing quote"))?;

    let requirement = parse_quote_response(quote, Some(&cart_id))?;
    Ok(CartQuote {
        cart_id,
        requirement,
    })
}

/// Body for the single-resource quote request.
pub fn quote_request(resource: &str, coupon_code: Option<&str>) -> Value {
    let mut body = json!({ "resource": resource });
    if let Some(code) = coupon_code {
        body["couponCode"] = json!(code);
    }
    body
}

/// Body for the cart quote request. The coupon is sent under both names.
pub fn cart_quote_request(
    items: &[CartItem],
    metadata: &BTreeMap<String, String>,
    coupon_code: Option<&str>,
) -> Value {
    let mut body = json!({
        "items": items,
        "coupon": coupon_code,
        "couponCode": coupon_code,
    });
    if !metadata.is_empty() {
        body["metadata"] = json!(metadata);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const PAY_TO: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn current_shape() -> Value {
        json!({
            "scheme": "solana-spl-transfer",
            "network": "mainnet-beta",
            "payTo": PAY_TO,
            "asset": MINT,
            "maxAmountRequired": "1000000",
            "resource": "article-1",
            "maxTimeoutSeconds": 120
        })
    }

    fn legacy_shape() -> Value {
        json!({
            "scheme": "solana-spl-transfer",
            "network": "mainnet-beta",
            "payToAddress": PAY_TO,
            "assetId": MINT,
            "amount": 1000000,
            "resource": "article-1"
        })
    }

    #[test]
    fn test_crypto_shape() {
        let req = parse_quote_response(json!({ "crypto": current_shape() }), None).unwrap();
        assert_eq!(req.pay_to, PAY_TO);
        assert_eq!(req.max_amount_required, "1000000");
        assert_eq!(req.max_timeout_seconds, 120);
    }

    #[test]
    fn test_accepts_shape_uses_first() {
        let mut second = current_shape();
        second["maxAmountRequired"] = json!("2000000");
        let req = parse_quote_response(json!({ "accepts": [current_shape(), second] }), None).unwrap();
        assert_eq!(req.max_amount_required, "1000000");
    }

    #[test]
    fn test_empty_accepts_is_invalid() {
        let err = parse_quote_response(json!({ "accepts": [] }), None).unwrap_err();
        assert_eq!(err, X402Error::invalid_requirement("accepts is empty"));
    }

    #[test]
    fn test_requirement_and_bare_shapes() {
        let a = parse_quote_response(json!({ "requirement": current_shape() }), None).unwrap();
        let b = parse_quote_response(current_shape(), None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_legacy_field_names() {
        let req = parse_quote_response(json!({ "crypto": legacy_shape() }), None).unwrap();
        assert_eq!(req.pay_to, PAY_TO);
        assert_eq!(req.asset, MINT);
        assert_eq!(req.max_amount_required, "1000000");
        assert_eq!(req.max_timeout_seconds, DEFAULT_MAX_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_missing_field_is_invalid() {
        let mut shape = current_shape();
        shape.as_object_mut().unwrap().remove("payTo");
        let err = parse_quote_response(shape, None).unwrap_err();
        assert_eq!(err, X402Error::invalid_requirement("missing payTo"));
    }

    #[test]
    fn test_resource_fallback() {
        let mut shape = current_shape();
        shape.as_object_mut().unwrap().remove("resource");
        assert!(parse_quote_response(shape.clone(), None).is_err());
        let req = parse_quote_response(shape, Some("cart_123")).unwrap();
        assert_eq!(req.resource, "cart_123");
    }

    #[test]
    fn test_cart_quote_response() {
        let mut quote = current_shape();
        quote.as_object_mut().unwrap().remove("resource");
        let cart = parse_cart_quote_response(json!({
            "cartId": "cart_abc",
            "quote": { "crypto": quote }
        }))
        .unwrap();
        assert_eq!(cart.cart_id, "cart_abc");
        assert_eq!(cart.requirement.resource, "cart_abc");
    }

    #[test]
    fn test_cart_quote_missing_id() {
        let err = parse_cart_quote_response(json!({ "quote": current_shape() })).unwrap_err();
        assert_eq!(err, X402Error::invalid_requirement("missing cartId"));
    }

    #[test]
    fn test_cart_request_sends_both_coupon_names() {
        let items = vec![CartItem::new("sku-1").with_quantity(2)];
        let body = cart_quote_request(&items, &BTreeMap::new(), Some("SAVE10"));
        assert_eq!(body["coupon"], "SAVE10");
        assert_eq!(body["couponCode"], "SAVE10");
        assert_eq!(body["items"][0]["quantity"], 2);
        assert!(body.get("metadata").is_none());
    }

    #[test]
    fn test_quote_request() {
        assert_eq!(quote_request("a", None), json!({ "resource": "a" }));
        assert_eq!(
            quote_request("a", Some("X")),
            json!({ "resource": "a", "couponCode": "X" })
        );
    }
}
