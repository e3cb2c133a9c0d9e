//! `get_product_info`: catalog lookup for the sales node.
//!
//! Product names are normalized (lowercased, whitespace runs → `-`) so that
//! "Pro Plan" and "pro-plan" resolve to the same entry. An unknown product is
//! a successful call with `success: false`, not a tool error.

use crate::args::require_fields;
use async_trait::async_trait;
use serde::Serialize;
use switchboard_core::error::ToolError;
use switchboard_core::tool::{Tool, ToolKind, ToolResult};

#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub name: &'static str,
    pub price: f64,
    pub features: &'static [&'static str],
}

static CATALOG: [(&str, Product); 3] = [
    (
        "basic-plan",
        Product {
            name: "Basic Plan",
            price: 29.99,
            features: &["Feature A", "Feature B", "Email Support"],
        },
    ),
    (
        "pro-plan",
        Product {
            name: "Pro Plan",
            price: 79.99,
            features: &["All Basic features", "Feature C", "Feature D", "Priority Support"],
        },
    ),
    (
        "enterprise-plan",
        Product {
            name: "Enterprise Plan",
            price: 199.99,
            features: &["All Pro features", "Custom integrations", "Dedicated account manager"],
        },
    ),
];

/// Catalog key for a free-form product name.
pub fn normalize(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-")
}

pub fn lookup(name: &str) -> Option<&'static Product> {
    let key = normalize(name);
    CATALOG.iter().find(|(k, _)| *k == key).map(|(_, p)| p)
}

pub struct GetProductInfoTool;

#[async_trait]
impl Tool for GetProductInfoTool {
    fn kind(&self) -> ToolKind {
        ToolKind::GetProductInfo
    }

    fn description(&self) -> &str {
        "Look up name, price and features of a product (basic-plan, pro-plan, enterprise-plan)"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "product_name": {
                    "type": "string",
                    "description": "Product to look up, e.g. 'Pro Plan'"
                }
            },
            "required": ["product_name"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        require_fields(&arguments, &["product_name"])?;
        let name = arguments["product_name"].as_str().ok_or_else(|| {
            ToolError::InvalidArguments("product_name must be a string".into())
        })?;

        match lookup(name) {
            Some(product) => Ok(ToolResult::ok(
                format!("{}: ${}", product.name, product.price),
                serde_json::json!({ "success": true, "product": product }),
            )),
            None => Ok(ToolResult {
                success: false,
                output: "Product not found".into(),
                data: Some(serde_json::json!({
                    "success": false,
                    "message": "Product not found",
                })),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalization() {
        assert_eq!(normalize("Pro Plan"), "pro-plan");
        assert_eq!(normalize("  Enterprise   plan "), "enterprise-plan");
        assert_eq!(normalize("basic-plan"), "basic-plan");
    }

    #[tokio::test]
    async fn known_product() {
        let result = GetProductInfoTool
            .execute(json!({"product_name": "Pro Plan"}))
            .await
            .unwrap();
        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["product"]["name"], "Pro Plan");
        assert_eq!(data["product"]["price"], 79.99);
        assert_eq!(data["product"]["features"][3], "Priority Support");
    }

    #[tokio::test]
    async fn unknown_product_is_not_an_error() {
        let result = GetProductInfoTool
            .execute(json!({"product_name": "Gold Plan"}))
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.data.unwrap()["message"], "Product not found");
    }

    #[tokio::test]
    async fn missing_name_is_rejected() {
        assert!(GetProductInfoTool.execute(json!({})).await.is_err());
    }
}
