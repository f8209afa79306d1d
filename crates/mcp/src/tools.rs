//! Cart tool catalog
//!
//! - `add_to_cart`: aggregating add into the active cart
//! - `checkout`: clear the cart and report what it held

use cartsync_core::domain::cart::{CartId, CartItem};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::protocol::widget_meta;
use crate::{McpError, McpResult};

pub const ADD_TO_CART: &str = "add_to_cart";
pub const CHECKOUT: &str = "checkout";

/// All tool names
pub const ALL_TOOL_NAMES: &[&str] = &[ADD_TO_CART, CHECKOUT];

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddToCartInput {
    #[schemars(description = "Items to add. Quantities of items already in the cart are summed.")]
    pub items: Vec<CartItem>,

    #[schemars(description = "Cart to add to. Omit to start a new cart.")]
    #[serde(default)]
    pub cart_id: Option<CartId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckoutInput {
    #[schemars(description = "Cart to check out.")]
    pub cart_id: CartId,
}

/// A validated `tools/call` target.
#[derive(Debug, Clone)]
pub enum CartTool {
    AddToCart(AddToCartInput),
    Checkout(CheckoutInput),
}

impl CartTool {
    /// Resolves the tool name first so an unknown tool is never reported as
    /// bad arguments.
    pub fn parse(name: &str, arguments: Value) -> McpResult<Self> {
        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        match name {
            ADD_TO_CART => serde_json::from_value(arguments)
                .map(CartTool::AddToCart)
                .map_err(|error| McpError::InvalidArguments(error.to_string())),
            CHECKOUT => serde_json::from_value(arguments)
                .map(CartTool::Checkout)
                .map_err(|error| McpError::InvalidArguments(error.to_string())),
            other => Err(McpError::UnknownTool(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CartTool::AddToCart(_) => ADD_TO_CART,
            CartTool::Checkout(_) => CHECKOUT,
        }
    }
}

/// Static `tools/list` payload.
pub fn tool_descriptors() -> Value {
    json!({
        "tools": [
            {
                "name": ADD_TO_CART,
                "title": "Add items to cart",
                "description": "Adds the provided items to the active cart and returns its state.",
                "inputSchema": input_schema::<AddToCartInput>(),
                "_meta": widget_meta(None),
            },
            {
                "name": CHECKOUT,
                "title": "Checkout",
                "description": "Checks out the current cart, clearing it and returning a receipt.",
                "inputSchema": input_schema::<CheckoutInput>(),
                "_meta": widget_meta(None),
            },
        ],
        "_meta": widget_meta(None),
    })
}

fn input_schema<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| json!({}));
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    schema
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[test]
    fn test_tool_counts() {
        let listed = tool_descriptors();
        let names: Vec<&str> = listed["tools"]
            .as_array()
            .expect("tools array")
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect();
        assert_eq!(names, ALL_TOOL_NAMES);
    }

    #[test]
    fn add_to_cart_schema_requires_items_and_names() {
        let schema = input_schema::<AddToCartInput>();
        let required = schema["required"].as_array().expect("required");
        assert!(required.contains(&json!("items")));
        assert!(schema["properties"]["cartId"].is_object());
    }

    #[test]
    fn unknown_tool_is_classified_before_arguments() {
        let error = CartTool::parse("remove_from_cart", Value::Null).expect_err("unknown");
        assert_eq!(error.kind(), "unknown_tool");
    }

    #[test]
    fn schema_violations_are_invalid_arguments() {
        let missing_name = CartTool::parse(ADD_TO_CART, json!({ "items": [{ "quantity": 2 }] }))
            .expect_err("name required");
        assert_eq!(missing_name.kind(), "invalid_arguments");

        let negative =
            CartTool::parse(ADD_TO_CART, json!({ "items": [{ "name": "Eggs", "quantity": -1 }] }))
                .expect_err("negative quantity");
        assert_eq!(negative.kind(), "invalid_arguments");

        let stray = CartTool::parse(CHECKOUT, json!({ "cartId": "C1", "coupon": "X" }))
            .expect_err("unknown field");
        assert_eq!(stray.kind(), "invalid_arguments");

        let no_cart = CartTool::parse(CHECKOUT, Value::Null).expect_err("cart id required");
        assert_eq!(no_cart.kind(), "invalid_arguments");
    }

    #[test]
    fn item_metadata_passes_through_arguments() {
        let tool = CartTool::parse(
            ADD_TO_CART,
            json!({ "cartId": "C1", "items": [{ "name": "Eggs", "color": "brown" }] }),
        )
        .expect("valid");

        match tool {
            CartTool::AddToCart(input) => {
                assert_eq!(input.items[0].quantity, 1);
                assert_eq!(input.items[0].extra["color"], json!("brown"));
            }
            CartTool::Checkout(_) => panic!("wrong tool"),
        }
    }
}
