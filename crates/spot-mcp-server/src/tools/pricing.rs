//! Market pricing.

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};
use spot_client::SpotClient;

use super::{command, string_args};
use crate::error::CommandError;
use crate::policy::Capability;
use crate::registry::CommandDefinition;

#[derive(Debug, Deserialize)]
struct PricingArgs {
    #[serde(default)]
    region: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PriceHistoryArgs {
    server_class: String,
}

pub(super) fn commands(client: &SpotClient) -> Result<Vec<CommandDefinition>> {
    Ok(vec![
        command(
            "get_spot_pricing",
            "Summarize current spot market and on-demand prices per server class, optionally for one region.",
            json!({
                "type": "object",
                "properties": {
                    "region": { "type": "string", "description": "Only include server classes in this region" }
                }
            }),
            Capability::Read,
            client,
            |client, args: PricingArgs| async move {
                let classes = client.list_server_classes().await?;
                Ok::<_, CommandError>(summarize_pricing(&classes, args.region.as_deref()))
            },
        )?,
        command(
            "get_price_history",
            "Get the spot market price history of a server class.",
            string_args(&[("server_class", "Server class name")]),
            Capability::Read,
            client,
            |client, args: PriceHistoryArgs| async move {
                client
                    .get_price_history(&args.server_class)
                    .await
                    .map_err(CommandError::from)
            },
        )?,
    ])
}

/// Project a server class list onto name, region, shape and prices.
pub fn summarize_pricing(server_classes: &Value, region: Option<&str>) -> Value {
    let items = server_classes
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let summary: Vec<Value> = items
        .iter()
        .filter(|item| match region {
            Some(region) => str_at(item, "/spec/region") == Some(region),
            None => true,
        })
        .map(|item| {
            json!({
                "name": str_at(item, "/metadata/name"),
                "region": str_at(item, "/spec/region"),
                "category": str_at(item, "/spec/category"),
                "cpu": item.pointer("/spec/resources/cpu").cloned().unwrap_or(Value::Null),
                "memory": item.pointer("/spec/resources/memory").cloned().unwrap_or(Value::Null),
                "spotMarketPricePerHour": item
                    .pointer("/status/spotPricing/marketPricePerHour")
                    .cloned()
                    .unwrap_or(Value::Null),
                "onDemandPricePerHour": item
                    .pointer("/status/onDemandPricing/cost")
                    .cloned()
                    .unwrap_or(Value::Null),
                "available": item.pointer("/status/available").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    json!({ "count": summary.len(), "serverClasses": summary })
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> Value {
        json!({
            "items": [
                {
                    "metadata": { "name": "gp.vs1.medium-dfw" },
                    "spec": { "region": "us-central-dfw-1", "category": "General Purpose",
                              "resources": { "cpu": "2", "memory": "4GB" } },
                    "status": { "spotPricing": { "marketPricePerHour": "0.002" },
                                "onDemandPricing": { "cost": "0.06" }, "available": 40 }
                },
                {
                    "metadata": { "name": "ch.vs1.large-lon" },
                    "spec": { "region": "uk-lon-1", "category": "Compute Heavy" }
                }
            ]
        })
    }

    #[test]
    fn projects_prices() {
        let summary = summarize_pricing(&classes(), None);
        assert_eq!(summary["count"], 2);
        let first = &summary["serverClasses"][0];
        assert_eq!(first["name"], "gp.vs1.medium-dfw");
        assert_eq!(first["spotMarketPricePerHour"], "0.002");
        assert_eq!(first["onDemandPricePerHour"], "0.06");
        assert!(summary["serverClasses"][1]["spotMarketPricePerHour"].is_null());
    }

    #[test]
    fn filters_by_region() {
        let summary = summarize_pricing(&classes(), Some("uk-lon-1"));
        assert_eq!(summary["count"], 1);
        assert_eq!(summary["serverClasses"][0]["name"], "ch.vs1.large-lon");
    }

    #[test]
    fn tolerates_unexpected_shapes() {
        assert_eq!(summarize_pricing(&Value::Null, None)["count"], 0);
        assert_eq!(summarize_pricing(&json!({"items": "x"}), None)["count"], 0);
    }
}
