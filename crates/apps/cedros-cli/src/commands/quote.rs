//! Quote command.

use std::collections::BTreeMap;

use cedros_x402::{assets, CartItem, PaymentRequirement};

use crate::config::format_amount;
use crate::context::CliContext;
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, QuoteOutput, Render};

/// Execute the quote command.
///
/// Without `cart`, exactly one resource is quoted. With `cart`, each entry
/// is `resource[:quantity]` and the server aggregates them.
pub async fn quote(
    ctx: &CliContext,
    format: OutputFormat,
    resources: &[String],
    cart: bool,
    coupon: Option<&str>,
) -> CliResult<String> {
    let x402 = ctx.managers.x402();

    let output = if cart {
        let items = resources
            .iter()
            .map(|raw| parse_cart_item(raw))
            .collect::<CliResult<Vec<_>>>()?;
        let quote = x402
            .request_cart_quote(&items, &BTreeMap::new(), coupon)
            .await?;
        quote_output(&quote.cart_id, &quote.requirement, Some(quote.cart_id.clone()))?
    } else {
        let [resource] = resources else {
            return Err(CliError::user(
                "Quote one resource at a time, or pass --cart to quote several together",
            ));
        };
        let requirement = x402.request_quote(resource, coupon).await?;
        quote_output(resource, &requirement, None)?
    };

    Ok(output.render(format))
}

/// Parse `resource[:quantity]`.
fn parse_cart_item(raw: &str) -> CliResult<CartItem> {
    let (resource, quantity) = match raw.rsplit_once(':') {
        Some((resource, qty)) => {
            let quantity: u32 = qty
                .parse()
                .map_err(|_| CliError::user(format!("Invalid quantity in '{}'", raw)))?;
            (resource, quantity)
        }
        None => (raw, 1),
    };
    if resource.trim().is_empty() {
        return Err(CliError::user(format!("Missing resource in '{}'", raw)));
    }
    if quantity == 0 {
        return Err(CliError::user(format!("Quantity must be at least 1 in '{}'", raw)));
    }
    Ok(CartItem::new(resource.trim()).with_quantity(quantity))
}

fn quote_output(
    resource: &str,
    requirement: &PaymentRequirement,
    cart_id: Option<String>,
) -> CliResult<QuoteOutput> {
    let amount = requirement.amount()?;
    let known = assets::lookup(&requirement.asset);
    let quoted_decimals = requirement.extra.as_ref().and_then(|e| e.decimals);
    let decimals = assets::resolve_decimals(&requirement.asset, quoted_decimals, true)
        .unwrap_or(assets::FALLBACK_DECIMALS);

    Ok(QuoteOutput {
        resource: resource.to_string(),
        amount,
        display_amount: format_amount(amount, decimals),
        asset: requirement.asset.clone(),
        symbol: known.map(|a| a.symbol.to_string()),
        pay_to: requirement.pay_to.clone(),
        network: requirement.network.clone(),
        gasless: requirement.is_gasless(),
        description: requirement.description.clone(),
        cart_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cart_item() {
        let item = parse_cart_item("article-1:3").unwrap();
        assert_eq!(item.resource, "article-1");
        assert_eq!(item.quantity, 3);

        let item = parse_cart_item("article-2").unwrap();
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn test_parse_cart_item_rejects_bad_input() {
        assert!(parse_cart_item("article-1:zero").is_err());
        assert!(parse_cart_item("article-1:0").is_err());
        assert!(parse_cart_item(":2").is_err());
    }
}
