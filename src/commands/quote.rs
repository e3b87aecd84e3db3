use anyhow::{Context, Result};
use rust_decimal::Decimal;

use couponbase::config::Config;
use couponbase::orders::{DiscountPolicy, LineItem, OrderPricer};

pub async fn quote(config: &Config, items: &[LineItem], coupon: Option<&str>) -> Result<()> {
    let (validator, _report) = super::load_validator(config).await?;
    let pricer = OrderPricer::new(validator, DiscountPolicy::new(config.validator.discount_rate));

    let quote = pricer.quote(items, coupon).context("Failed to price order")?;

    println!("Order Quote");
    println!("===========");
    for item in &quote.items {
        println!(
            "  {} x{} @ {} = {}",
            item.product_id,
            item.quantity,
            item.unit_price,
            // Already checked by the pricer
            item.subtotal().unwrap_or_default()
        );
    }
    println!("  Subtotal: {}", quote.subtotal);
    println!(
        "  Discount: {}{}",
        quote.discount,
        if quote.coupon_applied { " (coupon applied)" } else { "" }
    );
    println!("  Total:    {}", quote.total);

    Ok(())
}

/// Parse `PRODUCT:UNIT_PRICE:QUANTITY`
pub fn parse_line_item(raw: &str) -> Result<LineItem, String> {
    let mut parts = raw.rsplitn(3, ':');
    let (Some(quantity), Some(price), Some(product)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(format!("expected PRODUCT:UNIT_PRICE:QUANTITY, got '{raw}'"));
    };

    let unit_price = price
        .parse::<Decimal>()
        .map_err(|e| format!("invalid unit price '{price}': {e}"))?;
    let quantity = quantity
        .parse::<u32>()
        .map_err(|e| format!("invalid quantity '{quantity}': {e}"))?;

    Ok(LineItem::new(product, unit_price, quantity))
}
