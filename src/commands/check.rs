use anyhow::Result;

use couponbase::config::Config;
use couponbase::validator::{CouponVerdict, REQUIRED_SOURCES};

pub async fn check(config: &Config, codes: &[String]) -> Result<()> {
    let (validator, _report) = super::load_validator(config).await?;
    let rule = *validator.rule();

    for code in codes {
        let verdict = validator.check(code);
        let detail = match verdict {
            CouponVerdict::Valid => "valid".to_string(),
            CouponVerdict::BadLength(len) => format!(
                "invalid (length {len}, expected {}..={})",
                rule.min_length, rule.max_length
            ),
            CouponVerdict::SourceCount(n) => format!(
                "invalid (found in {n} source(s), expected {REQUIRED_SOURCES})"
            ),
        };
        println!("{code}: {detail}");
    }

    Ok(())
}
