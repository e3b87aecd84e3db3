use anyhow::Result;

use couponbase::config::Config;
use couponbase::ingest::LoadReport;

pub async fn load(config: &Config, json: bool) -> Result<()> {
    let (_registry, report) = super::load_registry(config).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

pub fn print_report(report: &LoadReport) {
    println!("Coupon Sources Loaded");
    println!("=====================");
    for stats in &report.sources {
        println!(
            "  Source {} ({}): {} lines, {} distinct codes, {} ms{}",
            stats.source,
            stats.locator,
            stats.lines_read,
            stats.distinct_codes,
            stats.elapsed.as_millis(),
            if stats.interrupted { " [INTERRUPTED]" } else { "" }
        );
    }
    println!();
    println!("  Total distinct codes: {}", report.total_codes);
    println!("  In one source:        {}", report.in_one);
    println!("  In two sources:       {}", report.in_two);
    println!("  In three sources:     {}", report.in_three);

    if report.is_lossy() {
        println!();
        println!("  Warning: at least one source ended early on a read error");
    }
}
