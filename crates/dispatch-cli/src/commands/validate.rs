use std::path::Path;

use anyhow::{Result, bail};
use dispatch_config::Config;

use super::{load_catalog, load_draft};

pub fn handle(path: &Path, json: bool, config: &Config) -> Result<()> {
    let draft = load_draft(path)?;
    let violations = match load_catalog(config)? {
        Some(catalog) => draft.validate_with_catalog(&catalog),
        None => draft.validate(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&violations)?);
    } else if violations.is_empty() {
        let pricing = draft.pricing();
        println!("✓ Draft is ready to submit");
        println!("  Items: {}", draft.items().len());
        println!("  Grand total: {}", pricing.grand_total);
        println!("  Discount: {}", pricing.discount_amount);
        println!("  Final amount: {}", pricing.final_amount);
    } else {
        println!("Draft has {} violation(s):", violations.len());
        for violation in &violations {
            println!("  {}: {}", violation.field(), violation);
        }
    }

    if !violations.is_empty() {
        bail!("draft {} is not valid", path.display());
    }
    Ok(())
}
