//! Mapping table and category command implementations

use anyhow::{Context, Result};
use tally_core::{EngineConfig, STANDARD_CATEGORIES, UNCATEGORIZED};

use super::{open_local_categorizer, truncate};

pub fn cmd_map(config: &EngineConfig, party: &str, category: &str, debtor: bool) -> Result<()> {
    let categorizer = open_local_categorizer(config);

    if debtor {
        categorizer.update_debtor_mapping(party, category)?;
    } else {
        categorizer.update_creditor_mapping(party, category)?;
    }
    categorizer
        .save_mappings()
        .with_context(|| format!("Failed to save mappings in {}", config.data_dir().display()))?;

    let table = if debtor { "debtor" } else { "creditor" };
    println!("✅ Mapped '{}' → {} ({} table)", party.trim(), category.trim(), table);
    Ok(())
}

pub fn cmd_mappings(config: &EngineConfig, debtor: bool) -> Result<()> {
    let categorizer = open_local_categorizer(config);
    let table = if debtor {
        categorizer.debtor_mappings()?
    } else {
        categorizer.creditor_mappings()?
    };
    let label = if debtor { "Debtor" } else { "Creditor" };

    if table.is_empty() {
        println!("No {} mappings in {}.", label.to_lowercase(), config.data_dir().display());
        return Ok(());
    }

    let mut entries: Vec<_> = table.into_iter().collect();
    entries.sort();

    println!();
    println!("📒 {} mappings ({})", label, entries.len());
    println!("   ─────────────────────────────────────────────────────────────");
    for (party, category) in &entries {
        println!("   {:<40} {}", truncate(party, 40), category);
    }
    Ok(())
}

pub fn cmd_categories(config: &EngineConfig) -> Result<()> {
    let categorizer = open_local_categorizer(config);

    println!();
    println!("🏷️  Categories");
    println!("   ─────────────────────────────────────────────────────────────");
    for (name, description) in STANDARD_CATEGORIES {
        println!("   • {:<18} {}", name, description);
    }
    println!("   • {:<18} Uncategorized transaction", UNCATEGORIZED);

    let configured = categorizer.categories()?;
    if configured.is_empty() {
        println!();
        println!("No keyword categories configured in {}.", config.data_dir().display());
        return Ok(());
    }

    println!();
    println!("🔑 Keyword categories");
    println!("   ─────────────────────────────────────────────────────────────");
    for category in configured.iter() {
        println!("   • {:<18} {}", category.name, truncate(&category.keywords.join(", "), 60));
    }
    Ok(())
}
