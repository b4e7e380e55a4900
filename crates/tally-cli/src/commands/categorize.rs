//! Categorize and explain command implementations

use anyhow::{Context, Result};
use tally_core::{best_result, EngineConfig, StrategyResult};

use super::open_categorizer;
use crate::cli::TransactionArgs;

pub async fn cmd_categorize(config: &EngineConfig, args: &TransactionArgs, json: bool) -> Result<()> {
    let categorizer = open_categorizer(config).await;
    let transaction = args.to_transaction();

    let category = categorizer
        .categorize(&transaction)
        .await
        .context("Categorization failed")?;
    categorizer.shutdown();

    if json {
        println!("{}", serde_json::to_string_pretty(&category)?);
    } else {
        println!("{} → {} ({})", transaction.party_name, category.name, category.description);
    }
    Ok(())
}

pub async fn cmd_explain(config: &EngineConfig, args: &TransactionArgs, json: bool) -> Result<()> {
    let categorizer = open_categorizer(config).await;
    let transaction = args.to_transaction();

    let results = categorizer.evaluate_all(&transaction).await;
    categorizer.shutdown();

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    println!();
    println!("🔍 {} ({})", transaction.party_name, if transaction.is_debtor { "debtor" } else { "creditor" });
    println!("   ─────────────────────────────────────────────");
    for result in &results {
        println!("   {}", describe(result));
    }
    println!();

    match best_result(&results) {
        Some(best) => println!(
            "   Winner: {} via {}",
            best.category.as_ref().map(|c| c.name.as_str()).unwrap_or_default(),
            best.strategy
        ),
        None => println!("   Winner: none (Uncategorized)"),
    }
    Ok(())
}

fn describe(result: &StrategyResult) -> String {
    match (&result.category, &result.error) {
        (_, Some(error)) => format!("{:<15} ❌ {}", result.strategy.as_str(), error),
        (Some(category), None) if result.found => format!(
            "{:<15} ✅ {} (confidence {:.2})",
            result.strategy.as_str(),
            category.name,
            result.confidence
        ),
        _ => format!("{:<15} ·  no match", result.strategy.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{Category, StrategyKind};

    #[test]
    fn test_describe_variants() {
        let matched =
            StrategyResult::matched(StrategyKind::Keyword, Category::new("Groceries"), 0.8);
        assert!(describe(&matched).contains("Groceries (confidence 0.80)"));

        let failed = StrategyResult::failed(StrategyKind::Semantic, "lock poisoned");
        assert!(describe(&failed).contains("lock poisoned"));

        let missing = StrategyResult::not_found(StrategyKind::Ai);
        assert!(describe(&missing).contains("no match"));
    }
}
