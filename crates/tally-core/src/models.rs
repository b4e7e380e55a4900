//! Domain models for Tally

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Name of the fallback category returned when no strategy matches
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Canonical category taxonomy with display descriptions
///
/// Order matters: the AI prompt lists categories in this order, and
/// longest-substring resolution of AI answers scans it.
pub const STANDARD_CATEGORIES: &[(&str, &str)] = &[
    ("Groceries", "Supermarkets and food shopping"),
    ("Restaurants", "Restaurants, cafés, bars and take-away"),
    ("Transportation", "Public transport, fuel, parking and taxis"),
    ("Shopping", "Retail purchases, clothing and online stores"),
    ("Utilities", "Electricity, water, phone and internet"),
    ("Housing", "Rent, mortgage and household charges"),
    ("Insurance", "Health, liability, household and car insurance premiums"),
    ("Healthcare", "Doctors, pharmacies and medical expenses"),
    ("Entertainment", "Cinema, concerts, events and games"),
    ("Travel", "Flights, hotels and holiday bookings"),
    ("Education", "Courses, tuition and books for study"),
    ("Subscriptions", "Streaming, software and recurring memberships"),
    ("Salary", "Salary and other employment income"),
    ("Transfers", "Transfers between accounts and to other people"),
    ("Cash Withdrawals", "ATM and counter cash withdrawals"),
    ("Taxes", "Tax payments and refunds"),
    ("Bank Fees", "Account fees, card fees and interest charges"),
    ("Investments", "Securities, savings plans and pension contributions"),
    ("Donations", "Charitable donations and gifts"),
    ("Personal Care", "Hairdressers, cosmetics and wellness"),
    ("Leisure & Sports", "Sports clubs, gyms and hobbies"),
];

/// Canonical category names in taxonomy order
pub fn standard_category_names() -> Vec<String> {
    STANDARD_CATEGORIES
        .iter()
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Description for a category name
///
/// Known names (case-insensitive) use the taxonomy description; anything else
/// gets the generic "Category for X".
pub fn category_description(name: &str) -> String {
    if name.eq_ignore_ascii_case(UNCATEGORIZED) {
        return "Uncategorized transaction".to_string();
    }
    STANDARD_CATEGORIES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, description)| description.to_string())
        .unwrap_or_else(|| format!("Category for {}", name))
}

/// Normalize a party name into a mapping-table key
pub fn normalize_party(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A bank statement entry, as produced by the statement parsers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Counterparty to classify
    pub party_name: String,
    /// True when the counterparty is on the debtor side (selects the debtor table)
    #[serde(default)]
    pub is_debtor: bool,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Additional remittance info (booking text, bank code)
    #[serde(default)]
    pub info: String,
    #[serde(default)]
    pub description: String,
    /// Category assigned by an AI backend; parsers leave this empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Transaction {
    /// Create a transaction for a counterparty
    pub fn new(party_name: impl Into<String>, is_debtor: bool) -> Self {
        Self {
            party_name: party_name.into(),
            is_debtor,
            ..Default::default()
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether the party name is empty after trimming
    pub fn has_party(&self) -> bool {
        !self.party_name.trim().is_empty()
    }
}

/// A resolved category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub description: String,
}

impl Category {
    /// Build a category, deriving its description from the name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let description = category_description(&name);
        Self { name, description }
    }

    pub fn uncategorized() -> Self {
        Self::new(UNCATEGORIZED)
    }

    pub fn is_uncategorized(&self) -> bool {
        self.name.eq_ignore_ascii_case(UNCATEGORIZED)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Keyword configuration for one category, as stored in categories.yaml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl CategoryConfig {
    pub fn new(name: impl Into<String>, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Text used to embed this category: "Name: kw1, kw2"
    pub fn embedding_text(&self) -> String {
        if self.keywords.is_empty() {
            self.name.clone()
        } else {
            format!("{}: {}", self.name, self.keywords.join(", "))
        }
    }
}

/// Which strategy produced a result, in chain priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DirectMapping,
    Keyword,
    Semantic,
    Ai,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DirectMapping => "direct_mapping",
            Self::Keyword => "keyword",
            Self::Semantic => "semantic",
            Self::Ai => "ai",
        }
    }

    /// Results from these strategies are written back into the direct mappings
    pub fn is_learnable(&self) -> bool {
        matches!(self, Self::Keyword | Self::Ai)
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of running one strategy against a transaction
#[derive(Debug, Clone, Serialize)]
pub struct StrategyResult {
    pub strategy: StrategyKind,
    pub category: Option<Category>,
    pub found: bool,
    pub error: Option<String>,
    /// Informational; priority order is the tie-break
    pub confidence: f64,
}

impl StrategyResult {
    pub fn matched(strategy: StrategyKind, category: Category, confidence: f64) -> Self {
        Self {
            strategy,
            category: Some(category),
            found: true,
            error: None,
            confidence,
        }
    }

    pub fn not_found(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            category: None,
            found: false,
            error: None,
            confidence: 0.0,
        }
    }

    pub fn failed(strategy: StrategyKind, error: impl std::fmt::Display) -> Self {
        Self {
            strategy,
            category: None,
            found: false,
            error: Some(error.to_string()),
            confidence: 0.0,
        }
    }

    /// Found with a usable category and no error
    pub fn is_usable(&self) -> bool {
        self.found
            && self.error.is_none()
            && self
                .category
                .as_ref()
                .map(|c| !c.name.trim().is_empty())
                .unwrap_or(false)
    }
}

/// Pick the winning result: first usable one in chain priority order
pub fn best_result(results: &[StrategyResult]) -> Option<&StrategyResult> {
    let mut usable: Vec<&StrategyResult> = results.iter().filter(|r| r.is_usable()).collect();
    usable.sort_by_key(|r| r.strategy);
    usable.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_description_lookup() {
        assert_eq!(
            category_description("groceries"),
            "Supermarkets and food shopping"
        );
        assert_eq!(
            category_description("Uncategorized"),
            "Uncategorized transaction"
        );
        assert_eq!(category_description("Pets"), "Category for Pets");
    }

    #[test]
    fn test_normalize_party() {
        assert_eq!(normalize_party("  MIGROS Zürich "), "migros zürich");
        assert_eq!(normalize_party(""), "");
    }

    #[test]
    fn test_transaction_has_party() {
        assert!(Transaction::new("Coop", false).has_party());
        assert!(!Transaction::new("   ", true).has_party());
    }

    #[test]
    fn test_embedding_text() {
        let config = CategoryConfig::new("Groceries", &["MIGROS", "COOP"]);
        assert_eq!(config.embedding_text(), "Groceries: MIGROS, COOP");

        let bare = CategoryConfig::new("Pets", &[]);
        assert_eq!(bare.embedding_text(), "Pets");
    }

    #[test]
    fn test_strategy_kind_learnable() {
        assert!(!StrategyKind::DirectMapping.is_learnable());
        assert!(StrategyKind::Keyword.is_learnable());
        assert!(!StrategyKind::Semantic.is_learnable());
        assert!(StrategyKind::Ai.is_learnable());
    }

    #[test]
    fn test_best_result_uses_priority_order() {
        let results = vec![
            StrategyResult::matched(StrategyKind::Ai, Category::new("Shopping"), 0.7),
            StrategyResult::failed(StrategyKind::Semantic, "timeout"),
            StrategyResult::matched(StrategyKind::Keyword, Category::new("Groceries"), 0.8),
            StrategyResult::not_found(StrategyKind::DirectMapping),
        ];

        let best = best_result(&results).unwrap();
        assert_eq!(best.strategy, StrategyKind::Keyword);
        assert_eq!(best.category.as_ref().unwrap().name, "Groceries");
    }

    #[test]
    fn test_best_result_ignores_empty_names() {
        let results = vec![StrategyResult::matched(
            StrategyKind::Keyword,
            Category::new("  "),
            0.8,
        )];
        assert!(best_result(&results).is_none());
    }
}
