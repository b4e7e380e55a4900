//! Keyword matching against configured and built-in tables
//!
//! Matching is a case-insensitive substring search over the party name and
//! the remittance info. Configured categories come first, in declared order;
//! the built-in tables are ordered slices, so the first hit always wins.
//!
//! Built-in merchant names and point-of-sale hints of up to four characters
//! ("SBB", "UPC", "POS") only match as whole words.

use std::sync::{Arc, OnceLock, RwLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Category, CategoryConfig, StrategyKind, Transaction};

use super::CategorizationStrategy;

/// Well-known merchants, matched against party name and info
///
/// Grocery chains come before the generic "RESTAURANT" entry so a
/// supermarket's in-store restaurant stays under Groceries.
const MERCHANT_KEYWORDS: &[(&str, &str)] = &[
    // Groceries
    ("MIGROS", "Groceries"),
    ("COOP", "Groceries"),
    ("DENNER", "Groceries"),
    ("ALDI", "Groceries"),
    ("LIDL", "Groceries"),
    ("SPAR", "Groceries"),
    ("VOLG", "Groceries"),
    ("MANOR FOOD", "Groceries"),
    ("GLOBUS DELICATESSA", "Groceries"),
    ("FARMY", "Groceries"),
    // Restaurants
    ("MCDONALD", "Restaurants"),
    ("BURGER KING", "Restaurants"),
    ("STARBUCKS", "Restaurants"),
    ("SUBWAY", "Restaurants"),
    ("UBER EATS", "Restaurants"),
    ("JUST EAT", "Restaurants"),
    ("EAT.CH", "Restaurants"),
    ("RESTAURANT", "Restaurants"),
    ("PIZZERIA", "Restaurants"),
    ("CAFE", "Restaurants"),
    ("BAECKEREI", "Restaurants"),
    ("BÄCKEREI", "Restaurants"),
    // Transportation
    ("SBB", "Transportation"),
    ("CFF", "Transportation"),
    ("FFS", "Transportation"),
    ("BLS AG", "Transportation"),
    ("POSTAUTO", "Transportation"),
    ("CAR POSTAL", "Transportation"),
    ("ZVV", "Transportation"),
    ("VBZ", "Transportation"),
    ("BERNMOBIL", "Transportation"),
    ("UBER", "Transportation"),
    ("MOBILITY", "Transportation"),
    ("PUBLIBIKE", "Transportation"),
    ("PARKING", "Transportation"),
    ("PARKHAUS", "Transportation"),
    ("SHELL", "Transportation"),
    ("BP", "Transportation"),
    ("AVIA", "Transportation"),
    ("TAMOIL", "Transportation"),
    ("SOCAR", "Transportation"),
    ("AGROLA", "Transportation"),
    // Utilities
    ("SWISSCOM", "Utilities"),
    ("SUNRISE", "Utilities"),
    ("SALT MOBILE", "Utilities"),
    ("UPC", "Utilities"),
    ("EWZ", "Utilities"),
    ("BKW", "Utilities"),
    ("AXPO", "Utilities"),
    ("SERAFE", "Utilities"),
    ("BILLAG", "Utilities"),
    // Insurance
    ("HELSANA", "Insurance"),
    ("SWICA", "Insurance"),
    ("SANITAS", "Insurance"),
    ("VISANA", "Insurance"),
    ("CONCORDIA", "Insurance"),
    ("ASSURA", "Insurance"),
    ("GROUPE MUTUEL", "Insurance"),
    ("KPT", "Insurance"),
    ("CSS VERSICHERUNG", "Insurance"),
    ("CSS KRANKEN", "Insurance"),
    ("AXA", "Insurance"),
    ("MOBILIAR", "Insurance"),
    ("ALLIANZ", "Insurance"),
    ("GENERALI", "Insurance"),
    ("ZURICH VERSICHERUNG", "Insurance"),
    ("BALOISE", "Insurance"),
    ("HELVETIA", "Insurance"),
    ("VERSICHERUNG", "Insurance"),
    ("ASSURANCE", "Insurance"),
    // Healthcare
    ("APOTHEKE", "Healthcare"),
    ("PHARMACIE", "Healthcare"),
    ("FARMACIA", "Healthcare"),
    ("AMAVITA", "Healthcare"),
    ("SUN STORE", "Healthcare"),
    ("TOPPHARM", "Healthcare"),
    ("ZAHNARZT", "Healthcare"),
    ("SPITAL", "Healthcare"),
    ("HOPITAL", "Healthcare"),
    ("ARZTPRAXIS", "Healthcare"),
    // Subscriptions
    ("NETFLIX", "Subscriptions"),
    ("SPOTIFY", "Subscriptions"),
    ("DISNEY PLUS", "Subscriptions"),
    ("DISNEY+", "Subscriptions"),
    ("APPLE.COM/BILL", "Subscriptions"),
    ("GOOGLE STORAGE", "Subscriptions"),
    ("YOUTUBE PREMIUM", "Subscriptions"),
    ("ADOBE", "Subscriptions"),
    ("MICROSOFT 365", "Subscriptions"),
    // Shopping
    ("GALAXUS", "Shopping"),
    ("DIGITEC", "Shopping"),
    ("ZALANDO", "Shopping"),
    ("AMAZON", "Shopping"),
    ("AMZN", "Shopping"),
    ("IKEA", "Shopping"),
    ("H&M", "Shopping"),
    ("ZARA", "Shopping"),
    ("MEDIA MARKT", "Shopping"),
    ("INTERDISCOUNT", "Shopping"),
    ("BRACK.CH", "Shopping"),
    ("JUMBO", "Shopping"),
    ("HORNBACH", "Shopping"),
    ("OCHSNER", "Shopping"),
    ("DOUGLAS", "Personal Care"),
    ("COIFFEUR", "Personal Care"),
    ("FRISEUR", "Personal Care"),
    // Travel
    ("SWISS INTERNATIONAL", "Travel"),
    ("EASYJET", "Travel"),
    ("RYANAIR", "Travel"),
    ("BOOKING.COM", "Travel"),
    ("AIRBNB", "Travel"),
    ("HOTEL", "Travel"),
    // Entertainment and leisure
    ("KITAG", "Entertainment"),
    ("PATHE", "Entertainment"),
    ("TICKETCORNER", "Entertainment"),
    ("STEAM", "Entertainment"),
    ("FITNESS", "Leisure & Sports"),
    ("INJOY", "Leisure & Sports"),
    ("DECATHLON", "Leisure & Sports"),
    ("SPORT XX", "Leisure & Sports"),
    // Taxes and housing
    ("STEUERVERWALTUNG", "Taxes"),
    ("STEUERAMT", "Taxes"),
    ("ADMINISTRATION FISCALE", "Taxes"),
    ("ESTV", "Taxes"),
    ("MIETE", "Housing"),
    ("LOYER", "Housing"),
    ("IMMOBILIEN", "Housing"),
    ("LIEGENSCHAFT", "Housing"),
    // Donations
    ("CARITAS", "Donations"),
    ("GLUECKSKETTE", "Donations"),
    ("GLÜCKSKETTE", "Donations"),
    ("UNICEF", "Donations"),
    ("ROTES KREUZ", "Donations"),
];

/// Booking codes and booking texts banks put into the remittance info
const BANK_CODE_KEYWORDS: &[(&str, &str)] = &[
    ("BANCOMAT", "Cash Withdrawals"),
    ("GELDAUTOMAT", "Cash Withdrawals"),
    ("ATM WITHDRAWAL", "Cash Withdrawals"),
    ("CASH WITHDRAWAL", "Cash Withdrawals"),
    ("BARGELDBEZUG", "Cash Withdrawals"),
    ("RETRAIT", "Cash Withdrawals"),
    ("PRELIEVO", "Cash Withdrawals"),
    ("KONTOFUEHRUNG", "Bank Fees"),
    ("KONTOFÜHRUNG", "Bank Fees"),
    ("ACCOUNT FEE", "Bank Fees"),
    ("CARD FEE", "Bank Fees"),
    ("KARTENGEBUEHR", "Bank Fees"),
    ("KARTENGEBÜHR", "Bank Fees"),
    ("JAHRESGEBUEHR", "Bank Fees"),
    ("JAHRESGEBÜHR", "Bank Fees"),
    ("FRAIS DE TENUE", "Bank Fees"),
    ("SOLLZINS", "Bank Fees"),
    ("LOHN", "Salary"),
    ("GEHALT", "Salary"),
    ("SALAIRE", "Salary"),
    ("SALARIO", "Salary"),
    ("SALARY", "Salary"),
    ("DAUERAUFTRAG", "Transfers"),
    ("STANDING ORDER", "Transfers"),
    ("ORDRE PERMANENT", "Transfers"),
    ("KONTOUEBERTRAG", "Transfers"),
    ("KONTOÜBERTRAG", "Transfers"),
    ("E-BANKING", "Transfers"),
    ("EBANKING", "Transfers"),
    ("TRANSFER", "Transfers"),
    ("VIREMENT", "Transfers"),
    ("WERTSCHRIFTEN", "Investments"),
    ("SECURITIES", "Investments"),
    ("SAEULE 3A", "Investments"),
    ("SÄULE 3A", "Investments"),
];

/// Party names banks use when the counterparty is not identified
const UNIDENTIFIED_PARTIES: &[&str] = &[
    "unknown",
    "n/a",
    "-",
    "unbekannt",
    "inconnu",
    "sconosciuto",
];

/// Booking texts of point-of-sale payments
const POINT_OF_SALE_HINTS: &[&str] = &[
    "CARD",
    "KARTE",
    "CARTE",
    "CARTA",
    "TWINT",
    "POS",
    "DEBIT",
    "MAESTRO",
    "VISA",
    "MASTERCARD",
    "WITHDRAWAL",
    "BEZUG",
    "ACHAT",
    "EINKAUF",
];

const POINT_OF_SALE_CATEGORY: &str = "Shopping";

/// Keywords up to this many characters must stand alone
const SHORT_KEYWORD_CHARS: usize = 4;

fn masked_party_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9*xX\s]+$").expect("valid regex"))
}

/// Whether the party name says "we don't know who this is"
fn is_unidentified_party(party_name: &str) -> bool {
    let trimmed = party_name.trim();
    if trimmed.is_empty() {
        return false;
    }
    let lower = trimmed.to_lowercase();
    if UNIDENTIFIED_PARTIES.contains(&lower.as_str()) {
        return true;
    }
    // Masked card numbers: "****1234", "5500 00** **** 0004"
    masked_party_regex().is_match(trimmed)
        && trimmed.chars().any(|c| c.is_ascii_digit() || c == '*')
}

fn short_keyword_regex(keyword: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b{}\b", regex::escape(keyword))).ok()
}

/// A built-in keyword; short ones carry a whole-word pattern
struct Matcher {
    keyword: &'static str,
    category: &'static str,
    whole_word: Option<Regex>,
}

impl Matcher {
    fn compile(table: &[(&'static str, &'static str)]) -> Vec<Matcher> {
        table
            .iter()
            .map(|&(keyword, category)| Matcher {
                keyword,
                category,
                whole_word: (keyword.chars().count() <= SHORT_KEYWORD_CHARS)
                    .then(|| short_keyword_regex(keyword))
                    .flatten(),
            })
            .collect()
    }

    fn is_match(&self, haystack: &str) -> bool {
        match self.whole_word {
            Some(ref re) => re.is_match(haystack),
            None => haystack.contains(self.keyword),
        }
    }
}

fn merchant_matchers() -> &'static [Matcher] {
    static MATCHERS: OnceLock<Vec<Matcher>> = OnceLock::new();
    MATCHERS.get_or_init(|| Matcher::compile(MERCHANT_KEYWORDS))
}

fn point_of_sale_matchers() -> &'static [Matcher] {
    static MATCHERS: OnceLock<Vec<Matcher>> = OnceLock::new();
    MATCHERS.get_or_init(|| {
        let table: Vec<_> = POINT_OF_SALE_HINTS
            .iter()
            .map(|&hint| (hint, POINT_OF_SALE_CATEGORY))
            .collect();
        Matcher::compile(&table)
    })
}

fn find_matcher<'a>(matchers: &'a [Matcher], haystacks: &[&str]) -> Option<&'a Matcher> {
    matchers
        .iter()
        .find(|m| haystacks.iter().any(|h| m.is_match(h)))
}

fn find_in<'a>(table: &'a [(&'a str, &'a str)], haystacks: &[&str]) -> Option<(&'a str, &'a str)> {
    table
        .iter()
        .find(|(keyword, _)| haystacks.iter().any(|h| h.contains(keyword)))
        .copied()
}

/// Substring matching on configured and built-in keyword tables
pub struct KeywordStrategy {
    categories: RwLock<Arc<Vec<CategoryConfig>>>,
}

impl KeywordStrategy {
    pub fn new(categories: Vec<CategoryConfig>) -> Self {
        Self {
            categories: RwLock::new(Arc::new(categories)),
        }
    }

    /// Replace the configured categories wholesale
    pub fn reload_categories(&self, categories: Vec<CategoryConfig>) -> Result<()> {
        let fresh = Arc::new(categories);
        let mut current = self
            .categories
            .write()
            .map_err(|_| Error::Lock("keyword categories".into()))?;
        *current = fresh;
        Ok(())
    }

    /// Current configured categories
    pub fn categories(&self) -> Result<Arc<Vec<CategoryConfig>>> {
        self.categories
            .read()
            .map(|c| Arc::clone(&c))
            .map_err(|_| Error::Lock("keyword categories".into()))
    }

    /// Find a category name for the transaction
    pub fn match_transaction(&self, transaction: &Transaction) -> Result<Option<String>> {
        if !transaction.has_party() {
            return Ok(None);
        }

        let party = transaction.party_name.to_uppercase();
        let info = transaction.info.to_uppercase();
        let description = transaction.description.to_uppercase();

        let configured = self.categories()?;
        for config in configured.iter() {
            let hit = config
                .keywords
                .iter()
                .map(|k| k.trim().to_uppercase())
                .filter(|k| !k.is_empty())
                .find(|k| party.contains(k.as_str()) || info.contains(k.as_str()));
            if let Some(keyword) = hit {
                debug!(party = %transaction.party_name, category = %config.name, keyword = %keyword, "Configured keyword match");
                return Ok(Some(config.name.clone()));
            }
        }

        if let Some(merchant) = find_matcher(merchant_matchers(), &[&party, &info]) {
            debug!(
                party = %transaction.party_name,
                category = merchant.category,
                keyword = merchant.keyword,
                "Built-in merchant match"
            );
            return Ok(Some(merchant.category.to_string()));
        }

        if let Some((code, category)) = find_in(BANK_CODE_KEYWORDS, &[&info, &description]) {
            debug!(party = %transaction.party_name, category, code, "Bank code match");
            return Ok(Some(category.to_string()));
        }

        if is_unidentified_party(&transaction.party_name)
            && find_matcher(point_of_sale_matchers(), &[&description, &info]).is_some()
        {
            debug!(party = %transaction.party_name, "Unidentified point-of-sale payment");
            return Ok(Some(POINT_OF_SALE_CATEGORY.to_string()));
        }

        Ok(None)
    }
}

#[async_trait]
impl CategorizationStrategy for KeywordStrategy {
    async fn categorize(&self, transaction: &Transaction) -> Result<Option<Category>> {
        Ok(self.match_transaction(transaction)?.map(Category::new))
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Keyword
    }

    fn confidence(&self) -> f64 {
        0.8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(strategy: &KeywordStrategy, tx: &Transaction) -> Option<String> {
        strategy.match_transaction(tx).unwrap()
    }

    #[test]
    fn test_sbb_is_transportation() {
        let s = KeywordStrategy::new(vec![]);
        let tx = Transaction::new("SBB CFF FFS", true).with_info("Train ticket");
        assert_eq!(matched(&s, &tx).as_deref(), Some("Transportation"));
    }

    #[test]
    fn test_configured_categories_win_in_declared_order() {
        let s = KeywordStrategy::new(vec![
            CategoryConfig::new("Lunch", &["restaurant"]),
            CategoryConfig::new("Coop Stuff", &["COOP"]),
        ]);
        let tx = Transaction::new("COOP Restaurant", false);
        assert_eq!(matched(&s, &tx).as_deref(), Some("Lunch"));
    }

    #[test]
    fn test_configured_keywords_match_info() {
        let s = KeywordStrategy::new(vec![CategoryConfig::new("Kids", &["Kita"])]);
        let tx = Transaction::new("Stadt Zürich", true).with_info("KITA Sonnenschein März");
        assert_eq!(matched(&s, &tx).as_deref(), Some("Kids"));
    }

    #[test]
    fn test_blank_keywords_are_ignored() {
        let s = KeywordStrategy::new(vec![CategoryConfig::new("Everything", &["", "  "])]);
        let tx = Transaction::new("Random Party", false);
        assert_eq!(matched(&s, &tx), None);
    }

    #[test]
    fn test_supermarket_restaurant_stays_groceries() {
        let s = KeywordStrategy::new(vec![]);
        let tx = Transaction::new("Migros Restaurant Bern", false);
        assert_eq!(matched(&s, &tx).as_deref(), Some("Groceries"));
    }

    #[test]
    fn test_bank_codes_use_info_and_description() {
        let s = KeywordStrategy::new(vec![]);
        let atm = Transaction::new("ZKB", true).with_description("Bancomat Bezug 12.03.");
        assert_eq!(matched(&s, &atm).as_deref(), Some("Cash Withdrawals"));

        let salary = Transaction::new("Acme Solutions GmbH", false).with_info("LOHN 03/2024");
        assert_eq!(matched(&s, &salary).as_deref(), Some("Salary"));
    }

    #[test]
    fn test_unidentified_card_payment_is_shopping() {
        let s = KeywordStrategy::new(vec![]);
        for party in ["unknown", "N/A", "-", "Unbekannt", "inconnu", "****1234", "5500 00** **** 0004"] {
            let tx = Transaction::new(party, true).with_description("TWINT payment");
            assert_eq!(matched(&s, &tx).as_deref(), Some("Shopping"), "party {}", party);
        }
    }

    #[test]
    fn test_unidentified_without_payment_hint_not_found() {
        let s = KeywordStrategy::new(vec![]);
        let tx = Transaction::new("unknown", true).with_description("Gutschrift");
        assert_eq!(matched(&s, &tx), None);
    }

    #[test]
    fn test_identified_party_does_not_trigger_point_of_sale_rule() {
        let s = KeywordStrategy::new(vec![]);
        let tx = Transaction::new("Hans Muster", true).with_description("TWINT payment");
        assert_eq!(matched(&s, &tx), None);
    }

    #[test]
    fn test_short_merchant_keywords_match_whole_words() {
        let s = KeywordStrategy::new(vec![]);

        let cupcake = Transaction::new("Cupcake Affair", false);
        assert_eq!(matched(&s, &cupcake), None);
        let sparkasse = Transaction::new("Sparkasse Schwyz", false);
        assert_eq!(matched(&s, &sparkasse), None);

        let spar = Transaction::new("Spar", false);
        assert_eq!(matched(&s, &spar).as_deref(), Some("Groceries"));
        let bp = Transaction::new("BP", false).with_info("Tankstelle Dietikon");
        assert_eq!(matched(&s, &bp).as_deref(), Some("Transportation"));
        let upc = Transaction::new("UPC Schweiz GmbH", true);
        assert_eq!(matched(&s, &upc).as_deref(), Some("Utilities"));
        let amazon = Transaction::new("AMZN*MKTP DE", true);
        assert_eq!(matched(&s, &amazon).as_deref(), Some("Shopping"));
    }

    #[test]
    fn test_point_of_sale_hint_needs_whole_word() {
        let s = KeywordStrategy::new(vec![]);
        let postal = Transaction::new("****1234", true).with_description("Postfinance Gutschrift");
        assert_eq!(matched(&s, &postal), None);

        let pos = Transaction::new("****1234", true).with_description("POS 12.03. Zürich");
        assert_eq!(matched(&s, &pos).as_deref(), Some("Shopping"));
    }

    #[test]
    fn test_empty_party_not_found() {
        let s = KeywordStrategy::new(vec![CategoryConfig::new("Any", &["X"])]);
        let tx = Transaction::new("", false).with_info("X SBB card");
        assert_eq!(matched(&s, &tx), None);
    }

    #[test]
    fn test_reload_categories_replaces_list() {
        let s = KeywordStrategy::new(vec![CategoryConfig::new("Old", &["ACME"])]);
        s.reload_categories(vec![CategoryConfig::new("New", &["ACME"])])
            .unwrap();
        let tx = Transaction::new("Acme Corp", false);
        assert_eq!(matched(&s, &tx).as_deref(), Some("New"));
        assert_eq!(s.categories().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_strategy_trait_wraps_category() {
        let s = KeywordStrategy::new(vec![]);
        let category = s
            .categorize(&Transaction::new("Netflix.com", false))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(category.name, "Subscriptions");
        assert_eq!(s.name(), "keyword");
    }
}
