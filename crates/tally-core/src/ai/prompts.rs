//! Categorization prompt for completion backends
//!
//! The prompt enumerates the closed list of valid category names, adds
//! disambiguation rules for merchants that are commonly confused, shows a few
//! worked examples, and asks for exactly one category name back.

use std::fmt::Write;

use crate::models::Transaction;

/// Rules for merchants the model tends to confuse
const DISAMBIGUATION_RULES: &[&str] = &[
    "Supermarkets and grocery chains (Migros, Coop, Denner, Aldi, Lidl, Spar, Volg) are Groceries, even when the name contains \"Restaurant\" or \"Take Away\" unless it is clearly a restaurant location.",
    "Restaurants, cafés, bars, bakeries with seating, fast food and food delivery (McDonald's, Starbucks, Uber Eats) are Restaurants.",
    "Rail, bus, tram, boat operators and mobility apps (SBB CFF FFS, BLS, PostAuto, ZVV, TL, TPG, Uber rides) as well as fuel stations and parking are Transportation.",
    "Health, accident, liability, household and car insurers (CSS, Helsana, Swica, Sanitas, AXA, Zurich, Mobiliar, Allianz, Generali) are Insurance, not Healthcare.",
    "Doctors, hospitals, dentists and pharmacies (Amavita, Sun Store, TopPharm) are Healthcare.",
    "Telecom, electricity, water and internet providers (Swisscom, Sunrise, Salt, EWZ, BKW) are Utilities.",
    "Money sent to a person or to another own account is Transfers; employer payments are Salary.",
    "ATM / Bancomat withdrawals are Cash Withdrawals; account or card fees are Bank Fees.",
];

/// Worked examples (party, details, answer)
const FEW_SHOT_EXAMPLES: &[(&str, &str, &str)] = &[
    ("MIGROS M ZUERICH HB", "Card payment", "Groceries"),
    ("COOP PRONTO", "Debit card purchase", "Groceries"),
    ("SBB CFF FFS", "Mobile ticket", "Transportation"),
    ("Restaurant Kronenhalle", "Card payment", "Restaurants"),
    ("CSS Kranken-Versicherung AG", "Monthly premium", "Insurance"),
    ("Amavita Apotheke", "Card payment", "Healthcare"),
    ("Netflix.com", "Recurring card payment", "Subscriptions"),
    ("Galaxus", "Online order", "Shopping"),
];

/// Build the prompt asking for one category for a transaction
pub fn categorization_prompt(transaction: &Transaction, categories: &[String]) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You categorize bank transactions. Choose exactly one category from this list:\n",
    );
    for name in categories {
        let _ = writeln!(prompt, "- {}", name);
    }

    prompt.push_str("\nRules:\n");
    for rule in DISAMBIGUATION_RULES {
        let _ = writeln!(prompt, "- {}", rule);
    }

    prompt.push_str("\nExamples:\n");
    for (party, details, answer) in FEW_SHOT_EXAMPLES {
        let _ = writeln!(prompt, "Party: {} | Details: {} => {}", party, details, answer);
    }

    let details = [transaction.description.trim(), transaction.info.trim()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" / ");
    let direction = if transaction.is_debtor {
        "debtor"
    } else {
        "creditor"
    };

    prompt.push_str("\nTransaction:\n");
    let _ = writeln!(prompt, "Party: {}", transaction.party_name.trim());
    let _ = writeln!(prompt, "Role: {}", direction);
    if !details.is_empty() {
        let _ = writeln!(prompt, "Details: {}", details);
    }
    let _ = writeln!(prompt, "Amount: {:.2}", transaction.amount);

    prompt.push_str(
        "\nAnswer with the category name only, exactly as written in the list. No explanation, no punctuation.",
    );

    prompt
}
