//! CLI command tests

use khata_core::db::Database;
use khata_core::models::{AmountScheme, NewFormatProfile};
use tempfile::TempDir;

use crate::commands::{self, truncate};

fn debit_credit_profile() -> NewFormatProfile {
    NewFormatProfile {
        bank_name: "HDFC".into(),
        date_col: "A".parse().unwrap(),
        desc_col: "B".parse().unwrap(),
        scheme: AmountScheme::SeparateDebitCredit,
        debit_col: Some("C".parse().unwrap()),
        credit_col: Some("D".parse().unwrap()),
        amount_col: None,
        indicator_col: None,
        debit_tokens: vec![],
        credit_tokens: vec![],
        trans_id_col: None,
    }
}

#[test]
fn test_cmd_init_creates_database() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("khata.db");

    let result = commands::cmd_init(&db_path);
    assert!(result.is_ok());
    assert!(db_path.exists());

    // Re-running init against an existing database is fine
    assert!(commands::cmd_init(&db_path).is_ok());
}

#[test]
fn test_cmd_profiles_lists_saved() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("khata.db");

    let db = Database::new(db_path.to_str().unwrap()).unwrap();
    db.create_profile(&debit_credit_profile()).unwrap();
    drop(db);

    assert!(commands::cmd_profiles(&db_path).is_ok());
}

#[test]
fn test_cmd_parse_with_saved_profile() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("khata.db");
    let stmt_path = dir.path().join("statement.csv");

    let db = Database::new(db_path.to_str().unwrap()).unwrap();
    let profile = db.create_profile(&debit_credit_profile()).unwrap();
    drop(db);

    std::fs::write(
        &stmt_path,
        "Date,Narration,Debit,Credit\n15/01/2024,POS PURCHASE,500.00,0\n",
    )
    .unwrap();

    let result = commands::cmd_parse(&db_path, &stmt_path, profile.id, None, false);
    assert!(result.is_ok());

    // JSON output path
    let result = commands::cmd_parse(&db_path, &stmt_path, profile.id, None, true);
    assert!(result.is_ok());
}

#[test]
fn test_cmd_parse_unknown_profile_errors() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("khata.db");
    let stmt_path = dir.path().join("statement.csv");
    std::fs::write(&stmt_path, "Date,Desc\n").unwrap();

    commands::cmd_init(&db_path).unwrap();
    let result = commands::cmd_parse(&db_path, &stmt_path, 42, None, false);
    assert!(result.is_err());
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a longer description", 10), "a longe...");
}

#[test]
fn test_truncate_multibyte_narration() {
    // Rupee-symbol narrations must cut on char boundaries, not bytes
    assert_eq!(truncate("₹₹₹₹", 10), "₹₹₹₹");
    assert_eq!(truncate("UPI ₹500 TO GROCERY MART BANGALORE", 10), "UPI ₹50...");
}
