//! Domain models for Khata

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Reference to a spreadsheet column, stored as a zero-based index.
///
/// Parses from the letter form users type into a mapping profile ("A", "c",
/// "AB") or a plain 1-based number ("3"). Serializes back to the letter form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColumnRef(pub usize);

impl ColumnRef {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::str::FromStr for ColumnRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidColumn("empty column reference".into()));
        }

        if s.chars().all(|c| c.is_ascii_digit()) {
            // 1-based numeric reference
            let n: usize = s
                .parse()
                .map_err(|_| Error::InvalidColumn(s.to_string()))?;
            if n == 0 {
                return Err(Error::InvalidColumn(s.to_string()));
            }
            return Ok(Self(n - 1));
        }

        if !s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::InvalidColumn(s.to_string()));
        }

        // Letter reference: A=0, Z=25, AA=26, ...
        let mut index: usize = 0;
        for c in s.chars() {
            let v = (c.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
            index = index * 26 + v;
        }
        Ok(Self(index - 1))
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut n = self.0 + 1;
        let mut letters = Vec::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            letters.push((b'A' + rem as u8) as char);
            n = (n - 1) / 26;
        }
        letters.reverse();
        write!(f, "{}", letters.into_iter().collect::<String>())
    }
}

impl TryFrom<String> for ColumnRef {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ColumnRef> for String {
    fn from(c: ColumnRef) -> Self {
        c.to_string()
    }
}

/// How a bank's export encodes the transaction sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountScheme {
    /// Two columns, one for money out and one for money in
    SeparateDebitCredit,
    /// One amount column plus an explicit DR/CR indicator column
    SingleAmountWithIndicator,
    /// One amount column; direction inferred from keywords in the narration
    SingleAmountWithTokens,
}

impl AmountScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SeparateDebitCredit => "separate_debit_credit",
            Self::SingleAmountWithIndicator => "single_amount_with_indicator",
            Self::SingleAmountWithTokens => "single_amount_with_tokens",
        }
    }
}

impl std::str::FromStr for AmountScheme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "separate_debit_credit" => Ok(Self::SeparateDebitCredit),
            "single_amount_with_indicator" => Ok(Self::SingleAmountWithIndicator),
            "single_amount_with_tokens" => Ok(Self::SingleAmountWithTokens),
            _ => Err(format!("Unknown amount scheme: {}", s)),
        }
    }
}

impl std::fmt::Display for AmountScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A saved bank statement format definition: which columns hold what, and
/// how the sign is encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatProfile {
    pub id: i64,
    /// Cosmetic label, not a unique key
    pub bank_name: String,
    pub date_col: ColumnRef,
    pub desc_col: ColumnRef,
    pub scheme: AmountScheme,
    pub debit_col: Option<ColumnRef>,
    pub credit_col: Option<ColumnRef>,
    pub amount_col: Option<ColumnRef>,
    pub indicator_col: Option<ColumnRef>,
    pub debit_tokens: Vec<String>,
    pub credit_tokens: Vec<String>,
    pub trans_id_col: Option<ColumnRef>,
    pub created_at: DateTime<Utc>,
}

impl FormatProfile {
    /// The column mapping itself, detached from the stored row. This is what
    /// the parse pipeline consumes.
    pub fn mapping(&self) -> NewFormatProfile {
        NewFormatProfile {
            bank_name: self.bank_name.clone(),
            date_col: self.date_col,
            desc_col: self.desc_col,
            scheme: self.scheme,
            debit_col: self.debit_col,
            credit_col: self.credit_col,
            amount_col: self.amount_col,
            indicator_col: self.indicator_col,
            debit_tokens: self.debit_tokens.clone(),
            credit_tokens: self.credit_tokens.clone(),
            trans_id_col: self.trans_id_col,
        }
    }
}

/// A format profile as submitted for create/update (no id yet)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFormatProfile {
    pub bank_name: String,
    pub date_col: ColumnRef,
    pub desc_col: ColumnRef,
    pub scheme: AmountScheme,
    #[serde(default)]
    pub debit_col: Option<ColumnRef>,
    #[serde(default)]
    pub credit_col: Option<ColumnRef>,
    #[serde(default)]
    pub amount_col: Option<ColumnRef>,
    #[serde(default)]
    pub indicator_col: Option<ColumnRef>,
    #[serde(default)]
    pub debit_tokens: Vec<String>,
    #[serde(default)]
    pub credit_tokens: Vec<String>,
    #[serde(default)]
    pub trans_id_col: Option<ColumnRef>,
}

impl NewFormatProfile {
    /// Check the scheme-required-fields invariant.
    ///
    /// Absent optional fields are fine; fields the selected scheme needs must
    /// be present. Violations list every missing field at once so the caller
    /// can fix them in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();

        if self.bank_name.trim().is_empty() {
            missing.push("bank_name".to_string());
        }

        match self.scheme {
            AmountScheme::SeparateDebitCredit => {
                if self.debit_col.is_none() {
                    missing.push("debit_col".to_string());
                }
                if self.credit_col.is_none() {
                    missing.push("credit_col".to_string());
                }
            }
            AmountScheme::SingleAmountWithIndicator => {
                if self.amount_col.is_none() {
                    missing.push("amount_col".to_string());
                }
                if self.indicator_col.is_none() {
                    missing.push("indicator_col".to_string());
                }
                if self.debit_tokens.is_empty() {
                    missing.push("debit_tokens".to_string());
                }
                if self.credit_tokens.is_empty() {
                    missing.push("credit_tokens".to_string());
                }
            }
            AmountScheme::SingleAmountWithTokens => {
                if self.amount_col.is_none() {
                    missing.push("amount_col".to_string());
                }
                if self.debit_tokens.is_empty() {
                    missing.push("debit_tokens".to_string());
                }
                if self.credit_tokens.is_empty() {
                    missing.push("credit_tokens".to_string());
                }
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidFormatProfile(missing))
        }
    }
}

/// Whether a transaction is money in or money out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Income,
    Expense,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-row marker for rows a human must fix before commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewFlag {
    /// The row's sign could not be determined unambiguously
    AmbiguousDirection,
    /// The amount cell was zero or unparsable
    MissingAmount,
}

/// One cell's content, decoupled from the container library
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Cell content as displayable text (empty string for `Empty`)
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            Self::Date(d) => d.to_string(),
        }
    }
}

/// One physical row of an uploaded sheet. Exists only during parsing.
#[derive(Debug, Clone)]
pub struct RawRow {
    /// Zero-based physical row index in the sheet
    pub index: usize,
    pub cells: Vec<Cell>,
}

impl RawRow {
    pub fn cell(&self, col: ColumnRef) -> &Cell {
        static EMPTY: Cell = Cell::Empty;
        self.cells.get(col.index()).unwrap_or(&EMPTY)
    }
}

/// A normalized transaction candidate, staged for review before commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedTransaction {
    /// Physical row index in the source sheet; stable identity for the
    /// batch's lifetime and for per-row commit outcomes
    pub row: usize,
    pub date: NaiveDate,
    pub description: String,
    /// Always unsigned; direction carries the sign
    pub amount: f64,
    /// `None` while a review flag is outstanding
    pub direction: Option<Direction>,
    /// The bank's own reference, when the profile maps a column for it
    pub transaction_id: Option<String>,
    /// Assigned during review; required before commit
    pub category_id: Option<i64>,
    /// Optional free-text note added during review
    pub note: Option<String>,
    pub review_flag: Option<ReviewFlag>,
    /// Warning: this transaction id was seen earlier in the batch or in
    /// already-committed rows. Never blocks commit.
    #[serde(default)]
    pub duplicate: bool,
}

/// A commit target account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An income source or expense category, depending on `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub kind: Direction,
    pub created_at: DateTime<Utc>,
}

/// A deterministic keyword rule: description matching `pattern` gets
/// `category_id` prefilled as a hint during normalization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub id: i64,
    /// Case-insensitive regex matched against the description
    pub pattern: String,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A ledger-create request, routed to the income or expense endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub account_id: i64,
    pub category_id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub transaction_id: Option<String>,
}

/// A committed income record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomeRecord {
    pub id: i64,
    pub account_id: i64,
    /// Income-side categories play the "source" role
    pub source_id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A committed expense record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: i64,
    pub account_id: i64,
    pub category_id: i64,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_ref_letters() {
        assert_eq!("A".parse::<ColumnRef>().unwrap(), ColumnRef(0));
        assert_eq!("z".parse::<ColumnRef>().unwrap(), ColumnRef(25));
        assert_eq!("AA".parse::<ColumnRef>().unwrap(), ColumnRef(26));
        assert_eq!("AB".parse::<ColumnRef>().unwrap(), ColumnRef(27));
    }

    #[test]
    fn test_column_ref_numeric() {
        assert_eq!("1".parse::<ColumnRef>().unwrap(), ColumnRef(0));
        assert_eq!("7".parse::<ColumnRef>().unwrap(), ColumnRef(6));
        assert!("0".parse::<ColumnRef>().is_err());
    }

    #[test]
    fn test_column_ref_roundtrip() {
        for idx in [0usize, 1, 25, 26, 51, 701, 702] {
            let shown = ColumnRef(idx).to_string();
            assert_eq!(shown.parse::<ColumnRef>().unwrap(), ColumnRef(idx));
        }
        assert_eq!(ColumnRef(0).to_string(), "A");
        assert_eq!(ColumnRef(26).to_string(), "AA");
    }

    #[test]
    fn test_column_ref_rejects_garbage() {
        assert!("".parse::<ColumnRef>().is_err());
        assert!("A1".parse::<ColumnRef>().is_err());
        assert!("-".parse::<ColumnRef>().is_err());
    }

    #[test]
    fn test_validate_separate_debit_credit() {
        let mut profile = NewFormatProfile {
            bank_name: "HDFC".into(),
            date_col: ColumnRef(0),
            desc_col: ColumnRef(1),
            scheme: AmountScheme::SeparateDebitCredit,
            debit_col: Some(ColumnRef(2)),
            credit_col: Some(ColumnRef(3)),
            amount_col: None,
            indicator_col: None,
            debit_tokens: vec![],
            credit_tokens: vec![],
            trans_id_col: None,
        };
        assert!(profile.validate().is_ok());

        profile.credit_col = None;
        match profile.validate() {
            Err(Error::InvalidFormatProfile(missing)) => {
                assert_eq!(missing, vec!["credit_col".to_string()]);
            }
            other => panic!("expected InvalidFormatProfile, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_tokens_scheme_lists_all_missing() {
        let profile = NewFormatProfile {
            bank_name: "SBI".into(),
            date_col: ColumnRef(0),
            desc_col: ColumnRef(1),
            scheme: AmountScheme::SingleAmountWithTokens,
            debit_col: None,
            credit_col: None,
            amount_col: None,
            indicator_col: None,
            debit_tokens: vec![],
            credit_tokens: vec![],
            trans_id_col: None,
        };
        match profile.validate() {
            Err(Error::InvalidFormatProfile(missing)) => {
                assert_eq!(missing, vec!["amount_col", "debit_tokens", "credit_tokens"]);
            }
            other => panic!("expected InvalidFormatProfile, got {:?}", other),
        }
    }

    #[test]
    fn test_amount_scheme_roundtrip() {
        for scheme in [
            AmountScheme::SeparateDebitCredit,
            AmountScheme::SingleAmountWithIndicator,
            AmountScheme::SingleAmountWithTokens,
        ] {
            assert_eq!(scheme.as_str().parse::<AmountScheme>().unwrap(), scheme);
        }
        assert!("sideways".parse::<AmountScheme>().is_err());
    }
}
