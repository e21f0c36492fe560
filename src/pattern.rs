//! Pattern grammar
//!
//! Patterns are compact textual predicates over input attributes. They are
//! persisted verbatim in the `patterns` table and compiled to SQL `WHERE`
//! fragments at query time. Compilation is injection-safe by construction:
//! every fragment is assembled from parts validated at parse time (hex is
//! decoded and re-encoded, addresses are restricted to an address-safe
//! alphabet), so the storage engine can splice the fragment without
//! parameter binding.

use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

/// A predicate over inputs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pattern {
    /// `*` - every input.
    Any,
    /// `addr:<address>` - exact address, case-insensitive.
    Address(String),
    /// `cred:<hex>` - exact payment credential.
    PaymentCredential(String),
    /// `policy:<hex>` - inputs carrying an asset of the given policy.
    Policy(Vec<u8>),
}

impl Pattern {
    /// Compile to a self-contained `WHERE` fragment.
    pub fn to_sql(&self) -> String {
        match self {
            Pattern::Any => "address IS NOT NULL".to_string(),
            Pattern::Address(address) => {
                format!("address = '{}' COLLATE NOCASE", address)
            }
            Pattern::PaymentCredential(credential) => {
                format!("payment_credential = '{}' COLLATE NOCASE", credential)
            }
            Pattern::Policy(policy_id) => format!(
                "ext_output_reference IN (SELECT output_reference FROM policies \
                 WHERE policy_id = x'{}')",
                hex::encode(policy_id)
            ),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Any => write!(f, "*"),
            Pattern::Address(address) => write!(f, "addr:{}", address),
            Pattern::PaymentCredential(credential) => write!(f, "cred:{}", credential),
            Pattern::Policy(policy_id) => write!(f, "policy:{}", hex::encode(policy_id)),
        }
    }
}

impl FromStr for Pattern {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| StoreError::InvalidPattern {
            text: s.to_string(),
            reason,
        };

        if s == "*" {
            return Ok(Pattern::Any);
        }
        if let Some(address) = s.strip_prefix("addr:") {
            if address.is_empty() || !address.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
            {
                return Err(invalid("address must be non-empty and alphanumeric"));
            }
            return Ok(Pattern::Address(address.to_string()));
        }
        if let Some(credential) = s.strip_prefix("cred:") {
            let bytes = hex::decode(credential)
                .map_err(|_| invalid("credential must be hex-encoded"))?;
            if bytes.is_empty() {
                return Err(invalid("credential must be non-empty"));
            }
            return Ok(Pattern::PaymentCredential(hex::encode(bytes)));
        }
        if let Some(policy_id) = s.strip_prefix("policy:") {
            let bytes =
                hex::decode(policy_id).map_err(|_| invalid("policy id must be hex-encoded"))?;
            if bytes.is_empty() {
                return Err(invalid("policy id must be non-empty"));
            }
            return Ok(Pattern::Policy(bytes));
        }
        Err(invalid("unrecognized pattern prefix"))
    }
}

/// Narrows a query to spent or unspent inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFlag {
    #[default]
    Any,
    OnlyUnspent,
    OnlySpent,
}

impl StatusFlag {
    /// An `AND` fragment to append after the pattern fragment; empty for
    /// `Any`.
    pub fn to_sql(&self) -> &'static str {
        match self {
            StatusFlag::Any => "",
            StatusFlag::OnlyUnspent => " AND spent_at IS NULL",
            StatusFlag::OnlySpent => " AND spent_at IS NOT NULL",
        }
    }
}

/// Direction of the stable `(created_at, transaction_index, output_index)`
/// ordering used by `fold_inputs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for text in ["*", "addr:addr_test1vz9xyz", "cred:00ff12", "policy:abcd00"] {
            let pattern: Pattern = text.parse().expect("should parse");
            assert_eq!(pattern.to_string(), text);
        }
    }

    #[test]
    fn test_parse_normalizes_hex_case() {
        let pattern: Pattern = "cred:00FF12".parse().expect("should parse");
        assert_eq!(pattern, Pattern::PaymentCredential("00ff12".into()));
        assert_eq!(pattern.to_string(), "cred:00ff12");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for text in [
            "",
            "addr:",
            "addr:no spaces allowed",
            "addr:drop';--",
            "cred:zz",
            "cred:",
            "policy:xyz",
            "anything else",
        ] {
            assert!(
                text.parse::<Pattern>().is_err(),
                "{text:?} should not parse"
            );
        }
    }

    #[test]
    fn test_to_sql_fragments() {
        assert_eq!(Pattern::Any.to_sql(), "address IS NOT NULL");
        assert_eq!(
            Pattern::Address("addr1xyz".into()).to_sql(),
            "address = 'addr1xyz' COLLATE NOCASE"
        );
        assert_eq!(
            Pattern::PaymentCredential("00ff".into()).to_sql(),
            "payment_credential = '00ff' COLLATE NOCASE"
        );
        assert_eq!(
            Pattern::Policy(vec![0xab, 0xcd]).to_sql(),
            "ext_output_reference IN (SELECT output_reference FROM policies \
             WHERE policy_id = x'abcd')"
        );
    }

    #[test]
    fn test_status_flag_fragments() {
        assert_eq!(StatusFlag::Any.to_sql(), "");
        assert_eq!(StatusFlag::OnlyUnspent.to_sql(), " AND spent_at IS NULL");
        assert_eq!(StatusFlag::OnlySpent.to_sql(), " AND spent_at IS NOT NULL");
    }
}
