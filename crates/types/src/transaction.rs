use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single persisted transaction, owned by the index address it was
/// discovered for.
///
/// `(address, hash)` is unique: the same transaction can be stored once per
/// address it touches (e.g. once for the sender, once for the recipient),
/// since coverage is tracked per-address. Rows are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// 32-byte transaction hash.
    pub hash: String,
    /// The address this row is indexed under (lowercase, `0x`-prefixed).
    pub address: String,
    /// Block number the transaction was included in.
    pub block_number: u64,
    /// Sender address.
    pub from: String,
    /// Recipient address, absent for contract-creation transactions.
    pub to: Option<String>,
    /// Value transferred, as a decimal-string encoded u256.
    pub value: String,
    /// Gas price, as a decimal-string encoded u256.
    pub gas_price: String,
    /// Gas actually used by the transaction, if known.
    pub gas_used: Option<u64>,
    /// Gas limit supplied with the transaction, if known.
    pub gas: Option<u64>,
    /// First 4 bytes of calldata (the function selector), if any.
    pub function_name: Option<String>,
    /// `"1"` for success, `"0"` for failure. See
    /// [`Transaction::derive_receipt_status`] for how this is derived from
    /// the explorer's `isError`/`txreceipt_status` fields.
    pub receipt_status: String,
    /// Address of the contract created by this transaction, if any.
    pub contract_address: Option<String>,
    /// Block timestamp, trusted verbatim from the upstream explorer.
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Derive the stored `receiptStatus` from the explorer's two signals.
    /// `isError`, when present, decides the outcome by itself (`"0"` is
    /// success, anything else is failure); `txreceipt_status` is only
    /// consulted when `isError` is absent (absent is success, `"0"` is
    /// failure, anything else is success). The two signals are not
    /// weighted as equal OR terms -- `isError` always wins when given.
    pub fn derive_receipt_status(is_error: Option<&str>, txreceipt_status: Option<&str>) -> String {
        let success = match (is_error, txreceipt_status) {
            (Some(err), _) => err == "0",
            (None, None) => true,
            (None, Some(status)) => status != "0",
        };
        if success { "1".to_string() } else { "0".to_string() }
    }

    /// Extract the 4-byte function selector from `input`, unless `input` is
    /// the empty-calldata sentinel `"0x"` or an explicit function name was
    /// already supplied by the upstream payload.
    pub fn derive_function_name(input: &str, explicit: Option<String>) -> Option<String> {
        if let Some(name) = explicit {
            return Some(name);
        }
        if input == "0x" || input.len() < 10 {
            return None;
        }
        Some(input[..10].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receipt_status_prefers_is_error() {
        assert_eq!(Transaction::derive_receipt_status(Some("0"), Some("0")), "1");
        assert_eq!(Transaction::derive_receipt_status(Some("1"), Some("1")), "0");
    }

    #[test]
    fn receipt_status_falls_back_to_txreceipt_status() {
        assert_eq!(Transaction::derive_receipt_status(None, Some("1")), "1");
        assert_eq!(Transaction::derive_receipt_status(None, Some("0")), "0");
    }

    #[test]
    fn is_error_wins_even_when_txreceipt_status_is_absent() {
        assert_eq!(Transaction::derive_receipt_status(Some("1"), None), "0");
        assert_eq!(Transaction::derive_receipt_status(Some("0"), None), "1");
    }

    #[test]
    fn receipt_status_defaults_to_success_when_absent() {
        assert_eq!(Transaction::derive_receipt_status(None, None), "1");
    }

    #[test]
    fn function_name_is_first_four_bytes_of_input() {
        let input = "0xa9059cbb0000000000000000000000000000000000000000000000000000000000000001";
        assert_eq!(Transaction::derive_function_name(input, None), Some("0xa9059cbb".to_string()));
    }

    #[test]
    fn function_name_absent_for_empty_calldata() {
        assert_eq!(Transaction::derive_function_name("0x", None), None);
    }

    #[test]
    fn explicit_function_name_wins() {
        assert_eq!(
            Transaction::derive_function_name("0x", Some("transfer".into())),
            Some("transfer".into())
        );
    }

    #[test]
    fn serializes_round_trip() {
        let tx = Transaction {
            hash: "0xhash".into(),
            address: "0xaddr".into(),
            block_number: 1,
            from: "0xfrom".into(),
            to: None,
            value: "0".into(),
            gas_price: "1".into(),
            gas_used: Some(21_000),
            gas: Some(21_000),
            function_name: None,
            receipt_status: "1".into(),
            contract_address: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, back);
    }
}
