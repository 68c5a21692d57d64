//! JSON-RPC Wire Types
//!
//! Lenient shapes for the `result` payloads the discovery client reads. Fields
//! the client never looks at are left out so node version differences do not
//! break decoding.

use serde::Deserialize;

/// `{ "context": {..}, "value": T }` wrapper used by most account methods
#[derive(Debug, Clone, Deserialize)]
pub struct ContextValue<T> {
    pub value: T,
}

/// One entry of getTokenLargestAccounts
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountBalance {
    pub address: String,
    #[serde(default)]
    pub ui_amount: Option<f64>,
}

/// getTokenSupply value
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    pub amount: String,
    pub decimals: u8,
    #[serde(default)]
    pub ui_amount: Option<f64>,
}

/// getAccountInfo value (jsonParsed)
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfoValue {
    pub data: AccountData,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AccountData {
    Parsed(ParsedAccountData),
    Raw(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParsedAccountData {
    pub parsed: ParsedInfo,
    pub program: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParsedInfo {
    pub info: MintInfo,
    #[serde(rename = "type")]
    pub account_type: String,
}

/// Mint account fields from the SPL Token program parser
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintInfo {
    pub supply: String,
    pub decimals: u8,
    #[serde(default)]
    pub is_initialized: bool,
}

/// getTransaction result (json or jsonParsed encoding)
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionResult {
    #[serde(default)]
    pub slot: u64,
    #[serde(rename = "blockTime", default)]
    pub block_time: Option<i64>,
    pub transaction: TransactionEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionEnvelope {
    pub message: TransactionMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionMessage {
    #[serde(rename = "accountKeys", default)]
    pub account_keys: Vec<AccountKey>,
}

/// Account key as a bare string (json) or an object (jsonParsed)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AccountKey {
    Plain(String),
    Parsed { pubkey: String },
}

impl AccountKey {
    pub fn pubkey(&self) -> &str {
        match self {
            AccountKey::Plain(key) => key,
            AccountKey::Parsed { pubkey } => pubkey,
        }
    }
}

/// getVersion result
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "solana-core")]
    pub solana_core: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_keys_accept_both_forms() {
        let plain: TransactionResult = serde_json::from_value(json!({
            "slot": 10,
            "blockTime": 1_700_000_000,
            "transaction": {
                "signatures": ["sig"],
                "message": {"accountKeys": ["A", "B"]}
            }
        }))
        .unwrap();
        let keys: Vec<_> = plain.transaction.message.account_keys.iter().map(AccountKey::pubkey).collect();
        assert_eq!(keys, vec!["A", "B"]);

        let parsed: TransactionResult = serde_json::from_value(json!({
            "transaction": {
                "message": {"accountKeys": [
                    {"pubkey": "C", "signer": true, "writable": true},
                    {"pubkey": "D", "signer": false, "writable": false}
                ]}
            }
        }))
        .unwrap();
        assert_eq!(parsed.transaction.message.account_keys[1].pubkey(), "D");
    }

    #[test]
    fn test_parse_mint_account_data() {
        let value: AccountInfoValue = serde_json::from_value(json!({
            "data": {
                "parsed": {
                    "info": {
                        "decimals": 6,
                        "freezeAuthority": null,
                        "isInitialized": true,
                        "mintAuthority": null,
                        "supply": "999999999999"
                    },
                    "type": "mint"
                },
                "program": "spl-token",
                "space": 82
            },
            "executable": false,
            "lamports": 1461600,
            "owner": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA",
            "rentEpoch": 18446744073709551615u64
        }))
        .unwrap();

        match value.data {
            AccountData::Parsed(parsed) => {
                assert_eq!(parsed.parsed.account_type, "mint");
                assert_eq!(parsed.parsed.info.decimals, 6);
                assert_eq!(parsed.parsed.info.supply, "999999999999");
            }
            AccountData::Raw(_) => panic!("expected parsed data"),
        }
    }

    #[test]
    fn test_raw_account_data() {
        let value: AccountInfoValue = serde_json::from_value(json!({
            "data": ["AAAA", "base64"],
            "owner": "11111111111111111111111111111111"
        }))
        .unwrap();
        assert!(matches!(value.data, AccountData::Raw(_)));
    }

    #[test]
    fn test_largest_accounts_shape() {
        let page: ContextValue<Vec<TokenAccountBalance>> = serde_json::from_value(json!({
            "context": {"slot": 1},
            "value": [
                {"address": "H1", "amount": "100", "decimals": 2, "uiAmount": 1.0, "uiAmountString": "1"},
                {"address": "H2", "amount": "50", "decimals": 2, "uiAmount": null, "uiAmountString": "0.5"}
            ]
        }))
        .unwrap();
        assert_eq!(page.value.len(), 2);
        assert_eq!(page.value[0].address, "H1");
        assert_eq!(page.value[1].ui_amount, None);
    }
}
