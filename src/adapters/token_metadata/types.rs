//! Token API Types

use serde::{Deserialize, Serialize};

use crate::domain::TokenMeta;

/// Token information from the Jupiter token API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JupiterToken {
    /// Token mint address (`id` in newer API versions)
    #[serde(alias = "id")]
    pub address: String,
    pub name: String,
    pub symbol: String,
    #[serde(default)]
    pub decimals: Option<u8>,
    #[serde(rename = "logoURI", alias = "icon", default)]
    pub logo_uri: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl JupiterToken {
    pub fn is_verified(&self) -> bool {
        self.tags.iter().any(|t| t == "verified")
    }
}

impl From<JupiterToken> for TokenMeta {
    fn from(token: JupiterToken) -> Self {
        let non_empty = |s: String| if s.trim().is_empty() { None } else { Some(s) };
        TokenMeta {
            name: non_empty(token.name),
            symbol: non_empty(token.symbol),
            decimals: token.decimals,
            supply: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_into_meta() {
        let token: JupiterToken = serde_json::from_value(json!({
            "address": "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
            "name": "Bonk",
            "symbol": "Bonk",
            "decimals": 5,
            "logoURI": "https://example.invalid/bonk.png",
            "tags": ["verified", "community"]
        }))
        .unwrap();
        assert!(token.is_verified());

        let meta = TokenMeta::from(token);
        assert_eq!(meta.name.as_deref(), Some("Bonk"));
        assert_eq!(meta.decimals, Some(5));
        assert_eq!(meta.supply, None);
    }

    #[test]
    fn test_id_alias_and_blank_fields() {
        let token: JupiterToken = serde_json::from_value(json!({
            "id": "Mint111",
            "name": "",
            "symbol": "X"
        }))
        .unwrap();
        assert_eq!(token.address, "Mint111");

        let meta = TokenMeta::from(token);
        assert!(meta.name.is_none());
        assert_eq!(meta.symbol.as_deref(), Some("X"));
    }
}
