//! Helpers for (de)serializing `U256` as a plain JSON number.
//!
//! alloy's own serde impl writes `U256` as a `0x` hex string. Stored records
//! carry amounts and supplies as decimal JSON numbers of any size, so these
//! go through a [`RawValue`] to keep full precision. Hex or decimal strings
//! are still accepted on read.

use alloy_primitives::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

fn to_raw(value: &U256) -> Result<Box<RawValue>, serde_json::Error> {
    RawValue::from_string(value.to_string())
}

fn parse(text: &str) -> Result<U256, String> {
    let text = text.trim();
    let parsed = match text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(quoted) => quoted.parse::<U256>(),
        None => U256::from_str_radix(text, 10),
    };
    parsed.map_err(|e| format!("invalid uint256 {text}: {e}"))
}

/// For use with `#[serde(with = "u256_number")]`.
pub mod u256_number {
    use super::*;
    use serde::de::Error as _;
    use serde::ser::Error as _;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        to_raw(value).map_err(S::Error::custom)?.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        parse(raw.get()).map_err(D::Error::custom)
    }
}

/// For use with `#[serde(with = "option_u256_number")]`. `null` reads as `None`.
pub mod option_u256_number {
    use super::*;
    use serde::de::Error as _;
    use serde::ser::Error as _;

    pub fn serialize<S: Serializer>(value: &Option<U256>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => to_raw(v).map_err(S::Error::custom)?.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        match raw.get().trim() {
            "null" => Ok(None),
            text => parse(text).map(Some).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Amounts {
        #[serde(with = "u256_number")]
        amount: U256,
        #[serde(default, with = "option_u256_number", skip_serializing_if = "Option::is_none")]
        supply: Option<U256>,
    }

    #[test]
    fn writes_decimal_numbers() {
        let big = U256::MAX;
        let json = serde_json::to_string(&Amounts { amount: U256::from(5), supply: Some(big) }).unwrap();
        assert_eq!(json, format!(r#"{{"amount":5,"supply":{big}}}"#));

        let back: Amounts = serde_json::from_str(&json).unwrap();
        assert_eq!(back.supply, Some(big));
        assert_eq!(back.amount, U256::from(5));
    }

    #[test]
    fn reads_strings_and_missing_values() {
        let back: Amounts = serde_json::from_str(r#"{"amount":"0x5"}"#).unwrap();
        assert_eq!(back, Amounts { amount: U256::from(5), supply: None });

        let back: Amounts = serde_json::from_str(r#"{"amount":"12","supply":null}"#).unwrap();
        assert_eq!(back.amount, U256::from(12));
        assert!(back.supply.is_none());

        assert!(serde_json::from_str::<Amounts>(r#"{"amount":-1}"#).is_err());
        assert!(serde_json::from_str::<Amounts>(r#"{"amount":1.5}"#).is_err());
    }
}
