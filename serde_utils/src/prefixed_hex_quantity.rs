//! `QUANTITY` encoding used by the Engine API and the `eth` JSON-RPC namespace.
//!
//! See <https://github.com/ethereum/execution-apis/blob/main/src/engine/common.md#encoding>.

use core::{
    fmt::{Formatter, LowerHex, Result as FmtResult},
    marker::PhantomData,
};

use ethereum_types::U256;
use serde::{
    de::{Error as DeserializeError, Visitor},
    Deserializer, Serializer,
};

use crate::shared;

pub trait Quantity: Sized + LowerHex {
    fn zero() -> Self;

    fn from_hex_digits(digits: &str) -> Result<Self, String>;
}

impl Quantity for u64 {
    fn zero() -> Self {
        0
    }

    fn from_hex_digits(digits: &str) -> Result<Self, String> {
        Self::from_str_radix(digits, 16).map_err(|error| error.to_string())
    }
}

impl Quantity for U256 {
    fn zero() -> Self {
        Self::zero()
    }

    fn from_hex_digits(digits: &str) -> Result<Self, String> {
        Self::from_str_radix(digits, 16).map_err(|error| error.to_string())
    }
}

pub fn deserialize<'de, T: Quantity, D: Deserializer<'de>>(deserializer: D) -> Result<T, D::Error> {
    struct QuantityVisitor<T>(PhantomData<T>);

    impl<T: Quantity> Visitor<'_> for QuantityVisitor<T> {
        type Value = T;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str(shared::EXPECTING_PREFIXED_HEX)
        }

        fn visit_str<E: DeserializeError>(self, string: &str) -> Result<Self::Value, E> {
            let digits = shared::strip_hex_prefix(string)?;

            if digits.is_empty() {
                return Err(E::custom("string contains no hexadecimal digits"));
            }

            if digits == "0" {
                return Ok(T::zero());
            }

            // Quantities must not have leading zeros after the prefix (except for 0 itself).
            if digits.starts_with('0') {
                return Err(E::custom(
                    "string contains leading zeros after hexadecimal prefix",
                ));
            }

            T::from_hex_digits(digits).map_err(E::custom)
        }
    }

    deserializer.deserialize_str(QuantityVisitor(PhantomData))
}

pub fn serialize<S: Serializer>(number: impl LowerHex, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{number:#x}"))
}

/// Like the parent module, but for fields that some clients omit or set to `null`.
pub mod option {
    use core::fmt::LowerHex;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::Quantity;

    #[derive(Deserialize)]
    #[serde(bound = "T: Quantity", transparent)]
    struct Wrapper<T>(#[serde(with = "crate::prefixed_hex_quantity")] T);

    pub fn deserialize<'de, T: Quantity, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<T>, D::Error> {
        let option = Option::<Wrapper<T>>::deserialize(deserializer)?;
        Ok(option.map(|Wrapper(number)| number))
    }

    #[expect(clippy::ref_option)]
    pub fn serialize<S: Serializer, T: LowerHex>(
        number: &Option<T>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match number {
            Some(number) => super::serialize(number, serializer),
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{value::Serializer, Result, Value};
    use test_case::test_case;

    use super::*;

    #[test_case(0, "0x0")]
    #[test_case(1, "0x1")]
    #[test_case(1_000_000_000_000, "0xe8d4a51000")]
    #[test_case(u64::MAX, "0xffffffffffffffff")]
    fn u64_string_round_trip(number: u64, string: &str) -> Result<()> {
        let json = Value::from(string);

        assert_eq!(deserialize::<u64, _>(json.clone())?, number);
        assert_eq!(serialize(number, Serializer)?, json);

        Ok(())
    }

    #[test]
    fn u256_deserializes_mainnet_terminal_total_difficulty() -> Result<()> {
        let json = Value::from("0xc70d815d562d3cfa955");

        assert_eq!(
            deserialize::<U256, _>(json)?,
            U256::from(58_750_000_000_000_000_000_000_u128),
        );

        Ok(())
    }

    #[test_case("";         "empty string")]
    #[test_case("0";        "missing hexadecimal prefix")]
    #[test_case("0x";       "missing hexadecimal digits")]
    #[test_case("0x000034"; "leading zeros after hexadecimal prefix")]
    #[test_case("0x1ffffffffffffffff"; "one digit too many for u64")]
    fn deserialize_u64_fails_on(string: &str) {
        deserialize::<u64, _>(Value::from(string)).expect_err("deserialization should fail");
    }

    #[test]
    fn option_accepts_null_and_quantity() -> Result<()> {
        assert_eq!(option::deserialize::<u64, _>(Value::Null)?, None);
        assert_eq!(option::deserialize::<u64, _>(Value::from("0x10"))?, Some(16));
        assert_eq!(option::serialize(&Some(16_u64), Serializer)?, Value::from("0x10"));
        assert_eq!(option::serialize(&None::<u64>, Serializer)?, Value::Null);

        Ok(())
    }
}
