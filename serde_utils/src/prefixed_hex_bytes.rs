//! `DATA` encoding: arbitrary or fixed-length byte strings as `0x`-prefixed hexadecimal.

use core::{
    fmt::{Formatter, Result as FmtResult},
    marker::PhantomData,
};

use serde::{
    de::{Error as DeserializeError, Visitor},
    Deserializer, Serializer,
};

use crate::shared;

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: TryFrom<Vec<u8>>,
    D: Deserializer<'de>,
{
    struct BytesVisitor<T>(PhantomData<T>);

    impl<T: TryFrom<Vec<u8>>> Visitor<'_> for BytesVisitor<T> {
        type Value = T;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str(shared::EXPECTING_PREFIXED_HEX)
        }

        fn visit_str<E: DeserializeError>(self, string: &str) -> Result<Self::Value, E> {
            let digits = shared::strip_hex_prefix(string)?;
            let bytes = hex::decode(digits).map_err(E::custom)?;
            let length = bytes.len();

            T::try_from(bytes)
                .map_err(|_| E::custom(format_args!("unexpected byte length {length}")))
        }
    }

    deserializer.deserialize_str(BytesVisitor(PhantomData))
}

pub fn serialize<S: Serializer>(bytes: impl AsRef<[u8]>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("0x{}", hex::encode(bytes)))
}

#[cfg(test)]
mod tests {
    use serde_json::{value::Serializer, Result, Value};

    use super::*;

    #[test]
    fn variable_length_bytes_round_trip() -> Result<()> {
        let json = Value::from("0x01ff");

        assert_eq!(deserialize::<Vec<u8>, _>(json.clone())?, [1, 0xff]);
        assert_eq!(serialize([1_u8, 0xff], Serializer)?, json);

        Ok(())
    }

    #[test]
    fn empty_bytes_round_trip() -> Result<()> {
        let json = Value::from("0x");

        assert_eq!(deserialize::<Vec<u8>, _>(json.clone())?, Vec::<u8>::new());
        assert_eq!(serialize(Vec::<u8>::new(), Serializer)?, json);

        Ok(())
    }

    #[test]
    fn fixed_length_array_rejects_wrong_length() {
        deserialize::<[u8; 4], _>(Value::from("0x010203")).expect_err("length is wrong");
    }
}
