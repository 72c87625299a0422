use serde::de::Error;

pub const EXPECTING_PREFIXED_HEX: &str = "a string of hexadecimal digits prefixed with 0x";

pub fn strip_hex_prefix<E: Error>(string: &str) -> Result<&str, E> {
    string
        .strip_prefix("0x")
        .ok_or_else(|| E::custom("string does not have hexadecimal prefix"))
}
