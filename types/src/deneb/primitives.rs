use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;
use serde::{Deserialize, Serialize};

use crate::phase0::primitives::H256;

pub type VersionedHash = H256;

pub const KZG_SIZE: usize = 48;

construct_fixed_hash! {
    pub struct KzgCommitment(KZG_SIZE);
}

construct_fixed_hash! {
    pub struct KzgProof(KZG_SIZE);
}

impl_fixed_hash_serde!(KzgCommitment, KZG_SIZE);
impl_fixed_hash_serde!(KzgProof, KZG_SIZE);

#[derive(Clone, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Blob(#[serde(with = "serde_utils::prefixed_hex_bytes")] pub Vec<u8>);
