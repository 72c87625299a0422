//! SHA-256 and the subset of SSZ merkleization needed to compute `hash_tree_root` of deposits and
//! execution payloads.
//!
//! Only hashing is implemented here. Binary SSZ encoding is not needed anywhere in this workspace.

use ethereum_types::{H160, H256, U256};
use once_cell::sync::Lazy;
use sha2::{Digest as _, Sha256};

pub const BYTES_PER_CHUNK: usize = 32;

// Enough for the deepest tree hashed in this workspace:
// a transaction (2^25 chunks) nested in a list of 2^20 transactions.
const ZERO_HASH_COUNT: usize = 64;

/// `ZERO_HASHES[depth]` is the root of a perfect binary tree of zero chunks with `2^depth` leaves.
pub static ZERO_HASHES: Lazy<[H256; ZERO_HASH_COUNT]> = Lazy::new(|| {
    let mut hashes = [H256::zero(); ZERO_HASH_COUNT];

    for depth in 1..ZERO_HASH_COUNT {
        hashes[depth] = hash_256_256(hashes[depth - 1], hashes[depth - 1]);
    }

    hashes
});

pub trait SszHash {
    fn hash_tree_root(&self) -> H256;
}

impl SszHash for u64 {
    fn hash_tree_root(&self) -> H256 {
        uint_chunk(*self)
    }
}

impl SszHash for H256 {
    fn hash_tree_root(&self) -> H256 {
        *self
    }
}

impl SszHash for H160 {
    fn hash_tree_root(&self) -> H256 {
        pack_bytes(self.as_bytes())[0]
    }
}

impl SszHash for U256 {
    fn hash_tree_root(&self) -> H256 {
        let mut chunk = H256::zero();
        self.to_little_endian(chunk.as_bytes_mut());
        chunk
    }
}

#[must_use]
pub fn hash(bytes: impl AsRef<[u8]>) -> H256 {
    H256(Sha256::digest(bytes.as_ref()).into())
}

#[must_use]
pub fn hash_256_256(left: H256, right: H256) -> H256 {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    H256(hasher.finalize().into())
}

#[must_use]
pub fn zero_hash(depth: usize) -> H256 {
    ZERO_HASHES[depth]
}

/// Number of tree levels needed to hold `limit` chunks.
#[must_use]
pub const fn depth_for_limit(limit: usize) -> usize {
    if limit <= 1 {
        0
    } else {
        (usize::BITS - (limit - 1).leading_zeros()) as usize
    }
}

/// Root of a tree of the given depth whose leftmost leaves are `chunks` and the rest are zero.
///
/// Empty subtrees are never hashed. They are taken from [`ZERO_HASHES`].
#[must_use]
pub fn merkleize(chunks: &[H256], depth: usize) -> H256 {
    debug_assert!(depth_for_limit(chunks.len()) <= depth);

    if chunks.is_empty() {
        return zero_hash(depth);
    }

    let mut layer = chunks.to_vec();

    for level in 0..depth {
        layer = layer
            .chunks(2)
            .map(|pair| match *pair {
                [left, right] => hash_256_256(left, right),
                [left] => hash_256_256(left, zero_hash(level)),
                _ => unreachable!("slice::chunks(2) yields one or two elements"),
            })
            .collect();
    }

    layer[0]
}

#[must_use]
pub fn mix_in_length(root: H256, length: usize) -> H256 {
    hash_256_256(root, uint_chunk(length as u64))
}

#[must_use]
pub fn uint_chunk(value: u64) -> H256 {
    let mut chunk = H256::zero();
    chunk[..size_of::<u64>()].copy_from_slice(&value.to_le_bytes());
    chunk
}

/// Splits bytes into chunks, padding the last one with zeros.
#[must_use]
pub fn pack_bytes(bytes: &[u8]) -> Vec<H256> {
    bytes
        .chunks(BYTES_PER_CHUNK)
        .map(|bytes| {
            let mut chunk = H256::zero();
            chunk[..bytes.len()].copy_from_slice(bytes);
            chunk
        })
        .collect()
}

/// `hash_tree_root` of a `ByteVector[N]`.
#[must_use]
pub fn byte_vector_root(bytes: &[u8]) -> H256 {
    let chunks = pack_bytes(bytes);
    merkleize(&chunks, depth_for_limit(chunks.len()))
}

/// `hash_tree_root` of a `ByteList[max_length]`.
#[must_use]
pub fn byte_list_root(bytes: &[u8], max_length: usize) -> H256 {
    let chunk_limit = max_length.div_ceil(BYTES_PER_CHUNK);
    let root = merkleize(&pack_bytes(bytes), depth_for_limit(chunk_limit));
    mix_in_length(root, bytes.len())
}

/// `hash_tree_root` of a `List[T, limit]` where `T` is a composite type.
#[must_use]
pub fn list_root<T: SszHash>(elements: &[T], limit: usize) -> H256 {
    let roots = elements.iter().map(SszHash::hash_tree_root).collect::<Vec<_>>();
    mix_in_length(merkleize(&roots, depth_for_limit(limit)), elements.len())
}

/// `hash_tree_root` of a container given the roots of its fields in declaration order.
#[must_use]
pub fn container_root(field_roots: &[H256]) -> H256 {
    merkleize(field_roots, depth_for_limit(field_roots.len()))
}
