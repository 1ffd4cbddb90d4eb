//! Keccak256 hashing and per-column Merkle commitments
//!
//! Each trace column is committed on its own; openings are single cells with
//! the sibling path to the column root.

use sha3::{Digest, Keccak256};

use crate::m31::M31;

pub const HASH_SIZE: usize = 32;

pub type Hash = [u8; HASH_SIZE];

/// Hash several byte slices as one message
pub fn hash_parts(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

pub fn hash_bytes(data: &[u8]) -> Hash {
    hash_parts(&[data])
}

#[inline]
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    hash_parts(&[left, right])
}

#[inline]
pub fn hash_leaf(value: M31) -> Hash {
    hash_parts(&[&value.to_le_bytes()])
}

/// Sibling hashes from a leaf up to the root
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath {
    pub siblings: Vec<Hash>,
    pub leaf_index: usize,
}

impl MerklePath {
    pub fn verify(&self, leaf_hash: &Hash, root: &Hash) -> bool {
        let start = (*leaf_hash, self.leaf_index);
        let (computed, _) = self.siblings.iter().fold(start, |(node, index), sibling| {
            let parent = if index & 1 == 0 {
                hash_pair(&node, sibling)
            } else {
                hash_pair(sibling, &node)
            };
            (parent, index >> 1)
        });
        &computed == root
    }
}

/// Commitment to one column
///
/// Nodes are stored heap-style: `nodes[1]` is the root and the children of
/// `nodes[i]` are `nodes[2i]` and `nodes[2i + 1]`. Leaves are padded to a power
/// of two with the hash of the empty message.
#[derive(Clone, Debug)]
pub struct MerkleCommitment {
    values: Vec<M31>,
    nodes: Vec<Hash>,
    width: usize,
}

impl MerkleCommitment {
    pub fn commit(values: &[M31]) -> Self {
        let width = values.len().max(1).next_power_of_two();
        let mut nodes = vec![[0u8; HASH_SIZE]; 2 * width];

        let padding = hash_bytes(&[]);
        for (slot, leaf) in nodes[width..].iter_mut().enumerate() {
            *leaf = values.get(slot).map_or(padding, |&v| hash_leaf(v));
        }
        for i in (1..width).rev() {
            nodes[i] = hash_pair(&nodes[2 * i], &nodes[2 * i + 1]);
        }

        Self {
            values: values.to_vec(),
            nodes,
            width,
        }
    }

    pub fn root(&self) -> Hash {
        self.nodes[1]
    }

    /// Sibling levels in an opening path
    pub fn depth(&self) -> usize {
        self.width.trailing_zeros() as usize
    }

    /// Value and path at `index`, `None` past the committed values
    pub fn open(&self, index: usize) -> Option<(M31, MerklePath)> {
        let value = *self.values.get(index)?;
        let mut node = self.width + index;
        let mut siblings = Vec::with_capacity(self.depth());
        while node > 1 {
            siblings.push(self.nodes[node ^ 1]);
            node >>= 1;
        }
        Some((
            value,
            MerklePath {
                siblings,
                leaf_index: index,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_parts_matches_concatenation() {
        assert_eq!(hash_parts(&[b"ab".as_slice(), b"cd".as_slice()]), hash_bytes(b"abcd"));
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"world"));
    }

    #[test]
    fn test_padding_to_power_of_two() {
        let values: Vec<M31> = (0..5u32).map(M31::new).collect();
        let commitment = MerkleCommitment::commit(&values);
        assert_eq!(commitment.depth(), 3);

        let (value, path) = commitment.open(4).unwrap();
        assert_eq!(path.siblings[0], hash_bytes(&[]));
        assert!(path.verify(&hash_leaf(value), &commitment.root()));
        assert!(commitment.open(5).is_none());
    }

    #[test]
    fn test_open_and_verify() {
        let values: Vec<M31> = (0..16u32).map(|i| M31::new(i * 31 + 7)).collect();
        let commitment = MerkleCommitment::commit(&values);
        assert_eq!(commitment.depth(), 4);

        for index in [0usize, 1, 7, 15] {
            let (value, path) = commitment.open(index).unwrap();
            assert_eq!(value, values[index]);
            assert!(path.verify(&hash_leaf(value), &commitment.root()));
            assert!(!path.verify(&hash_leaf(value + M31::ONE), &commitment.root()));
        }
    }

    #[test]
    fn test_path_rejects_wrong_index() {
        let values: Vec<M31> = (0..8u32).map(M31::new).collect();
        let commitment = MerkleCommitment::commit(&values);
        let (value, mut path) = commitment.open(3).unwrap();

        path.leaf_index = 2;
        assert!(!path.verify(&hash_leaf(value), &commitment.root()));
    }

    #[test]
    fn test_single_value() {
        let commitment = MerkleCommitment::commit(&[M31::new(9)]);
        assert_eq!(commitment.depth(), 0);
        assert_eq!(commitment.root(), hash_leaf(M31::new(9)));
    }
}
