//! Bit-packed Huffman payloads.
//!
//! A [`PackedPayload`] stores the code bits eight to a byte together with the tree
//! needed to decode them. The serialized form is, little endian throughout:
//!
//! | field          | size                         |
//! |----------------|------------------------------|
//! | magic `HUF1`   | 4 bytes                      |
//! | symbol count   | `u64`                        |
//! | tree length    | `u32`                        |
//! | tree           | pre-order node records       |
//! | padding bits   | `u8`, `0..=7`                |
//! | payload length | `u64`                        |
//! | payload        | packed bits, MSB first       |
//!
//! A leaf record is `0x01`, the scalar value as `u32` and the frequency as `u64`.
//! An internal record is `0x00` followed by its left and right subtrees. Internal
//! frequencies are recomputed from the children on read.

use super::{parse_bits, walk_codes, HuffmanNode};
use crate::cs::compression::Result;
use crate::cs::error::Error;
use bitvec::prelude::*;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{debug, warn};
use std::collections::HashSet;
use std::io::{self, Cursor, Read, Write};

const MAGIC: &[u8; 4] = b"HUF1";
const INTERNAL_TAG: u8 = 0x00;
const LEAF_TAG: u8 = 0x01;

/// Deepest tree `read_tree` accepts. A Huffman tree over `u64` counts is at most
/// about 92 levels deep, since depth `d` needs a total weight of at least `F(d + 2)`.
const MAX_TREE_DEPTH: usize = 128;

/// Huffman-coded bits packed into bytes, with the tree they were coded against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedPayload {
    symbol_count: usize,
    tree: Box<HuffmanNode>,
    bits: BitVec<u8, Msb0>,
}

impl PackedPayload {
    /// Packs a `'0'`/`'1'` bit string produced against `tree`.
    ///
    /// The bits are walked through the tree first, so a stream that would not
    /// decode is rejected before anything is packed.
    pub fn pack(bitstring: &str, tree: Box<HuffmanNode>) -> Result<Self> {
        let mut bits = BitVec::<u8, Msb0>::with_capacity(bitstring.len());
        let mut symbol_count = 0;
        walk_codes(
            parse_bits(bitstring).inspect(|bit| {
                if let Ok(bit) = bit {
                    bits.push(*bit);
                }
            }),
            &tree,
            |_| symbol_count += 1,
        )?;
        bits.set_uninitialized(false);

        debug!(
            "packed {} bits for {} symbols into {} bytes",
            bits.len(),
            symbol_count,
            bits.as_raw_slice().len()
        );
        Ok(PackedPayload {
            symbol_count,
            tree,
            bits,
        })
    }

    /// Number of symbols the payload decodes to.
    pub fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    pub fn tree(&self) -> &HuffmanNode {
        &self.tree
    }

    /// Number of meaningful bits, excluding padding.
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// Zero bits appended to fill the final byte.
    pub fn padding(&self) -> u8 {
        ((8 - self.bits.len() % 8) % 8) as u8
    }

    /// The packed payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.bits.as_raw_slice()
    }

    /// Expands the packed bits back into a `'0'`/`'1'` string.
    pub fn unpack(&self) -> String {
        self.bits
            .iter()
            .by_vals()
            .map(|bit| if bit { '1' } else { '0' })
            .collect()
    }

    /// Decodes the payload straight from the packed bits.
    pub fn decode(&self) -> Result<String> {
        let mut result = String::with_capacity(self.symbol_count);
        walk_codes(self.bits.iter().by_vals().map(Ok), &self.tree, |ch| {
            result.push(ch)
        })?;
        Ok(result)
    }

    /// Serializes the payload into its binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut tree_bytes = Vec::new();
        write_tree(&self.tree, &mut tree_bytes)?;
        let tree_len = u32::try_from(tree_bytes.len())
            .map_err(|_| rejected("serialized tree exceeds u32::MAX bytes"))?;
        let payload = self.as_bytes();

        let mut out = Vec::with_capacity(4 + 8 + 4 + tree_bytes.len() + 1 + 8 + payload.len());
        out.write_all(MAGIC)?;
        out.write_u64::<LittleEndian>(self.symbol_count as u64)?;
        out.write_u32::<LittleEndian>(tree_len)?;
        out.write_all(&tree_bytes)?;
        out.write_u8(self.padding())?;
        out.write_u64::<LittleEndian>(payload.len() as u64)?;
        out.write_all(payload)?;
        Ok(out)
    }

    /// Parses and validates a payload produced by [`PackedPayload::to_bytes`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidFormat`] for a bad header, a truncated or oversized buffer, an
    /// invalid tree, or bits that do not decode to exactly `symbol_count` symbols.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic).map_err(truncated)?;
        if &magic != MAGIC {
            return Err(rejected("bad magic number"));
        }

        let symbol_count = to_usize(cursor.read_u64::<LittleEndian>().map_err(truncated)?)?;
        let tree_len = cursor.read_u32::<LittleEndian>().map_err(truncated)? as usize;
        let tree_bytes = read_block(&mut cursor, tree_len)?;
        let tree = read_tree(&tree_bytes)?;

        let padding = cursor.read_u8().map_err(truncated)?;
        if padding > 7 {
            return Err(rejected(format!("padding of {padding} bits")));
        }
        let payload_len = to_usize(cursor.read_u64::<LittleEndian>().map_err(truncated)?)?;
        let payload = read_block(&mut cursor, payload_len)?;
        if (cursor.position() as usize) != data.len() {
            return Err(rejected("trailing bytes after payload"));
        }
        if payload.is_empty() && padding != 0 {
            return Err(rejected("padding without payload"));
        }

        let bit_len = payload.len() * 8 - padding as usize;
        let mut bits = BitVec::<u8, Msb0>::from_vec(payload);
        if bits[bit_len..].any() {
            return Err(rejected("non-zero padding bits"));
        }
        bits.truncate(bit_len);

        let mut decoded = 0;
        walk_codes(bits.iter().by_vals().map(Ok), &tree, |_| decoded += 1)
            .map_err(|e| rejected(format!("payload does not decode: {e}")))?;
        if decoded != symbol_count {
            return Err(rejected(format!(
                "header declares {symbol_count} symbols, payload holds {decoded}"
            )));
        }

        Ok(PackedPayload {
            symbol_count,
            tree,
            bits,
        })
    }
}

fn rejected(msg: impl Into<String>) -> Error {
    let msg = msg.into();
    warn!("rejecting packed payload: {msg}");
    Error::InvalidFormat(msg)
}

fn truncated(_: io::Error) -> Error {
    rejected("payload is truncated")
}

fn to_usize(value: u64) -> Result<usize> {
    usize::try_from(value).map_err(|_| rejected(format!("length {value} does not fit in memory")))
}

fn read_block(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>> {
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if len > remaining {
        return Err(truncated(io::ErrorKind::UnexpectedEof.into()));
    }
    let mut block = vec![0u8; len];
    cursor.read_exact(&mut block).map_err(truncated)?;
    Ok(block)
}

fn write_tree<W: Write>(node: &HuffmanNode, out: &mut W) -> Result<()> {
    match node {
        HuffmanNode::Leaf { ch, freq } => {
            out.write_u8(LEAF_TAG)?;
            out.write_u32::<LittleEndian>(u32::from(*ch))?;
            out.write_u64::<LittleEndian>(*freq as u64)?;
        }
        HuffmanNode::Internal { left, right, .. } => {
            out.write_u8(INTERNAL_TAG)?;
            write_tree(left, out)?;
            write_tree(right, out)?;
        }
    }
    Ok(())
}

/// Rebuilds a tree from pre-order records without recursion. Trees deeper than
/// [`MAX_TREE_DEPTH`] are rejected, so the recursive traversals that later walk,
/// compare or drop the tree stay shallow.
fn read_tree(bytes: &[u8]) -> Result<Box<HuffmanNode>> {
    let mut cursor = Cursor::new(bytes);
    // Each entry is an internal node awaiting children; `Some` once the left is known.
    let mut pending: Vec<Option<Box<HuffmanNode>>> = Vec::new();
    let mut seen = HashSet::new();

    loop {
        let mut node = match cursor.read_u8().map_err(truncated)? {
            INTERNAL_TAG => {
                if pending.len() >= MAX_TREE_DEPTH {
                    return Err(rejected(format!(
                        "tree is deeper than {MAX_TREE_DEPTH} levels"
                    )));
                }
                pending.push(None);
                continue;
            }
            LEAF_TAG => {
                let scalar = cursor.read_u32::<LittleEndian>().map_err(truncated)?;
                let ch = char::from_u32(scalar)
                    .ok_or_else(|| rejected(format!("{scalar:#x} is not a scalar value")))?;
                let freq = to_usize(cursor.read_u64::<LittleEndian>().map_err(truncated)?)?;
                if freq == 0 {
                    return Err(rejected(format!("leaf {ch:?} has zero frequency")));
                }
                if !seen.insert(ch) {
                    return Err(rejected(format!("symbol {ch:?} appears twice in tree")));
                }
                Box::new(HuffmanNode::Leaf { ch, freq })
            }
            tag => return Err(rejected(format!("unknown node tag {tag:#04x}"))),
        };

        loop {
            match pending.pop() {
                None => {
                    if (cursor.position() as usize) != bytes.len() {
                        return Err(rejected("trailing bytes after tree"));
                    }
                    return Ok(node);
                }
                Some(None) => {
                    pending.push(Some(node));
                    break;
                }
                Some(Some(left)) => {
                    let freq = left
                        .freq()
                        .checked_add(node.freq())
                        .ok_or_else(|| rejected("tree frequencies overflow"))?;
                    node = Box::new(HuffmanNode::Internal {
                        freq,
                        left,
                        right: node,
                    });
                }
            }
        }
    }
}
