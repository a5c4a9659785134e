//! Huffman prefix coding.
//!
//! Huffman coding assigns each symbol a variable-length bit string whose length
//! shrinks as the symbol's frequency grows. The codes come from a binary tree built
//! greedily by repeatedly merging the two least frequent subtrees; reading the path
//! from the root to a leaf (`0` for left, `1` for right) gives that leaf's code.
//! Because symbols only live at leaves, no code is a prefix of another and the
//! concatenated stream decodes without delimiters.
//!
//! This implementation provides:
//! - Frequency counting (optionally parallel behind the `parallel` feature)
//! - Deterministic tree construction
//! - Code table generation, encoding to a `'0'`/`'1'` string and tree-walk decoding
//! - A bit-packed payload format carrying the tree with the data ([`PackedPayload`])
//! - A session object holding the state of one compression run ([`HuffmanSession`])
//!
//! # Tie-breaking
//!
//! Nodes are ordered by `(frequency, order)`. Leaves are numbered by sorting them by
//! frequency and then by symbol; every merged node takes the next free number. The
//! node popped first becomes the left child. The resulting tree depends only on the
//! frequency table, so repeated runs produce identical output.
//!
//! # Example
//!
//! ```
//! use huffcodec::cs::compression::huffman::{huffman_decode, huffman_encode};
//!
//! let (bits, tree) = huffman_encode("aabbbcc").unwrap();
//! assert_eq!(bits, "10100001111");
//! assert_eq!(huffman_decode(&bits, &tree).unwrap(), "aabbbcc");
//! ```

use crate::cs::compression::{Compression, Result};
use crate::cs::error::Error;
use log::{debug, trace};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

pub mod packed;
pub mod session;

pub use packed::PackedPayload;
pub use session::{CompressionStats, HuffmanSession};

/// Count of occurrences per symbol. Every count is at least one.
pub type FrequencyTable = HashMap<char, usize>;

/// Symbol to code, each code a non-empty string of `'0'` and `'1'`.
pub type CodeTable = HashMap<char, String>;

/// Represents a node in the Huffman tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HuffmanNode {
    /// A leaf node contains a character and its frequency.
    Leaf { ch: char, freq: usize },
    /// An internal node with left and right children and combined frequency.
    Internal {
        freq: usize,
        left: Box<HuffmanNode>,
        right: Box<HuffmanNode>,
    },
}

impl HuffmanNode {
    /// Returns the frequency of the node.
    pub fn freq(&self) -> usize {
        match self {
            HuffmanNode::Leaf { freq, .. } => *freq,
            HuffmanNode::Internal { freq, .. } => *freq,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, HuffmanNode::Leaf { .. })
    }

    /// Number of edges on the longest root-to-leaf path. A lone leaf has depth 0.
    pub fn depth(&self) -> usize {
        match self {
            HuffmanNode::Leaf { .. } => 0,
            HuffmanNode::Internal { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            HuffmanNode::Leaf { .. } => 1,
            HuffmanNode::Internal { left, right, .. } => left.leaf_count() + right.leaf_count(),
        }
    }

    /// Recovers the frequency table stored in the leaves.
    pub fn frequencies(&self) -> FrequencyTable {
        let mut table = HashMap::new();
        self.collect_frequencies(&mut table);
        table
    }

    fn collect_frequencies(&self, table: &mut FrequencyTable) {
        match self {
            HuffmanNode::Leaf { ch, freq } => {
                table.insert(*ch, *freq);
            }
            HuffmanNode::Internal { left, right, .. } => {
                left.collect_frequencies(table);
                right.collect_frequencies(table);
            }
        }
    }
}

/// Priority queue entry. `BinaryHeap` is a max-heap, so the ordering is reversed
/// to pop the lowest `(freq, order)` first.
#[derive(Debug)]
struct QueueEntry {
    freq: usize,
    order: usize,
    node: Box<HuffmanNode>,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.freq == other.freq && self.order == other.order
    }
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .freq
            .cmp(&self.freq)
            .then_with(|| other.order.cmp(&self.order))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Build a frequency table mapping each character in `input` to its frequency.
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] if `input` is empty.
pub fn build_frequency_table(input: &str) -> Result<FrequencyTable> {
    if input.is_empty() {
        return Err(Error::EmptyInput);
    }
    let freq = count_symbols(input);
    debug!(
        "counted {} distinct symbols in {} bytes of input",
        freq.len(),
        input.len()
    );
    Ok(freq)
}

#[cfg(not(feature = "parallel"))]
fn count_symbols(input: &str) -> FrequencyTable {
    let mut freq = HashMap::new();
    for ch in input.chars() {
        *freq.entry(ch).or_insert(0) += 1;
    }
    freq
}

#[cfg(feature = "parallel")]
fn count_symbols(input: &str) -> FrequencyTable {
    use rayon::prelude::*;

    input
        .par_chars()
        .fold(HashMap::new, |mut acc, ch| {
            *acc.entry(ch).or_insert(0) += 1;
            acc
        })
        .reduce(HashMap::new, merge_frequencies)
}

/// Combines two partial frequency tables by adding counts per symbol.
///
/// The merge is associative and commutative, so tables counted over disjoint
/// slices of an input can be combined in any order.
pub fn merge_frequencies(mut acc: FrequencyTable, other: FrequencyTable) -> FrequencyTable {
    for (ch, count) in other {
        *acc.entry(ch).or_insert(0) += count;
    }
    acc
}

/// Build the Huffman tree given a frequency table.
///
/// A table with a single symbol yields a lone [`HuffmanNode::Leaf`].
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] for an empty table and [`Error::InvalidInput`] if a
/// count is zero or the total overflows.
pub fn build_huffman_tree(freq_table: &FrequencyTable) -> Result<Box<HuffmanNode>> {
    let mut leaves: Vec<(char, usize)> = freq_table.iter().map(|(&ch, &f)| (ch, f)).collect();
    leaves.sort_unstable_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

    let mut heap = BinaryHeap::with_capacity(leaves.len());
    for (order, (ch, freq)) in leaves.into_iter().enumerate() {
        if freq == 0 {
            return Err(Error::InvalidInput(format!(
                "symbol {ch:?} has zero frequency"
            )));
        }
        heap.push(QueueEntry {
            freq,
            order,
            node: Box::new(HuffmanNode::Leaf { ch, freq }),
        });
    }

    let mut next_order = heap.len();
    loop {
        let Some(left) = heap.pop() else {
            return Err(Error::EmptyInput);
        };
        let Some(right) = heap.pop() else {
            debug!(
                "built Huffman tree with {} leaves, depth {}",
                left.node.leaf_count(),
                left.node.depth()
            );
            return Ok(left.node);
        };

        let freq = left
            .freq
            .checked_add(right.freq)
            .ok_or_else(|| Error::InvalidInput("symbol frequencies overflow".to_string()))?;
        trace!(
            "merging nodes {} (freq {}) and {} (freq {}) into {}",
            left.order,
            left.freq,
            right.order,
            right.freq,
            next_order
        );
        heap.push(QueueEntry {
            freq,
            order: next_order,
            node: Box::new(HuffmanNode::Internal {
                freq,
                left: left.node,
                right: right.node,
            }),
        });
        next_order += 1;
    }
}

/// Recursively build the code table mapping characters to their Huffman codes.
///
/// If the tree consists of a single leaf (i.e. one unique symbol), the code "0" is assigned.
pub fn build_code_table(node: &HuffmanNode) -> CodeTable {
    let mut table = HashMap::new();
    match node {
        HuffmanNode::Leaf { ch, .. } => {
            table.insert(*ch, "0".to_string());
        }
        HuffmanNode::Internal { .. } => {
            build_code_table_helper(node, &mut String::new(), &mut table);
        }
    }
    table
}

fn build_code_table_helper(node: &HuffmanNode, prefix: &mut String, table: &mut CodeTable) {
    match node {
        HuffmanNode::Leaf { ch, .. } => {
            table.insert(*ch, prefix.clone());
        }
        HuffmanNode::Internal { left, right, .. } => {
            prefix.push('0');
            build_code_table_helper(left, prefix, table);
            prefix.pop();
            prefix.push('1');
            build_code_table_helper(right, prefix, table);
            prefix.pop();
        }
    }
}

/// Sum of `frequency * code length` over every symbol in `freq_table`.
///
/// Symbols missing from `code_table` contribute nothing.
pub fn weighted_path_length(freq_table: &FrequencyTable, code_table: &CodeTable) -> usize {
    freq_table
        .iter()
        .filter_map(|(ch, freq)| code_table.get(ch).map(|code| freq * code.len()))
        .sum()
}

/// Encode the input string using the provided code table.
/// Each character is replaced with its Huffman code.
///
/// # Errors
///
/// [`Error::EmptyInput`] for empty input, [`Error::UnknownSymbol`] for a character the
/// table has no code for.
pub fn encode(input: &str, code_table: &CodeTable) -> Result<String> {
    if input.is_empty() {
        return Err(Error::EmptyInput);
    }
    let mut encoded = String::with_capacity(input.len() * 4);
    for ch in input.chars() {
        let code = code_table.get(&ch).ok_or(Error::UnknownSymbol(ch))?;
        encoded.push_str(code);
    }
    Ok(encoded)
}

/// Decode an encoded bit string using the Huffman tree.
/// Traverses the tree according to each bit until a leaf is reached.
///
/// # Errors
///
/// [`Error::InvalidBit`] for characters other than `'0'` and `'1'`, and
/// [`Error::MalformedStream`] if the bits stop partway through a code.
pub fn decode(encoded: &str, tree: &HuffmanNode) -> Result<String> {
    let mut result = String::new();
    walk_codes(parse_bits(encoded), tree, |ch| result.push(ch))?;
    Ok(result)
}

pub(crate) fn parse_bits(encoded: &str) -> impl Iterator<Item = Result<bool>> + '_ {
    encoded
        .chars()
        .enumerate()
        .map(|(position, bit)| match bit {
            '0' => Ok(false),
            '1' => Ok(true),
            found => Err(Error::InvalidBit { position, found }),
        })
}

/// Walks `tree` along `bits`, calling `emit` for every leaf reached.
///
/// A lone leaf root consumes one `0` bit per symbol.
pub(crate) fn walk_codes<I, F>(bits: I, tree: &HuffmanNode, mut emit: F) -> Result<()>
where
    I: IntoIterator<Item = Result<bool>>,
    F: FnMut(char),
{
    let mut current = tree;
    let mut position = 0;
    let mut code_start = 0;

    for bit in bits {
        let go_right = bit?;
        let next: &HuffmanNode = match current {
            HuffmanNode::Internal { left, right, .. } => {
                if go_right {
                    right
                } else {
                    left
                }
            }
            HuffmanNode::Leaf { .. } if !go_right => current,
            HuffmanNode::Leaf { .. } => {
                return Err(Error::MalformedStream {
                    position: code_start,
                })
            }
        };
        position += 1;

        if let HuffmanNode::Leaf { ch, .. } = next {
            emit(*ch);
            current = tree;
            code_start = position;
        } else {
            current = next;
        }
    }

    if code_start != position {
        return Err(Error::MalformedStream {
            position: code_start,
        });
    }
    Ok(())
}

/// Convenience function: builds the Huffman tree from input, encodes the input,
/// and returns (encoded bit string, Huffman tree).
pub fn huffman_encode(input: &str) -> Result<(String, Box<HuffmanNode>)> {
    let freq_table = build_frequency_table(input)?;
    let tree = build_huffman_tree(&freq_table)?;
    let code_table = build_code_table(&tree);
    let encoded = encode(input, &code_table)?;
    debug!(
        "encoded {} symbols into {} bits",
        input.chars().count(),
        encoded.len()
    );
    Ok((encoded, tree))
}

/// Convenience function: decodes an encoded bit string using the provided Huffman tree.
pub fn huffman_decode(encoded: &str, tree: &HuffmanNode) -> Result<String> {
    decode(encoded, tree)
}

/// Huffman coding over UTF-8 text, producing [`PackedPayload`] bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Huffman;

impl Compression for Huffman {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::InvalidInput(format!("input is not valid UTF-8: {e}")))?;
        let (encoded, tree) = huffman_encode(text)?;
        PackedPayload::pack(&encoded, tree)?.to_bytes()
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let payload = PackedPayload::from_bytes(data)?;
        Ok(payload.decode()?.into_bytes())
    }
}
