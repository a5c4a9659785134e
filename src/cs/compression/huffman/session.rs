//! State of a single Huffman compression run.
//!
//! A [`HuffmanSession`] bundles what a caller needs to display or undo a
//! compression: the tree, its code table and the encoded bits. Each call to
//! [`HuffmanSession::compress`] builds a fresh, independent session.

use super::{
    build_code_table, build_frequency_table, build_huffman_tree, decode, encode, CodeTable,
    FrequencyTable, HuffmanNode, PackedPayload,
};
use crate::cs::compression::Result;
use log::info;

/// Size comparison between the input as 8-bit symbols and its Huffman bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionStats {
    /// Input size counting 8 bits per symbol
    pub original_bits: usize,
    /// Length of the encoded bit string
    pub compressed_bits: usize,
}

impl CompressionStats {
    pub fn new(symbol_count: usize, compressed_bits: usize) -> Self {
        CompressionStats {
            original_bits: symbol_count * 8,
            compressed_bits,
        }
    }

    /// Percentage of bits saved. Negative if the encoding is larger.
    pub fn ratio(&self) -> f64 {
        if self.original_bits == 0 {
            return 0.0;
        }
        (1.0 - self.compressed_bits as f64 / self.original_bits as f64) * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct HuffmanSession {
    tree: Box<HuffmanNode>,
    code_table: CodeTable,
    last_bitstring: String,
    symbol_count: usize,
}

impl HuffmanSession {
    /// Compresses `text`, producing a new session.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyInput`](crate::cs::error::Error::EmptyInput) if `text` is empty.
    pub fn compress(text: &str) -> Result<Self> {
        let freq_table = build_frequency_table(text)?;
        let tree = build_huffman_tree(&freq_table)?;
        let code_table = build_code_table(&tree);
        let last_bitstring = encode(text, &code_table)?;
        let symbol_count = text.chars().count();

        let session = HuffmanSession {
            tree,
            code_table,
            last_bitstring,
            symbol_count,
        };
        let stats = session.stats();
        info!(
            "compressed {} bits to {} bits ({:.2}% saved)",
            stats.original_bits,
            stats.compressed_bits,
            stats.ratio()
        );
        Ok(session)
    }

    pub fn tree(&self) -> &HuffmanNode {
        &self.tree
    }

    pub fn code_table(&self) -> &CodeTable {
        &self.code_table
    }

    /// The encoded bits as a `'0'`/`'1'` string.
    pub fn bitstring(&self) -> &str {
        &self.last_bitstring
    }

    pub fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    /// Symbol counts of the compressed text, recovered from the tree.
    pub fn frequencies(&self) -> FrequencyTable {
        self.tree.frequencies()
    }

    pub fn decompress(&self) -> Result<String> {
        decode(&self.last_bitstring, &self.tree)
    }

    pub fn stats(&self) -> CompressionStats {
        CompressionStats::new(self.symbol_count, self.last_bitstring.len())
    }

    /// Packs the encoded bits and tree for storage.
    pub fn pack(&self) -> Result<PackedPayload> {
        PackedPayload::pack(&self.last_bitstring, self.tree.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cs::error::Error;
    use approx::assert_relative_eq;

    #[test]
    fn test_session_roundtrip() {
        let text = "a session holds one compression run";
        let session = HuffmanSession::compress(text).unwrap();
        assert_eq!(session.decompress().unwrap(), text);
        assert_eq!(session.symbol_count(), text.len());
        assert_eq!(session.frequencies(), build_frequency_table(text).unwrap());
        assert_eq!(session.code_table(), &build_code_table(session.tree()));
    }

    #[test]
    fn test_session_stats() {
        let session = HuffmanSession::compress("aabbbcc").unwrap();
        let stats = session.stats();
        assert_eq!(stats.original_bits, 56);
        assert_eq!(stats.compressed_bits, 11);
        assert_relative_eq!(stats.ratio(), (1.0 - 11.0 / 56.0) * 100.0);
    }

    #[test]
    fn test_ratio_can_be_negative() {
        let stats = CompressionStats::new(1, 9);
        assert!(stats.ratio() < 0.0);
        assert_relative_eq!(CompressionStats::new(0, 0).ratio(), 0.0);
    }

    #[test]
    fn test_session_pack() {
        let session = HuffmanSession::compress("mississippi river").unwrap();
        let packed = session.pack().unwrap();
        assert_eq!(packed.unpack(), session.bitstring());
        assert_eq!(packed.tree(), session.tree());
        assert_eq!(packed.decode().unwrap(), "mississippi river");
    }

    #[test]
    fn test_sessions_are_independent() {
        let first = HuffmanSession::compress("first text").unwrap();
        let second = HuffmanSession::compress("zzzz").unwrap();
        assert_eq!(first.decompress().unwrap(), "first text");
        assert_eq!(second.decompress().unwrap(), "zzzz");
        assert_eq!(second.bitstring(), "0000");
    }

    #[test]
    fn test_empty_session() {
        assert!(matches!(
            HuffmanSession::compress(""),
            Err(Error::EmptyInput)
        ));
    }
}
