//! Compression algorithms implementation.
//!
//! This module provides lossless entropy coding:
//! - Huffman prefix coding with an explicit tree
//! - Bit-packed payloads carrying the tree alongside the data
//!
//! # Examples
//!
//! ```rust
//! use huffcodec::cs::compression::{Compression, Huffman};
//!
//! let packed = Huffman.compress(b"abracadabra").unwrap();
//! assert_eq!(Huffman.decompress(&packed).unwrap(), b"abracadabra");
//! ```

use crate::cs::error::Error;

/// Result type for compression operations
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for compression algorithms
pub trait Compression {
    /// Compress the input data
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Decompress the compressed data
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

pub mod huffman;
pub use huffman::{
    build_code_table, build_frequency_table, build_huffman_tree, decode, encode, huffman_decode,
    huffman_encode, merge_frequencies, weighted_path_length, CodeTable, CompressionStats,
    FrequencyTable, Huffman, HuffmanNode, HuffmanSession, PackedPayload,
};
