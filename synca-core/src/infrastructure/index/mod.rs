pub mod binary;

pub use binary::{BinaryIndexReader, BinaryIndexWriter};
