pub mod tree_codec;

pub use tree_codec::{TreeDecoder, TreeEncoder};
