pub mod archive_codec;
pub mod chunker;
pub mod index;
pub mod object_store;

pub use archive_codec::{ArchiveDecoder, ArchiveEncoder, DecodeStep, EncodeStep};
pub use chunker::{Chunker, CutPoint};
pub use index::{IndexReader, IndexRecord, IndexWriter, ReadObject};
pub use object_store::ObjectStore;
