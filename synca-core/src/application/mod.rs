pub mod synchronizer;

pub use synchronizer::Synchronizer;
