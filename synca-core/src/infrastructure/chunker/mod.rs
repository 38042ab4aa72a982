pub mod gear;

pub use gear::GearChunker;
