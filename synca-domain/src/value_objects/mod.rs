pub mod base_mode;
pub mod chunker_params;
pub mod direction;
pub mod mode_bits;
pub mod object_id;
pub mod step_outcome;

pub use base_mode::BaseMode;
pub use chunker_params::ChunkerParams;
pub use direction::Direction;
pub use mode_bits::{effective_perm_mode, validate_perm_mode, DEFAULT_PERM_MODE};
pub use object_id::{ObjectId, RunningDigest};
pub use step_outcome::StepOutcome;
