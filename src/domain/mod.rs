pub mod batch;
pub mod review;
pub mod target;

pub use batch::{BatchPlan, TargetEntry};
pub use review::{Field, ReviewRecord};
pub use target::Target;
