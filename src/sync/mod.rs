pub mod barrier_manager;
pub mod cond_manager;
pub mod mutex_manager;

pub use barrier_manager::{BarrierManager, BarrierWaitResult};
pub use cond_manager::CondManager;
pub use mutex_manager::MutexManager;
