//! Key, lock and door interaction gadgets
//!
//! These sit outside the disturbance engine. The only thing they share with it
//! is the scene's notion of poses; the door reads the lock's `is_unlocked` flag.

mod door;
mod lock;

pub use door::Door;
pub use lock::{Key, Lock};
