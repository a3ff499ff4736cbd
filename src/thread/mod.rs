//! Threads, turns and their inputs.

mod identity;
mod input;
mod schema;
mod session;
mod turn;

pub use identity::*;
pub use input::*;
pub use schema::*;
pub use session::*;
pub use turn::*;
