//! Codex CLI process spawning and stream parsing.

mod completion;
mod events;
mod items;
mod locate;
mod process;
mod stream;

pub use completion::*;
pub use events::*;
pub use items::*;
pub use locate::*;
pub use process::*;
pub use stream::*;
