// src/player/mod.rs

pub mod machine;
pub mod session;
pub mod view;

pub use machine::{Attempt, Event, Participant, Phase, TransitionError};
pub use session::{AttemptHandle, PlayerRegistry};
pub use view::AttemptView;
