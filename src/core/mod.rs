pub mod clock;
pub mod state_machine;
pub mod token;
