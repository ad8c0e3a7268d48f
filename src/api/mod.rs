pub mod attendance;
pub mod health;
pub mod leave;
pub mod schedule;
