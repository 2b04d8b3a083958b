pub mod controller;
pub mod discord;
pub mod loop_worker;
pub mod track;

pub use controller::PresenceController;
pub use discord::{DiscordPresence, PresenceSink};
