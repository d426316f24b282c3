pub mod core;
pub mod files;
pub mod matches;
pub mod roster;
pub mod send;
pub mod sent_log;
pub mod templates;
