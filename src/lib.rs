pub mod autonomous;
pub mod config;
pub mod drive;
pub mod hardware;
pub mod mechanism;
pub mod messages;
pub mod operator;
pub mod runtime;
