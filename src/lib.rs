pub mod bot;
pub mod channels;
pub mod chat;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod gateway;
pub mod policy;
pub mod providers;
pub mod session;
pub mod utils;
pub mod workspace;
