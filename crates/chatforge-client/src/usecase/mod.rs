pub mod account;
pub mod bots;
pub mod chat;
