pub mod http;
pub mod mail;
pub mod store;
