//! Client core for the Chatforge dashboard: account flows (registration with
//! email-code verification, login, password reset/change), per-bot chat
//! sessions, and dashboard bot management against the remote backend API.

pub mod config;
pub mod domain;
pub mod error;
pub mod infra;
pub mod otp;
pub mod session;
pub mod usecase;
