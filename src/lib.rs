// Library root — shared by both binaries and the integration tests.

pub mod bootstrap;
pub mod chat;
pub mod comms;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod logger;
