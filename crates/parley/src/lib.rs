//! Parley - a chat bot that translates voice and text messages and replies as
//! text, synthesized speech, or a PDF document.

pub mod artifact;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod language;
pub mod pipeline;
pub mod render;
pub mod services;
pub mod session;
pub mod settings;
