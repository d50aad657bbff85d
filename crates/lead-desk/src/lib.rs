//! Terminal desk for lead intake, realtime notifications and the manager
//! approval queue.

pub mod analysis;
pub mod app;
pub mod chat;
pub mod config;
pub mod editor;
pub mod form;
pub mod input;
pub mod manager;
pub mod notifications;
pub mod push;
pub mod router;
pub mod runtime;
pub mod stats;
pub mod ui;
