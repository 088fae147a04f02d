//! `taskdeck`: terminal Kanban client with optimistic task updates.

pub mod api;
pub mod app;
pub mod auth;
pub mod board;
pub mod config;
pub mod dragdrop;
pub mod engine;
pub mod filter;
pub mod session;
pub mod store;
pub mod ui;
