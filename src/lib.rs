//! Core of a small multi-user project/task tracker: identity and access,
//! the task status state machine with its role and comment gates,
//! per-task comment threads, project progress, and notification fan-out
//! over email/in-app/SMS channels.
//!
//! Presentation is out of scope; the bundled CLI is one thin consumer of
//! these modules, and any other front end drives them the same way: open
//! a [`db::Database`], build a [`notify::Notifier`] with the transports
//! of your choice, and call the operation functions.

pub mod auth;
pub mod comments;
pub mod db;
pub mod error;
pub mod models;
pub mod notify;
pub mod projects;
pub mod tasks;

pub use db::Database;
pub use error::{Error, Result};
