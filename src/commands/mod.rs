pub mod comment;
pub mod export;
pub mod init;
pub mod project;
pub mod settings;
pub mod task;
pub mod user;
