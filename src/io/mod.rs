pub mod comments;
pub mod config_io;
pub mod create;
pub mod fetch;
pub mod source;
pub mod watcher;
