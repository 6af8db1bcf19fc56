pub mod client;
pub mod types;

pub use client::Client;
pub use types::{
    Assignee, Comment, ListInfo, ListStatus, RawTask, StatusTime, TaskStatusRef, TasksPage,
    TimeInStatus,
};
