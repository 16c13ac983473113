pub mod api;
pub mod manager;
pub mod notice;
pub mod reminder;
pub mod view;
