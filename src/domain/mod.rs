pub mod event;
pub mod thumbnail;
