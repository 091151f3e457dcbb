pub mod publisher;
pub mod thumbnails;
pub mod transform;
