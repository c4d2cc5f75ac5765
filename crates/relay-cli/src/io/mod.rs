pub mod feed;
pub mod registry;
