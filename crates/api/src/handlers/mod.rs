pub mod insight;
pub mod locks;
pub mod resources;
