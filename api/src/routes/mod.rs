pub mod emergency;
pub mod footprint;
pub mod health;
pub mod location;
pub mod map;
pub mod sessions;
