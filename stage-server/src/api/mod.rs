pub mod manifest;
pub mod portal;
