pub mod health;
pub mod media_serve;
pub mod media_upload;
pub mod presets;
