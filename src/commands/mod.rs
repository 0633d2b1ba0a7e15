pub mod ladder;
pub mod presets;
pub mod score;
pub mod validate;
