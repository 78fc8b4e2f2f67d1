pub mod banner;
pub mod color;
pub mod kai;
pub mod prompt;
