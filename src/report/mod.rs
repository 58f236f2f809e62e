pub mod json;
pub mod output;
pub mod summary;
pub mod terminal;
