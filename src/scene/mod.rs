pub mod document;
pub mod editor;
pub mod model;
pub mod query;
