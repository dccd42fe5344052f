pub mod arc_length;
pub mod curve;
