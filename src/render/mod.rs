pub mod canvas;
pub mod cpu;
pub mod frame;
