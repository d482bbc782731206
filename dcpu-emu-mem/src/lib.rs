pub mod phys;
pub mod screen;
