pub mod bbox;
pub mod sphere;
