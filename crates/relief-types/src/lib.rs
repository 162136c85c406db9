pub mod cell;
pub mod geom;
pub mod image;
pub mod params;

pub use cell::*;
pub use geom::*;
pub use image::*;
pub use params::*;
