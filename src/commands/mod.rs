mod general;
mod price;

pub use general::*;
pub use price::price;
