mod post;
mod series;
pub mod timestamp;

pub use post::*;
pub use series::*;
