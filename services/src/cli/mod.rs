mod convert;

pub use convert::{Convert, convert};
