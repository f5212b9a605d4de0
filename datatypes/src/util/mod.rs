mod result;

pub use result::Result;
