pub mod error;
pub mod pipeline;
pub mod processing;
pub mod sink;
pub mod source;
pub mod util;
