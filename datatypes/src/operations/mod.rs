mod buffer;

pub use self::buffer::{LocalMetricProjector, buffer_meters, hex_buffer};
