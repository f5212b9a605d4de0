mod tile_writer;

pub use tile_writer::{TileWriter, TileWriterOptions};
