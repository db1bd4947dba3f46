//! I/O operations for reading and writing geospatial data

pub mod deadline;
mod export;
mod native;

pub use deadline::{with_timeout, CommitGate};
pub use export::{export_geotiff, export_raster, ExportOptions, ExportReceipt};
pub use native::{
    encode_bands, read_geotiff, read_geotiff_bands, read_geotiff_from_buffer, write_geotiff,
    write_geotiff_to_buffer,
};
