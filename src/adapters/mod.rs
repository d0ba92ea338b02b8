// Adapters layer: concrete implementations of the domain ports for external
// systems (object storage, HTTP, the GDAL command-line tools).

pub mod gdal;
pub mod http;
pub mod storage;
