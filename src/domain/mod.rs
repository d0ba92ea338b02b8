// Domain layer: core models and ports (interfaces). No I/O here; adapters
// and jobs depend on these types, never the other way round.

pub mod geojson;
pub mod model;
pub mod ports;
pub mod raster;
