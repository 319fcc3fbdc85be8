// Domain layer: tidy data model and ports (interfaces).

pub mod model;
pub mod ports;
pub mod table;
