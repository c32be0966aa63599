// Domain layer: reconciliation models and the capability traits the core consumes.

pub mod model;
pub mod ports;
