// Domain layer: intake models, wizard events and the ports to remote collaborators.

pub mod events;
pub mod model;
pub mod ports;
