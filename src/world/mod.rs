mod loader;
mod model;
mod serialize;
mod validator;

pub use loader::{
    construct_element, construct_layer, construct_layout, construct_location, construct_world,
    load_world_from_source, load_world_from_str,
};

// Entity types and the per-entity validate/decode pairs.
pub use model::{Coordinate, Element, Kind, Layer, Layout, Location, Shape, Vertex, World};
pub use validator::{
    decode_coordinate, decode_element, decode_layer, decode_layout, decode_location, decode_world,
    validate_coordinate, validate_element, validate_layer, validate_layout, validate_location,
    validate_world,
};
