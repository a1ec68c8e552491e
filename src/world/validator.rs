//! Schema checks for every entity of the world tree.
//!
//! Each `decode_*` function checks a plain [`Value`] and, on success, returns
//! the typed entity; `validate_*` is the same check with the result dropped.
//! Checks run top-down and stop at the first violation. A failure inside a
//! child is wrapped with the parent's key and the child's index.

use log::trace;
use serde_json::{Map, Value};

use super::model::{Coordinate, Element, Kind, Layer, Layout, Location, Shape, World};
use crate::error::{Entity, SchemaError};
use crate::value::is_present_value;

type Record = Map<String, Value>;

pub fn validate_coordinate(value: &Value) -> Result<(), SchemaError> {
    decode_coordinate(value).map(drop)
}

pub fn validate_element(value: &Value) -> Result<(), SchemaError> {
    decode_element(value).map(drop)
}

pub fn validate_layer(value: &Value) -> Result<(), SchemaError> {
    decode_layer(value).map(drop)
}

pub fn validate_layout(value: &Value) -> Result<(), SchemaError> {
    decode_layout(value).map(drop)
}

pub fn validate_location(value: &Value) -> Result<(), SchemaError> {
    decode_location(value).map(drop)
}

pub fn validate_world(value: &Value) -> Result<(), SchemaError> {
    decode_world(value).map(drop)
}

/// Exactly two numbers in a sequence.
pub fn decode_coordinate(value: &Value) -> Result<Coordinate, SchemaError> {
    let Value::Array(items) = value else {
        return Err(SchemaError::InvalidCoordinate {
            reason: format!("must be a sequence, found {}", describe(value)),
        });
    };
    if items.len() != 2 {
        return Err(SchemaError::InvalidCoordinate {
            reason: format!("must contain exactly 2 numbers, found {}", items.len()),
        });
    }
    match (items[0].as_f64(), items[1].as_f64()) {
        (Some(x), Some(y)) => Ok(Coordinate { x, y }),
        _ => Err(SchemaError::InvalidCoordinate {
            reason: format!("both items must be numbers, found [{}, {}]", items[0], items[1]),
        }),
    }
}

pub fn decode_element(value: &Value) -> Result<Element, SchemaError> {
    const ENTITY: Entity = Entity::Element;

    let record = as_record(value, ENTITY)?;
    for key in ["id", "position", "kind"] {
        required(record, ENTITY, key)?;
    }

    let id = required_string(record, ENTITY, "id")?;
    let position = decode_coordinate(required(record, ENTITY, "position")?)
        .map_err(|err| SchemaError::field(ENTITY, "position", err))?;
    let kind = decode_kind(required(record, ENTITY, "kind")?)?;

    let shape = match kind {
        Kind::None => Shape::None,
        Kind::Marker => Shape::Marker,
        Kind::Point => Shape::Point,
        Kind::Rectangle => Shape::Rectangle {
            width: required_number(record, ENTITY, "width")?,
            height: required_number(record, ENTITY, "height")?,
        },
        Kind::Custom => {
            let vertices = required_array(record, ENTITY, "vertices")?
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    decode_coordinate(v)
                        .map_err(|err| SchemaError::nested(ENTITY, "vertices", i, err))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Shape::Custom { vertices }
        }
        Kind::Polygon => Shape::Polygon {
            sides: required_count(record, ENTITY, "sides")?,
            radius: required_number(record, ENTITY, "radius")?,
        },
    };

    let meta = record.get("meta").filter(|m| !m.is_null()).cloned();
    trace!(id = id.as_str(), kind = kind.name(); "Decoded element");

    Ok(Element {
        id,
        position,
        shape,
        meta,
    })
}

pub fn decode_layer(value: &Value) -> Result<Layer, SchemaError> {
    const ENTITY: Entity = Entity::Layer;

    let record = as_record(value, ENTITY)?;
    for key in ["id", "name", "geometry"] {
        required(record, ENTITY, key)?;
    }

    let id = required_string(record, ENTITY, "id")?;
    let name = required_string(record, ENTITY, "name")?;
    let display_name = optional_string(record, ENTITY, "display_name")?;
    let description = optional_string(record, ENTITY, "description")?;
    let geometry = required_array(record, ENTITY, "geometry")?
        .iter()
        .enumerate()
        .map(|(i, shape)| {
            decode_element(shape).map_err(|err| SchemaError::nested(ENTITY, "geometry", i, err))
        })
        .collect::<Result<Vec<_>, _>>()?;
    trace!(id = id.as_str(), geometry = geometry.len(); "Decoded layer");

    Ok(Layer {
        id,
        name,
        display_name,
        description,
        geometry,
    })
}

pub fn decode_layout(value: &Value) -> Result<Layout, SchemaError> {
    const ENTITY: Entity = Entity::Layout;

    let record = as_record(value, ENTITY)?;
    for key in ["id", "name", "layers"] {
        required(record, ENTITY, key)?;
    }

    let id = required_string(record, ENTITY, "id")?;
    let name = required_string(record, ENTITY, "name")?;
    let display_name = optional_string(record, ENTITY, "display_name")?;
    let description = optional_string(record, ENTITY, "description")?;
    let layers = required_array(record, ENTITY, "layers")?
        .iter()
        .enumerate()
        .map(|(i, layer)| {
            decode_layer(layer).map_err(|err| SchemaError::nested(ENTITY, "layers", i, err))
        })
        .collect::<Result<Vec<_>, _>>()?;
    trace!(id = id.as_str(), layers = layers.len(); "Decoded layout");

    Ok(Layout {
        id,
        name,
        display_name,
        description,
        layers,
    })
}

/// `layouts` may be a single layout record or a sequence of them.
pub fn decode_location(value: &Value) -> Result<Location, SchemaError> {
    const ENTITY: Entity = Entity::Location;

    let record = as_record(value, ENTITY)?;
    for key in ["id", "name", "layouts"] {
        required(record, ENTITY, key)?;
    }

    let id = required_string(record, ENTITY, "id")?;
    let name = required_string(record, ENTITY, "name")?;
    let display_name = optional_string(record, ENTITY, "display_name")?;
    let description = optional_string(record, ENTITY, "description")?;
    let layouts = one_or_many(required(record, ENTITY, "layouts")?)
        .iter()
        .enumerate()
        .map(|(i, layout)| {
            decode_layout(layout).map_err(|err| SchemaError::nested(ENTITY, "layouts", i, err))
        })
        .collect::<Result<Vec<_>, _>>()?;
    trace!(id = id.as_str(), layouts = layouts.len(); "Decoded location");

    Ok(Location {
        id,
        name,
        display_name,
        description,
        layouts,
    })
}

/// `locations` may be a single location record or a sequence of them.
pub fn decode_world(value: &Value) -> Result<World, SchemaError> {
    const ENTITY: Entity = Entity::World;

    let record = as_record(value, ENTITY)?;
    let locations = one_or_many(required(record, ENTITY, "locations")?)
        .iter()
        .enumerate()
        .map(|(i, loc)| {
            decode_location(loc).map_err(|err| SchemaError::nested(ENTITY, "locations", i, err))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(World { locations })
}

/// Numeric tags 0..=5, or the kind's name in any case.
fn decode_kind(value: &Value) -> Result<Kind, SchemaError> {
    let kind = match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|tag| tag.fract() == 0.0 && (0.0..=5.0).contains(tag))
            .and_then(|tag| Kind::from_tag(tag as u64)),
        Value::String(s) => Kind::from_name(s),
        _ => None,
    };
    kind.ok_or_else(|| SchemaError::UnknownKind {
        entity: Entity::Element,
        found: value.to_string(),
    })
}

/////////////////////
/// FIELD HELPERS ///
/////////////////////

fn as_record(value: &Value, entity: Entity) -> Result<&Record, SchemaError> {
    value.as_object().ok_or(SchemaError::NotARecord {
        entity,
        found: describe(value),
    })
}

fn required<'a>(record: &'a Record, entity: Entity, key: &'static str) -> Result<&'a Value, SchemaError> {
    record
        .get(key)
        .filter(|v| is_present_value(Some(*v)))
        .ok_or(SchemaError::MissingKey { entity, key })
}

fn required_string(record: &Record, entity: Entity, key: &'static str) -> Result<String, SchemaError> {
    required(record, entity, key)?
        .as_str()
        .map(str::to_string)
        .ok_or(SchemaError::WrongType {
            entity,
            key,
            expected: "a string",
        })
}

fn optional_string(
    record: &Record,
    entity: Entity,
    key: &'static str,
) -> Result<Option<String>, SchemaError> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SchemaError::WrongType {
            entity,
            key,
            expected: "a string when present",
        }),
    }
}

fn required_number(record: &Record, entity: Entity, key: &'static str) -> Result<f64, SchemaError> {
    required(record, entity, key)?
        .as_f64()
        .ok_or(SchemaError::WrongType {
            entity,
            key,
            expected: "a number",
        })
}

fn required_count(record: &Record, entity: Entity, key: &'static str) -> Result<u32, SchemaError> {
    let wrong_type = SchemaError::WrongType {
        entity,
        key,
        expected: "a non-negative integer",
    };
    let n = required(record, entity, key)?.as_f64().ok_or(wrong_type.clone())?;
    if n < 0.0 || n.fract() != 0.0 || n > f64::from(u32::MAX) {
        return Err(wrong_type);
    }
    Ok(n as u32)
}

fn required_array<'a>(
    record: &'a Record,
    entity: Entity,
    key: &'static str,
) -> Result<&'a Vec<Value>, SchemaError> {
    required(record, entity, key)?
        .as_array()
        .ok_or(SchemaError::WrongType {
            entity,
            key,
            expected: "a sequence",
        })
}

fn one_or_many(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        single => std::slice::from_ref(single),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a record",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn point(id: &str) -> Value {
        json!({"id": id, "position": [1, 2], "kind": 2})
    }

    fn layer(id: &str) -> Value {
        json!({"id": id, "name": "Zones", "geometry": [point("p")]})
    }

    fn layout(id: &str) -> Value {
        json!({"id": id, "name": "Main", "layers": [layer("zones")]})
    }

    #[test]
    fn test_coordinate() {
        assert_eq!(
            decode_coordinate(&json!([1.5, -2])).unwrap(),
            Coordinate::new(1.5, -2.0)
        );
        for bad in [json!([1, "a"]), json!([1]), json!([1, 2, 3]), json!({"x": 1})] {
            assert!(
                matches!(
                    validate_coordinate(&bad),
                    Err(SchemaError::InvalidCoordinate { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_element_bad_position_is_wrapped() {
        let err = validate_element(&json!({"id": "p", "position": [1, "a"], "kind": 2})).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::InvalidField {
                key: "position",
                ..
            }
        ));
        assert!(matches!(
            err.root_cause(),
            SchemaError::InvalidCoordinate { .. }
        ));
    }

    #[test]
    fn test_element_required_keys() {
        for key in ["id", "position", "kind"] {
            let mut value = point("p");
            value.as_object_mut().unwrap().remove(key);
            assert_eq!(
                validate_element(&value),
                Err(SchemaError::MissingKey {
                    entity: Entity::Element,
                    key
                })
            );
        }

        let null_id = json!({"id": null, "position": [0, 0], "kind": 0});
        assert!(matches!(
            validate_element(&null_id),
            Err(SchemaError::MissingKey { key: "id", .. })
        ));
    }

    #[test]
    fn test_element_kinds() {
        let rect = decode_element(&json!({
            "id": "r", "position": [0, 0], "kind": 3, "width": 4, "height": 2.5
        }))
        .unwrap();
        assert_eq!(
            rect.shape,
            Shape::Rectangle {
                width: 4.0,
                height: 2.5
            }
        );

        let custom = decode_element(&json!({
            "id": "c", "position": [0, 0], "kind": "Custom", "vertices": [[0, 0], [1, 0], [1, 1]]
        }))
        .unwrap();
        assert_eq!(custom.kind(), Kind::Custom);

        let polygon = decode_element(&json!({
            "id": "h", "position": [0, 0], "kind": 5, "sides": 6, "radius": 3
        }))
        .unwrap();
        assert_eq!(polygon.shape, Shape::Polygon { sides: 6, radius: 3.0 });

        let marker = decode_element(&json!({
            "id": "m", "position": [0, 0], "kind": 1, "meta": {"color": "red"}
        }))
        .unwrap();
        assert_eq!(marker.meta, Some(json!({"color": "red"})));
    }

    #[test]
    fn test_element_kind_specific_fields_are_checked() {
        let missing_height = json!({"id": "r", "position": [0, 0], "kind": 3, "width": 1});
        assert_eq!(
            validate_element(&missing_height),
            Err(SchemaError::MissingKey {
                entity: Entity::Element,
                key: "height"
            })
        );

        let bad_vertex = json!({"id": "c", "position": [0, 0], "kind": 4, "vertices": [[0, 0], [1]]});
        assert_eq!(
            validate_element(&bad_vertex).unwrap_err().path(),
            vec![("vertices", 1)]
        );

        let fractional_sides = json!({"id": "h", "position": [0, 0], "kind": 5, "sides": 2.5, "radius": 1});
        assert!(matches!(
            validate_element(&fractional_sides),
            Err(SchemaError::WrongType { key: "sides", .. })
        ));
    }

    #[test]
    fn test_element_integral_float_kind() {
        let element =
            decode_element(&json!({"id": "p", "position": [0, 0], "kind": 2.0})).unwrap();
        assert_eq!(element.kind(), Kind::Point);

        let world = json!({"locations": {"id": "l", "name": "L", "layouts": {
            "id": "m", "name": "M", "layers": [{"id": "z", "name": "Z", "geometry": [
                {"id": "p", "position": [0, 0], "kind": 2.0}
            ]}]
        }}});
        assert!(validate_world(&world).is_ok());
    }

    #[test]
    fn test_element_unknown_kind() {
        let kinds = [
            json!(6),
            json!(2.5),
            json!(5.000001),
            json!("hexagon"),
            json!(true),
            json!(-1),
        ];
        for kind in kinds {
            let value = json!({"id": "x", "position": [0, 0], "kind": kind});
            assert!(matches!(
                validate_element(&value),
                Err(SchemaError::UnknownKind { .. })
            ));
        }
    }

    #[test]
    fn test_layer_id_must_be_string() {
        let err = validate_layer(&json!({"id": 5, "name": "x", "geometry": []})).unwrap_err();
        assert_eq!(
            err,
            SchemaError::WrongType {
                entity: Entity::Layer,
                key: "id",
                expected: "a string"
            }
        );
        assert!(err.to_string().contains("'id' must be a string"));
    }

    #[test]
    fn test_layer_geometry_failure_is_indexed() {
        let value = json!({
            "id": "l", "name": "L",
            "geometry": [point("ok"), {"id": "bad", "position": [0, 0]}]
        });
        let err = validate_layer(&value).unwrap_err();
        assert_eq!(err.path(), vec![("geometry", 1)]);
        assert!(err.to_string().contains("missing required key 'kind'"));
    }

    #[test]
    fn test_layer_optional_strings() {
        let value = json!({"id": "l", "name": "L", "display_name": 3, "geometry": []});
        assert!(matches!(
            validate_layer(&value),
            Err(SchemaError::WrongType {
                key: "display_name",
                ..
            })
        ));

        let value = json!({"id": "l", "name": "L", "description": null, "geometry": []});
        assert_eq!(decode_layer(&value).unwrap().description, None);
    }

    #[test]
    fn test_layout_layers_must_be_sequence() {
        let value = json!({"id": "a", "name": "A", "layers": {"id": "x"}});
        assert!(matches!(
            validate_layout(&value),
            Err(SchemaError::WrongType { key: "layers", .. })
        ));
    }

    #[test]
    fn test_location_accepts_single_layout() {
        let single = json!({"id": "L1", "name": "Loc", "layouts": layout("main")});
        let many = json!({"id": "L1", "name": "Loc", "layouts": [layout("main")]});
        let single = decode_location(&single).unwrap();
        assert_eq!(single.layouts.len(), 1);
        assert_eq!(single, decode_location(&many).unwrap());
    }

    #[test]
    fn test_world_missing_locations() {
        assert_eq!(
            validate_world(&json!({})),
            Err(SchemaError::MissingKey {
                entity: Entity::World,
                key: "locations"
            })
        );
        assert!(matches!(
            validate_world(&Value::Null),
            Err(SchemaError::NotARecord { found: "null", .. })
        ));
    }

    #[test]
    fn test_world_failure_path() {
        let broken_layer = json!({
            "id": "broken", "name": "B",
            "geometry": [{"id": "nokind", "position": [0, 0]}]
        });
        let world = json!({
            "locations": [
                {"id": "A", "name": "A", "layouts": [layout("a0")]},
                {"id": "B", "name": "B", "layouts": [
                    layout("b0"),
                    {"id": "b1", "name": "B1", "layers": [broken_layer]}
                ]}
            ]
        });

        let err = validate_world(&world).unwrap_err();
        assert_eq!(
            err.path(),
            vec![("locations", 1), ("layouts", 1), ("layers", 0), ("geometry", 0)]
        );
        assert_eq!(
            err.root_cause(),
            &SchemaError::MissingKey {
                entity: Entity::Element,
                key: "kind"
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("element 1 of 'locations'"), "{msg}");
        assert!(msg.contains("element 1 of 'layouts'"), "{msg}");
        assert!(msg.contains("element 0 of 'layers'"), "{msg}");
    }
}
