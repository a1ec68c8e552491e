use serde_json::{Map, Value};

use super::model::{Coordinate, Element, Layer, Layout, Location, Shape, World};
use crate::config::{Config, DisplayNamePolicy, EmitConfig, KindTags};
use crate::error::Result;
use crate::value::{emit_text, number_value};

// Every `to_value` builds a fresh tree: nothing in the output aliases the entity.
// Absent optional fields are left out rather than written as null.

impl World {
    pub fn to_value(&self) -> Value {
        self.to_value_with(&EmitConfig::default())
    }

    pub fn to_value_with(&self, config: &EmitConfig) -> Value {
        let locations = self
            .locations
            .iter()
            .map(|l| l.to_value_with(config))
            .collect();

        let mut record = Map::new();
        record.insert("locations".into(), Value::Array(locations));
        Value::Object(record)
    }

    /// Pretty-printed text form, readable by [`load_world_from_str`](super::load_world_from_str).
    pub fn to_text(&self, config: &Config) -> Result<String> {
        emit_text(&self.to_value_with(config.emit()), config.emit().indent())
    }
}

impl Location {
    pub fn to_value(&self) -> Value {
        self.to_value_with(&EmitConfig::default())
    }

    /// `layouts` is always written as a sequence.
    pub fn to_value_with(&self, config: &EmitConfig) -> Value {
        let mut record = header(
            &self.id,
            &self.name,
            self.display_name.as_deref(),
            self.description.as_deref(),
        );
        let layouts = self
            .layouts
            .iter()
            .map(|l| l.to_value_with(config))
            .collect();
        record.insert("layouts".into(), Value::Array(layouts));
        Value::Object(record)
    }
}

impl Layout {
    pub fn to_value(&self) -> Value {
        self.to_value_with(&EmitConfig::default())
    }

    pub fn to_value_with(&self, config: &EmitConfig) -> Value {
        let mut record = header(
            &self.id,
            &self.name,
            self.display_name.as_deref(),
            self.description.as_deref(),
        );
        let layers = self
            .layers
            .iter()
            .map(|l| l.to_value_with(config))
            .collect();
        record.insert("layers".into(), Value::Array(layers));
        Value::Object(record)
    }
}

impl Layer {
    pub fn to_value(&self) -> Value {
        self.to_value_with(&EmitConfig::default())
    }

    pub fn to_value_with(&self, config: &EmitConfig) -> Value {
        let display_name = match config.layer_display_name() {
            DisplayNamePolicy::Preserve => self.display_name.as_deref(),
            DisplayNamePolicy::MirrorName => Some(self.name.as_str()),
        };
        let mut record = header(
            &self.id,
            &self.name,
            display_name,
            self.description.as_deref(),
        );
        let geometry = self
            .geometry
            .iter()
            .map(|e| e.to_value_with(config))
            .collect();
        record.insert("geometry".into(), Value::Array(geometry));
        Value::Object(record)
    }
}

impl Element {
    pub fn to_value(&self) -> Value {
        self.to_value_with(&EmitConfig::default())
    }

    pub fn to_value_with(&self, config: &EmitConfig) -> Value {
        let kind = self.kind();
        let tag = match config.kind_tags() {
            KindTags::Numeric => Value::from(kind.tag()),
            KindTags::Named => Value::from(kind.name()),
        };

        let mut record = Map::new();
        record.insert("id".into(), Value::from(self.id.as_str()));
        record.insert("position".into(), coordinate(self.position));
        record.insert("kind".into(), tag);

        match &self.shape {
            Shape::None | Shape::Marker | Shape::Point => {}
            Shape::Rectangle { width, height } => {
                record.insert("width".into(), number(*width));
                record.insert("height".into(), number(*height));
            }
            Shape::Custom { vertices } => {
                let vertices = vertices.iter().copied().map(coordinate).collect();
                record.insert("vertices".into(), Value::Array(vertices));
            }
            Shape::Polygon { sides, radius } => {
                record.insert("sides".into(), Value::from(*sides));
                record.insert("radius".into(), number(*radius));
            }
        }

        if let Some(meta) = &self.meta {
            record.insert("meta".into(), meta.clone());
        }
        Value::Object(record)
    }
}

fn header(
    id: &str,
    name: &str,
    display_name: Option<&str>,
    description: Option<&str>,
) -> Map<String, Value> {
    let mut record = Map::new();
    record.insert("id".into(), Value::from(id));
    record.insert("name".into(), Value::from(name));
    if let Some(display_name) = display_name {
        record.insert("display_name".into(), Value::from(display_name));
    }
    if let Some(description) = description {
        record.insert("description".into(), Value::from(description));
    }
    record
}

fn coordinate(c: Coordinate) -> Value {
    Value::Array(vec![number(c.x), number(c.y)])
}

// Non-finite numbers have no text form; they are written as null.
fn number(n: f64) -> Value {
    number_value(n).unwrap_or(Value::Null)
}
