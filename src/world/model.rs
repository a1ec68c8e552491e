use serde_json::Value;

///////////////////////////
/// WORLD TREE ENTITIES ///
///////////////////////////

/// Root of the tree and the unit of load/save.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct World {
    pub locations: Vec<Location>,
}

/// A named site (e.g. a building) owning one or more layouts.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub layouts: Vec<Layout>, // always a sequence, even when built from a single record
}

/// One spatial arrangement of a location.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub layers: Vec<Layer>,
}

/// A named group of geometry, e.g. "zones" vs. "structures".
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub geometry: Vec<Element>,
}

/// Leaf of the tree: a positioned shape or marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub id: String, // free-form, not required to be unique
    pub position: Coordinate,
    pub shape: Shape,
    pub meta: Option<Value>,
}

impl Element {
    pub fn kind(&self) -> Kind {
        self.shape.kind()
    }
}

/// An (x, y) pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

/// A corner of a custom shape. Same pair as [`Coordinate`], different role.
pub type Vertex = Coordinate;

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// Geometry tag. The discriminants are the numeric wire tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    None = 0,
    Marker = 1,
    Point = 2,
    Rectangle = 3,
    Custom = 4,
    Polygon = 5,
}

impl Kind {
    pub const ALL: [Kind; 6] = [
        Kind::None,
        Kind::Marker,
        Kind::Point,
        Kind::Rectangle,
        Kind::Custom,
        Kind::Polygon,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::None => "none",
            Kind::Marker => "marker",
            Kind::Point => "point",
            Kind::Rectangle => "rectangle",
            Kind::Custom => "custom",
            Kind::Polygon => "polygon",
        }
    }

    pub fn from_tag(tag: u64) -> Option<Kind> {
        Kind::ALL.into_iter().find(|k| u64::from(k.tag()) == tag)
    }

    pub fn from_name(name: &str) -> Option<Kind> {
        Kind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// Kind plus the fields that kind carries.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    None,
    Marker,
    Point,
    Rectangle { width: f64, height: f64 },
    Custom { vertices: Vec<Vertex> },
    Polygon { sides: u32, radius: f64 },
}

impl Shape {
    pub fn kind(&self) -> Kind {
        match self {
            Shape::None => Kind::None,
            Shape::Marker => Kind::Marker,
            Shape::Point => Kind::Point,
            Shape::Rectangle { .. } => Kind::Rectangle,
            Shape::Custom { .. } => Kind::Custom,
            Shape::Polygon { .. } => Kind::Polygon,
        }
    }
}

//////////////////////
/// LOOKUP HELPERS ///
//////////////////////

// Ids are not unique anywhere in the tree; every lookup returns the first match.

impl World {
    pub fn location(&self, id: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }
}

impl Location {
    pub fn layout(&self, id: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.id == id)
    }
}

impl Layout {
    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }
}

impl Layer {
    pub fn element(&self, id: &str) -> Option<&Element> {
        self.geometry.iter().find(|e| e.id == id)
    }
}
