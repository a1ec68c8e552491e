use std::path::Path;

use log::{debug, trace, warn};
use serde_json::Value;

use super::model::{Element, Layer, Layout, Location, World};
use super::validator::{decode_element, decode_layer, decode_layout, decode_location, decode_world};
use crate::error::{Error, Result, SchemaError};
use crate::source::TextSource;
use crate::value::{Untrusted, parse_text};

//////////////////////////////
/// CONSTRUCTION FUNCTIONS ///
//////////////////////////////

// Each constructor snapshots its input first (a deep copy for `Dynamic`
// graphs), validates the snapshot, and builds the typed entity from it. Any
// failure leaves no instance behind.

fn construct<T>(
    input: &impl Untrusted,
    entity: &'static str,
    decode: fn(&Value) -> std::result::Result<T, SchemaError>,
) -> Result<T> {
    let plain = input.to_plain()?;
    let built = decode(&plain)?;
    trace!(entity = entity; "Constructed entity");
    Ok(built)
}

pub fn construct_element(input: &impl Untrusted) -> Result<Element> {
    construct(input, "element", decode_element)
}

pub fn construct_layer(input: &impl Untrusted) -> Result<Layer> {
    construct(input, "layer", decode_layer)
}

pub fn construct_layout(input: &impl Untrusted) -> Result<Layout> {
    construct(input, "layout", decode_layout)
}

/// A lone layout record under `layouts` becomes a one-element sequence.
pub fn construct_location(input: &impl Untrusted) -> Result<Location> {
    construct(input, "location", decode_location)
}

/// A lone location record under `locations` becomes a one-element sequence.
pub fn construct_world(input: &impl Untrusted) -> Result<World> {
    let world = construct(input, "world", decode_world)?;
    debug!(locations = world.locations.len(); "World constructed");
    Ok(world)
}

/////////////////////////
/// LOADING FUNCTIONS ///
/////////////////////////

/// Public API: build a world from its text form.
pub fn load_world_from_str(text: &str) -> Result<World> {
    let parsed = parse_text(text)?;
    let world = decode_world(&parsed).map_err(Error::InvalidWorld)?;
    debug!(locations = world.locations.len(), bytes = text.len(); "World loaded from text");
    Ok(world)
}

/// Public API: read the whole document from `source`, then build the world.
///
/// The read is the only suspension point; parsing starts once the source
/// has delivered everything.
pub async fn load_world_from_source(
    source: &impl TextSource,
    path: impl AsRef<Path>,
) -> Result<World> {
    let path = path.as_ref();
    debug!(path = path.display().to_string(); "Reading world");

    let text = source.read_text(path).await.map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if text.trim().is_empty() {
        warn!(path = path.display().to_string(); "World source is empty");
    }

    load_world_from_str(&text)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::path::PathBuf;

    use futures::{Stream, stream};
    use serde_json::json;

    use super::*;
    use crate::error::CopyError;
    use crate::source::{Chunk, ChunkSource};
    use crate::value::Dynamic;
    use crate::world::Shape;

    struct MemorySource(HashMap<PathBuf, String>);

    impl TextSource for MemorySource {
        async fn read_text(&self, path: &Path) -> io::Result<String> {
            self.0
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such entry"))
        }
    }

    /// Delivers `world_text` in two halves, with a dropped connection between them.
    struct InterruptedSource;

    impl ChunkSource for InterruptedSource {
        fn chunks(&self, _path: &Path) -> impl Stream<Item = io::Result<Chunk>> + Send {
            let (head, tail) = world_text().split_at(40);
            stream::iter([
                Ok(Chunk::Text(head.to_string())),
                Err(io::Error::new(io::ErrorKind::ConnectionAborted, "dropped")),
                Ok(Chunk::Text(tail.to_string())),
            ])
        }
    }

    fn world_text() -> &'static str {
        r#"{
            "locations": [{
                "id": "3008",
                "name": "Wier",
                "layouts": {
                    "id": "main",
                    "name": "Main floor",
                    "layers": [{
                        "id": "zones",
                        "name": "Zones",
                        "geometry": [
                            {"id": "a", "position": [0, 0], "kind": 1},
                            {"id": "b", "position": [5, 5], "kind": 3, "width": 2, "height": 2}
                        ]
                    }]
                }
            }]
        }"#
    }

    #[test]
    fn test_load_world_from_str() {
        let world = load_world_from_str(world_text()).unwrap();
        let location = world.location("3008").unwrap();
        assert_eq!(location.layouts.len(), 1);
        let layer = location.layout("main").unwrap().layer("zones").unwrap();
        assert_eq!(layer.geometry.len(), 2);
        assert_eq!(
            layer.element("b").unwrap().shape,
            Shape::Rectangle {
                width: 2.0,
                height: 2.0
            }
        );
    }

    #[test]
    fn test_load_world_from_str_parse_error() {
        let err = load_world_from_str("{\"locations\": [").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse world data"));
    }

    #[test]
    fn test_load_world_from_str_invalid_world() {
        let err = load_world_from_str("{}").unwrap_err();
        assert!(matches!(err, Error::InvalidWorld(SchemaError::MissingKey { .. })));
        assert!(
            err.to_string()
                .starts_with("parsed data is not a valid World: ")
        );

        let err = load_world_from_str("null").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidWorld(SchemaError::NotARecord { .. })
        ));
    }

    #[test]
    fn test_construct_layer_from_dynamic_is_isolated() {
        let meta = Dynamic::object([("tags", Dynamic::array([Dynamic::from("cold")]))]);
        let element = Dynamic::object([
            ("id", Dynamic::from("m")),
            ("position", Dynamic::array([Dynamic::from(1), Dynamic::from(2)])),
            ("kind", Dynamic::from(1)),
            ("meta", meta.clone()),
        ]);
        let record = Dynamic::object([
            ("id", Dynamic::from("l")),
            ("name", Dynamic::from("L")),
            ("geometry", Dynamic::array([element])),
        ]);

        let layer = construct_layer(&record).unwrap();
        meta.get("tags").unwrap().push(Dynamic::from("wet"));

        assert_eq!(layer.geometry[0].meta, Some(json!({"tags": ["cold"]})));
    }

    #[test]
    fn test_construct_rejects_cyclic_meta() {
        let meta = Dynamic::object::<&str>([]);
        meta.insert("self", meta.clone());
        let element = Dynamic::object([
            ("id", Dynamic::from("m")),
            ("position", Dynamic::array([Dynamic::from(0), Dynamic::from(0)])),
            ("kind", Dynamic::from(1)),
            ("meta", meta),
        ]);
        assert!(matches!(
            construct_element(&element),
            Err(Error::Copy(CopyError::Cycle))
        ));
    }

    #[test]
    fn test_construct_rejects_opaque_values() {
        let element = Dynamic::object([
            ("id", Dynamic::from("m")),
            ("position", Dynamic::array([Dynamic::from(0), Dynamic::from(0)])),
            ("kind", Dynamic::from(0)),
            ("meta", Dynamic::opaque(|| ())),
        ]);
        assert!(matches!(
            construct_element(&element),
            Err(Error::Copy(CopyError::UnsupportedType { .. }))
        ));
    }

    #[test]
    fn test_construct_layout_schema_error() {
        let err = construct_layout(&json!({"id": "x", "name": "X"})).unwrap_err();
        assert!(matches!(
            err,
            Error::Schema(SchemaError::MissingKey { key: "layers", .. })
        ));
    }

    #[tokio::test]
    async fn test_load_world_from_source() {
        let path = PathBuf::from("worlds/wier.json");
        let source = MemorySource(HashMap::from([(path.clone(), world_text().to_string())]));

        let world = load_world_from_source(&source, &path).await.unwrap();
        assert_eq!(world, load_world_from_str(world_text()).unwrap());
    }

    #[tokio::test]
    async fn test_load_world_from_source_io_error() {
        let source = MemorySource(HashMap::new());
        let err = load_world_from_source(&source, "missing.json")
            .await
            .unwrap_err();
        match err {
            Error::Io { path, source } => {
                assert_eq!(path, PathBuf::from("missing.json"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected I/O error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_world_from_interrupted_chunk_source() {
        let err = load_world_from_source(&InterruptedSource, "remote/wier.json")
            .await
            .unwrap_err();
        match err {
            Error::Io { path, source } => {
                assert_eq!(path, PathBuf::from("remote/wier.json"));
                assert_eq!(source.kind(), io::ErrorKind::ConnectionAborted);
            }
            other => panic!("expected I/O error, got {other:?}"),
        }
    }
}
