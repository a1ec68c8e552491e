//! Validated, hierarchical spatial data model.
//!
//! A [`World`] holds [`Location`]s, each owning one or more [`Layout`]s made
//! of [`Layer`]s of geometry [`Element`]s. Worlds are built from untrusted
//! input (text, plain [`Value`]s, or aliased [`Dynamic`] graphs), validated
//! top-down, and written back out as text that loads into an equal world.
//!
//! ```
//! use worldplan::{Config, load_world_from_str};
//!
//! let world = load_world_from_str(r#"{"locations": []}"#).unwrap();
//! let text = world.to_text(&Config::default()).unwrap();
//! assert_eq!(load_world_from_str(&text).unwrap(), world);
//! ```

pub mod config;
pub mod error;
pub mod source;
pub mod value;
pub mod world;

pub use config::Config;
pub use error::{CopyError, Entity, Error, Result, SchemaError};
pub use source::{ChunkSource, FsSource, TextSource};
pub use value::{Dynamic, Untrusted, Value, deep_copy, emit_text, is_present, parse_text};
pub use world::{
    Coordinate, Element, Kind, Layer, Layout, Location, Shape, Vertex, World, construct_world,
    load_world_from_source, load_world_from_str,
};

#[cfg(feature = "wasm")]
mod wasm_bindings {
    use serde::Serialize;
    use serde_wasm_bindgen::Serializer;
    use wasm_bindgen::prelude::*;

    use super::{Config, Value, World, construct_world, load_world_from_str};

    fn to_js_error(err: impl std::fmt::Display) -> JsValue {
        JsValue::from_str(&err.to_string())
    }

    #[wasm_bindgen]
    pub struct WasmWorld {
        world: World,
        config: Config,
    }

    #[wasm_bindgen]
    impl WasmWorld {
        /// Create a world from its JSON text.
        #[wasm_bindgen(constructor)]
        pub fn new(text: &str) -> Result<WasmWorld, JsValue> {
            let world = load_world_from_str(text).map_err(to_js_error)?;
            Ok(WasmWorld {
                world,
                config: Config::default(),
            })
        }

        /// Create a world from a plain JS object.
        #[wasm_bindgen(js_name = fromObject)]
        pub fn from_object(object: JsValue) -> Result<WasmWorld, JsValue> {
            let value: Value = serde_wasm_bindgen::from_value(object)?;
            let world = construct_world(&value).map_err(to_js_error)?;
            Ok(WasmWorld {
                world,
                config: Config::default(),
            })
        }

        /// Replace the emission settings with a TOML document.
        #[wasm_bindgen(js_name = setConfig)]
        pub fn set_config(&mut self, toml: &str) -> Result<(), JsValue> {
            self.config = Config::from_toml_str(toml).map_err(to_js_error)?;
            Ok(())
        }

        #[wasm_bindgen(getter, js_name = locationCount)]
        pub fn location_count(&self) -> usize {
            self.world.locations.len()
        }

        /// Export as pretty-printed JSON text.
        #[wasm_bindgen(js_name = toText)]
        pub fn to_text(&self) -> Result<String, JsValue> {
            self.world.to_text(&self.config).map_err(to_js_error)
        }

        /// Export as a plain JS object (records become objects, not Maps).
        #[wasm_bindgen(js_name = toObject)]
        pub fn to_object(&self) -> Result<JsValue, JsValue> {
            let value = self.world.to_value_with(self.config.emit());
            Ok(value.serialize(&Serializer::json_compatible())?)
        }
    }
}

#[cfg(feature = "wasm")]
pub use wasm_bindings::WasmWorld;
