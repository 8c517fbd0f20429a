//! Layer styling from ESRI `drawing_info` renderer descriptors.

use serde::{Serialize, Serializer};
use serde_json::Value;

/// An 8-bit RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse an ESRI `[r, g, b, a]` colour array; alpha defaults to opaque.
    pub fn from_value(value: &Value) -> Option<Self> {
        let parts = value.as_array()?;
        let channel = |i: usize| -> Option<u8> {
            let n = parts.get(i)?.as_f64()?;
            Some(n.round().clamp(0.0, 255.0) as u8)
        };
        let alpha = match parts.get(3) {
            Some(_) => channel(3)?,
            None => 255,
        };
        Some(Self::new(channel(0)?, channel(1)?, channel(2)?, alpha))
    }

    /// CSS `rgba()` form with alpha scaled to 0–1.
    pub fn to_css(&self) -> String {
        format!(
            "rgba({},{},{},{})",
            self.r,
            self.g,
            self.b,
            f64::from(self.a) / 255.0
        )
    }
}

impl std::fmt::Display for Rgba {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_css())
    }
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_css())
    }
}

/// Resolved style of a layer. Both colours absent means "no explicit style".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Style {
    /// `renderer.symbol.color`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
    /// `renderer.symbol.outline.color`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline_color: Option<Rgba>,
}

impl Style {
    /// Resolve from a `drawing_info` value, which drivers may return as an
    /// object or as JSON text. Anything unrecognised yields the default style.
    pub fn from_drawing_info(drawing_info: &Value) -> Self {
        let parsed;
        let info = match drawing_info {
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(value) => {
                    parsed = value;
                    &parsed
                }
                Err(e) => {
                    tracing::debug!(error = %e, "drawing_info is not JSON");
                    return Self::default();
                }
            },
            other => other,
        };

        let symbol = &info["renderer"]["symbol"];
        Self {
            color: Rgba::from_value(&symbol["color"]),
            outline_color: Rgba::from_value(&symbol["outline"]["color"]),
        }
    }

    pub fn is_explicit(&self) -> bool {
        self.color.is_some() || self.outline_color.is_some()
    }
}
