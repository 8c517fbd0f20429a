//! Renderer adapter: features to map-widget primitives.
//!
//! Map widgets take `(lat, lon)` pairs, so every position is flipped from the
//! `(x, y)` order features are stored in.

use geo::LineString;
use serde::Serialize;
use serde_json::{json, Value};

use crate::feature::{Feature, Rgba};
use crate::geometry::FeatureGeometry;

/// A `(lat, lon)` pair.
pub type LatLon = (f64, f64);

/// A drawable primitive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderItem {
    Marker {
        location: LatLon,
        popup: String,
    },
    Path {
        locations: Vec<LatLon>,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<Rgba>,
        popup: String,
    },
    /// Filled shape drawn from the exterior ring.
    Shape {
        locations: Vec<LatLon>,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<Rgba>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fill_color: Option<Rgba>,
        popup: String,
    },
}

impl RenderItem {
    pub fn popup(&self) -> &str {
        match self {
            RenderItem::Marker { popup, .. }
            | RenderItem::Path { popup, .. }
            | RenderItem::Shape { popup, .. } => popup,
        }
    }
}

/// Map one feature to its primitives. A MultiLineString gives one path per
/// member line; everything else gives exactly one item.
pub fn render_feature(feature: &Feature) -> Vec<RenderItem> {
    let popup = popup_html(feature);
    let color = feature.style.color;

    match &feature.geometry {
        FeatureGeometry::Point(p) => vec![RenderItem::Marker {
            location: (p.y(), p.x()),
            popup,
        }],
        FeatureGeometry::LineString(ls) => vec![RenderItem::Path {
            locations: lat_lons(ls),
            color,
            popup,
        }],
        // Stroke takes the symbol colour and fill takes the outline colour.
        FeatureGeometry::Polygon(p) => vec![RenderItem::Shape {
            locations: lat_lons(p.exterior()),
            color,
            fill_color: feature.style.outline_color,
            popup,
        }],
        FeatureGeometry::MultiLineString(mls) => mls
            .0
            .iter()
            .map(|ls| RenderItem::Path {
                locations: lat_lons(ls),
                color,
                popup: popup.clone(),
            })
            .collect(),
    }
}

/// Render a feature list in order.
pub fn render_all(features: &[Feature]) -> Vec<RenderItem> {
    features.iter().flat_map(render_feature).collect()
}

/// Popup body: the table name, then one `key: value` line per attribute.
pub fn popup_html(feature: &Feature) -> String {
    let mut html = format!("<b>Table: {}</b><br>", escape_html(&feature.source_table));
    let lines: Vec<String> = feature
        .attributes
        .iter()
        .map(|(key, value)| {
            format!(
                "<b>{}:</b> {}",
                escape_html(key),
                escape_html(&display_value(value))
            )
        })
        .collect();
    html.push_str(&lines.join("<br>"));
    html
}

/// GeoJSON `FeatureCollection` of the features. The source table and style
/// ride along as foreign members so properties stay pure attributes.
pub fn feature_collection(features: &[Feature]) -> Value {
    let features: Vec<Value> = features
        .iter()
        .map(|f| {
            json!({
                "type": "Feature",
                "geometry": f.geometry,
                "properties": f.attributes,
                "table": f.source_table,
                "style": f.style,
            })
        })
        .collect();
    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}

fn lat_lons(ls: &LineString<f64>) -> Vec<LatLon> {
    ls.0.iter().map(|c| (c.y, c.x)).collect()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
