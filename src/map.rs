//! Leaflet map documents written to per-request files

use crate::config::MapConfig;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const LEAFLET_VERSION: &str = "1.9.4";

/// A point of interest with a popup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub lat: f64,
    pub lon: f64,
    pub popup: String,
}

/// Everything needed to draw one map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
    pub marker: Option<Marker>,
}

/// Builds map documents and stores them under the output directory
pub struct MapRenderer {
    output_dir: PathBuf,
    default_center: (f64, f64),
    zoom: u8,
}

impl MapRenderer {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.output_dir),
            default_center: (config.default_lat, config.default_lon),
            zoom: config.zoom,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Map centered on the given point, or the default center when absent
    pub fn centered(&self, lat: Option<f64>, lon: Option<f64>) -> MapView {
        MapView {
            lat: lat.unwrap_or(self.default_center.0),
            lon: lon.unwrap_or(self.default_center.1),
            zoom: self.zoom,
            marker: None,
        }
    }

    /// Map centered on an alert with a marker naming the reporter
    pub fn alert(&self, lat: f64, lon: f64, reporter: &str) -> MapView {
        MapView {
            lat,
            lon,
            zoom: self.zoom,
            marker: Some(Marker {
                lat,
                lon,
                popup: format!("Alerta reportada por {}", reporter),
            }),
        }
    }

    /// Standalone HTML document drawing `view`
    pub fn render_html(&self, view: &MapView) -> String {
        // Keep the JSON from closing the surrounding script element.
        let data = serde_json::to_string(view)
            .unwrap_or_else(|_| "null".to_string())
            .replace("</", "<\\/");

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<link rel="stylesheet" href="https://unpkg.com/leaflet@{v}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{v}/dist/leaflet.js"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
const view = {data};
const map = L.map("map").setView([view.lat, view.lon], view.zoom);
L.tileLayer("https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
  attribution: "&copy; OpenStreetMap contributors"
}}).addTo(map);
if (view.marker) {{
  L.marker([view.marker.lat, view.marker.lon]).addTo(map).bindPopup(view.marker.popup).openPopup();
}}
</script>
</body>
</html>
"#,
            v = LEAFLET_VERSION,
            data = data
        )
    }

    /// Write `view` to a fresh file and return its name.
    ///
    /// Every call gets its own file, so concurrent alerts never overwrite
    /// each other.
    pub async fn write(&self, view: &MapView) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let file_name = format!("map_{}.html", uuid::Uuid::new_v4().simple());
        let path = self.output_dir.join(&file_name);
        tokio::fs::write(&path, self.render_html(view)).await?;

        info!(
            file = %file_name,
            lat = view.lat,
            lon = view.lon,
            "Map written"
        );
        Ok(file_name)
    }

    /// Read back a file produced by [`MapRenderer::write`]
    pub async fn read(&self, file_name: &str) -> io::Result<Option<String>> {
        if !is_map_file_name(file_name) {
            debug!(file = %file_name, "Rejected map file name");
            return Ok(None);
        }
        match tokio::fs::read_to_string(self.output_dir.join(file_name)).await {
            Ok(html) => Ok(Some(html)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delete a generated map file. Returns whether a file was removed.
    pub async fn remove(&self, file_name: &str) -> io::Result<bool> {
        if !is_map_file_name(file_name) {
            return Ok(false);
        }
        match tokio::fs::remove_file(self.output_dir.join(file_name)).await {
            Ok(()) => {
                debug!(file = %file_name, "Map removed");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Whether `name` has the shape of a generated map file (`map_<32 hex>.html`)
pub fn is_map_file_name(name: &str) -> bool {
    name.strip_prefix("map_")
        .and_then(|rest| rest.strip_suffix(".html"))
        .map(|id| id.len() == 32 && id.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(dir: &Path) -> MapRenderer {
        MapRenderer::new(&MapConfig {
            output_dir: dir.display().to_string(),
            default_lat: 4.711,
            default_lon: -74.0721,
            zoom: 12,
        })
    }

    #[test]
    fn test_default_center() {
        let dir = tempfile::tempdir().unwrap();
        let view = renderer(dir.path()).centered(None, Some(-75.5));
        assert_eq!(view.lat, 4.711);
        assert_eq!(view.lon, -75.5);
        assert!(view.marker.is_none());
    }

    #[test]
    fn test_popup_cannot_close_script() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path());
        let html = renderer.render_html(&renderer.alert(1.0, 2.0, "</script><b>x"));
        assert!(!html.contains("</script><b>"));
    }

    #[test]
    fn test_file_name_shape() {
        assert!(is_map_file_name("map_0123456789abcdef0123456789abcdef.html"));
        assert!(!is_map_file_name("map_../../etc/passwd.html"));
        assert!(!is_map_file_name("map_123.html"));
        assert!(!is_map_file_name("index.html"));
    }

    #[tokio::test]
    async fn test_write_unique_files() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path());
        let view = renderer.alert(4.0, -74.0, "ana");

        let first = renderer.write(&view).await.unwrap();
        let second = renderer.write(&view).await.unwrap();
        assert_ne!(first, second);

        let html = renderer.read(&first).await.unwrap().unwrap();
        assert!(html.contains(r#""lat":4.0"#));
        assert!(html.contains(r#""lon":-74.0"#));
        assert!(html.contains("Alerta reportada por ana"));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path());
        let missing = "map_0123456789abcdef0123456789abcdef.html";
        assert!(renderer.read(missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_only_generated_files() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = renderer(dir.path());
        let name = renderer.write(&renderer.centered(None, None)).await.unwrap();

        std::fs::write(dir.path().join("keep.html"), "x").unwrap();
        assert!(!renderer.remove("keep.html").await.unwrap());
        assert!(dir.path().join("keep.html").exists());

        assert!(renderer.remove(&name).await.unwrap());
        assert!(!renderer.remove(&name).await.unwrap());
        assert!(renderer.read(&name).await.unwrap().is_none());
    }
}
