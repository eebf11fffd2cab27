use crate::services::store::HeatPoint;

/// Default map center: Coimbatore.
pub const MAP_CENTER: (f64, f64) = (11.0168, 76.9558);
pub const MAP_ZOOM: u8 = 11;

const HEAT_RADIUS: u8 = 18;
const HEAT_BLUR: u8 = 25;
const HEAT_MAX_ZOOM: u8 = 13;

/// Render ticket coordinates into a self-contained Leaflet + leaflet.heat
/// HTML document. Intensity is the estimated weight in kg.
pub fn render(points: &[HeatPoint]) -> String {
    let data: Vec<[f64; 3]> = points.iter().map(|p| [p.lat, p.lng, p.weight]).collect();
    // Only produces arrays of numbers, cannot fail.
    let heat_data = serde_json::to_string(&data).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Waste Hotspot Heatmap</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
  <script src="https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js"></script>
  <style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
  <div id="map"></div>
  <script>
    var map = L.map('map').setView([{lat}, {lng}], {zoom});
    L.tileLayer('https://tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
      attribution: '&copy; OpenStreetMap contributors'
    }}).addTo(map);
    L.heatLayer({heat_data}, {{
      radius: {radius},
      blur: {blur},
      maxZoom: {max_zoom}
    }}).addTo(map);
  </script>
</body>
</html>
"#,
        lat = MAP_CENTER.0,
        lng = MAP_CENTER.1,
        zoom = MAP_ZOOM,
        heat_data = heat_data,
        radius = HEAT_RADIUS,
        blur = HEAT_BLUR,
        max_zoom = HEAT_MAX_ZOOM,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_points_and_center() {
        let html = render(&[
            HeatPoint { lat: 11.0025, lng: 76.9548, weight: 120.5 },
            HeatPoint { lat: 11.01, lng: 76.96, weight: 40.0 },
        ]);

        assert!(html.contains("[[11.0025,76.9548,120.5],[11.01,76.96,40.0]]"));
        assert!(html.contains("setView([11.0168, 76.9558], 11)"));
        assert!(html.contains("radius: 18"));
        assert!(html.contains("blur: 25"));
    }

    #[test]
    fn empty_store_renders_empty_layer() {
        let html = render(&[]);
        assert!(html.contains("L.heatLayer([]"));
    }
}
