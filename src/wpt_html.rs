// Standalone Leaflet page for the WayPoint Tracker
//
// The page is kept as a `&'static str` template and the map view is embedded as
// a JSON literal, so the output file opens directly in a browser.

use crate::wpt_models::{Result, WPTError};
use crate::wpt_views::MapView;

const MAP_DATA_PLACEHOLDER: &str = "__WPT_MAP_DATA__";

pub const MAP_PAGE_HTML: &str = r#"<!doctype html>
<html lang="en">

<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Waypoint Tracker</title>
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" crossorigin="" />
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js" crossorigin=""></script>
  <style>
    html, body { height: 100%; margin: 0; }
    #map { position: absolute; inset: 0; }
  </style>
</head>

<body>
  <div id="map"></div>
  <script>
    const view = __WPT_MAP_DATA__;

    const map = L.map("map").setView([view.center.lat, view.center.lng], view.zoom);
    L.tileLayer(view.tileUrl, { attribution: view.attribution }).addTo(map);

    function line(label, text) {
      const row = document.createElement("div");
      const strong = document.createElement("strong");
      strong.textContent = label + " ";
      row.appendChild(strong);
      row.appendChild(document.createTextNode(text));
      return row;
    }

    for (const marker of view.markers) {
      const popup = document.createElement("div");
      popup.appendChild(line("Location:", marker.popup.city + ", " + marker.popup.region));
      popup.appendChild(line("Arrival:", marker.popup.arrivalDate + " @ " + marker.popup.arrivalTime));
      popup.appendChild(line("Departure:", marker.popup.departureDate + " @ " + marker.popup.departureTime));

      L.marker([marker.position.lat, marker.position.lng], { icon: L.icon(marker.icon), title: marker.id })
        .bindPopup(popup)
        .addTo(map);
    }
  </script>
</body>

</html>
"#;

pub struct WPTHtml;

impl WPTHtml {
    /// Fill the page template with the serialized view.
    pub fn render_page(view: &MapView) -> Result<String> {
        let data = serde_json::to_string(view)
            .map_err(|e| WPTError::ParseError(format!("Failed to encode map view: {}", e)))?;

        // Keep the JSON from closing the surrounding <script> block
        let data = data.replace("</", "<\\/");

        Ok(MAP_PAGE_HTML.replace(MAP_DATA_PLACEHOLDER, &data))
    }
}
