// Views for the WayPoint Tracker
use crate::wpt_html::WPTHtml;
use crate::wpt_models::{Location, NormalizedWaypoint, Result, WPTError, WaypointStatus};
use chrono::{DateTime, TimeZone, Timelike, Utc};
use geo::Centroid;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;

// ============================================================================
// Presentation Structures
// ============================================================================

/// Map options chosen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    pub center: Location,
    pub zoom: u8,
    pub fit: bool,
    pub icon_base: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            center: Location { lat: 0.0, lng: 0.0 },
            zoom: 2,
            fit: false,
            icon_base: "/images".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerIcon {
    pub icon_url: String,
    pub icon_retina_url: String,
    pub icon_size: [u32; 2],
    pub icon_anchor: [u32; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopupContent {
    pub city: String,
    pub region: String,
    pub arrival_date: String,
    pub arrival_time: String,
    pub departure_date: String,
    pub departure_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerDescriptor {
    pub id: String,
    pub position: Location,
    pub status: WaypointStatus,
    pub icon: MarkerIcon,
    pub popup: PopupContent,
    pub arrival: Option<i64>,
    pub departure: Option<i64>,
}

/// Everything the map widget needs to draw one view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub center: Location,
    pub zoom: u8,
    pub tile_url: String,
    pub attribution: String,
    pub markers: Vec<MarkerDescriptor>,
}

pub struct WPTViews;

impl WPTViews {
    const TILE_URL: &'static str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
    const ATTRIBUTION: &'static str = "&copy; <a href=\"http://osm.org/copyright\">OpenStreetMap</a> contributors";
    const ICON_SIZE: [u32; 2] = [32, 32];
    const ICON_ANCHOR: [u32; 2] = [16, 32];

    // ========================================================================
    // Map View Construction
    // ========================================================================

    /// Turn resolved waypoints into marker descriptors for the map.
    pub fn map_view<Tz>(waypoints: &[NormalizedWaypoint], tz: &Tz, config: &ViewConfig) -> MapView
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let markers: Vec<MarkerDescriptor> = waypoints
            .iter()
            .map(|wp| Self::marker_for(wp, tz, &config.icon_base))
            .collect();

        let center = if config.fit {
            Self::centroid(&markers).unwrap_or(config.center)
        } else {
            config.center
        };

        MapView {
            center,
            zoom: config.zoom,
            tile_url: Self::TILE_URL.to_string(),
            attribution: Self::ATTRIBUTION.to_string(),
            markers,
        }
    }

    pub fn marker_for<Tz>(wp: &NormalizedWaypoint, tz: &Tz, icon_base: &str) -> MarkerDescriptor
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        MarkerDescriptor {
            id: wp.id.clone(),
            position: wp.location,
            status: wp.status,
            icon: Self::icon_for(wp.status, icon_base),
            popup: PopupContent {
                city: wp.city.clone(),
                region: wp.region.clone(),
                arrival_date: Self::format_date(wp.arrival, tz),
                arrival_time: Self::format_time(wp.arrival, tz),
                departure_date: Self::format_date(wp.departure, tz),
                departure_time: Self::format_time(wp.departure, tz),
            },
            arrival: wp.arrival,
            departure: wp.departure,
        }
    }

    /// Icon for a status, with its `@2x` variant next to it.
    pub fn icon_for(status: WaypointStatus, icon_base: &str) -> MarkerIcon {
        let base = icon_base.trim_end_matches('/');
        MarkerIcon {
            icon_url: format!("{}/marker-{}.png", base, status),
            icon_retina_url: format!("{}/marker-{}@2x.png", base, status),
            icon_size: Self::ICON_SIZE,
            icon_anchor: Self::ICON_ANCHOR,
        }
    }

    pub fn centroid(markers: &[MarkerDescriptor]) -> Option<Location> {
        let points: geo::MultiPoint<f64> = markers
            .iter()
            .map(|m| geo::Point::new(m.position.lng, m.position.lat))
            .collect();

        points.centroid().map(|p| Location { lat: p.y(), lng: p.x() })
    }

    // ========================================================================
    // Display-time Formatting
    // ========================================================================

    fn to_zone<Tz: TimeZone>(millis: Option<i64>, tz: &Tz) -> Option<DateTime<Tz>> {
        millis
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(|dt| dt.with_timezone(tz))
    }

    /// `Tue Dec 24 2024`
    pub fn format_date<Tz>(millis: Option<i64>, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        match Self::to_zone(millis, tz) {
            Some(dt) => dt.format("%a %b %d %Y").to_string(),
            None => "Invalid Date".to_string(),
        }
    }

    /// `8:05`
    pub fn format_time<Tz: TimeZone>(millis: Option<i64>, tz: &Tz) -> String {
        match Self::to_zone(millis, tz) {
            Some(dt) => format!("{}:{:02}", dt.hour(), dt.minute()),
            None => "??:??".to_string(),
        }
    }

    // ========================================================================
    // Renderers
    // ========================================================================

    pub fn render_text(view: &MapView) -> String {
        let mut out = String::new();

        out.push_str(&format!("{}\n", "═".repeat(70)));
        out.push_str(&format!(
            "🗺️  MAP VIEW - center ({:.4}, {:.4}) zoom {}\n",
            view.center.lat, view.center.lng, view.zoom
        ));
        out.push_str(&format!("{}\n", "═".repeat(70)));

        if view.markers.is_empty() {
            out.push_str("\n  ℹ️  No waypoints to display\n");
            return out;
        }

        let mut counts: HashMap<WaypointStatus, usize> = HashMap::new();
        for marker in &view.markers {
            *counts.entry(marker.status).or_insert(0) += 1;
        }
        out.push_str(&format!(
            "\n  📊 {} waypoints | ✓ {} visited | 📍 {} active | ⏳ {} upcoming\n",
            view.markers.len(),
            counts.get(&WaypointStatus::Visited).unwrap_or(&0),
            counts.get(&WaypointStatus::Active).unwrap_or(&0),
            counts.get(&WaypointStatus::Upcoming).unwrap_or(&0),
        ));
        out.push_str(&format!("{}\n", "─".repeat(70)));

        for marker in &view.markers {
            let popup = &marker.popup;
            out.push_str(&format!(
                "  {} {}, {} ({:.4}, {:.4})\n",
                Self::status_badge(marker.status),
                popup.city,
                popup.region,
                marker.position.lat,
                marker.position.lng
            ));
            out.push_str(&format!(
                "     Arrival: {} @ {} | Departure: {} @ {}\n",
                popup.arrival_date, popup.arrival_time, popup.departure_date, popup.departure_time
            ));
        }

        out
    }

    pub fn render_geojson(view: &MapView) -> Result<String> {
        let features: Vec<Feature> = view
            .markers
            .iter()
            .map(|marker| {
                let point = geo_types::Point::new(marker.position.lng, marker.position.lat);

                let mut properties = JsonObject::new();
                properties.insert("id".into(), marker.id.clone().into());
                properties.insert("status".into(), marker.status.as_str().into());
                properties.insert("city".into(), marker.popup.city.clone().into());
                properties.insert("region".into(), marker.popup.region.clone().into());
                properties.insert("iconUrl".into(), marker.icon.icon_url.clone().into());
                properties.insert("iconRetinaUrl".into(), marker.icon.icon_retina_url.clone().into());
                properties.insert("arrival".into(), marker.arrival.into());
                properties.insert("departure".into(), marker.departure.into());
                properties.insert(
                    "arrivalText".into(),
                    format!("{} @ {}", marker.popup.arrival_date, marker.popup.arrival_time).into(),
                );
                properties.insert(
                    "departureText".into(),
                    format!("{} @ {}", marker.popup.departure_date, marker.popup.departure_time).into(),
                );

                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(geojson::Value::from(&point))),
                    id: Some(geojson::feature::Id::String(marker.id.clone())),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let collection = FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        };

        serde_json::to_string_pretty(&collection)
            .map_err(|e| WPTError::ParseError(format!("Failed to encode GeoJSON: {}", e)))
    }

    pub fn render_html(view: &MapView) -> Result<String> {
        WPTHtml::render_page(view)
    }

    // ========================================================================
    // Console Messages
    // ========================================================================

    pub fn show_banner(source: &str) {
        println!("\n{}", "═".repeat(70));
        println!("  🎅 WAYPOINT TRACKER");
        println!("  🌐 Source: {}", source);
        println!("{}", "═".repeat(70));
    }

    pub fn feed_error(message: &str) {
        eprintln!("\n⚠️  Could not load waypoint feed: {}", message);
        eprintln!("   Showing an empty map instead.");
    }

    pub fn output_written(path: &std::path::Path, markers: usize) {
        println!("✓ Wrote {} markers to {:?}", markers, path);
    }

    fn status_badge(status: WaypointStatus) -> &'static str {
        match status {
            WaypointStatus::Visited => "✓",
            WaypointStatus::Active => "📍",
            WaypointStatus::Upcoming => "⏳",
        }
    }
}
