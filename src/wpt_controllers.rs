// Controllers for the WayPoint Tracker
use crate::wpt_models::{Feed, Location, Result, WPTError, WPTModels};
use crate::wpt_resolver::WPTResolver;
use crate::wpt_views::{MapView, ViewConfig, WPTViews};
use chrono::{DateTime, Local, TimeZone, Utc};
use chrono_tz::Tz;
use clap::{Parser, ValueEnum};
use std::fmt::Display;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Geojson,
    Html,
}

/// Fetch a waypoint feed and render it as map markers.
#[derive(Debug, Parser)]
#[command(name = "wpt", version, about)]
pub struct Cli {
    /// Feed URL
    #[arg(long, env = "WPT_FEED_URL", default_value = WPTModels::DEFAULT_FEED_URL)]
    pub url: String,

    /// Read the feed from a local JSON file instead of the URL
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Reference instant (RFC 3339), defaults to now
    #[arg(long)]
    pub now: Option<String>,

    /// IANA time zone for normalization and display, defaults to the local zone
    #[arg(long, env = "WPT_TIMEZONE")]
    pub tz: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub lat: f64,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub lng: f64,

    #[arg(long, default_value_t = 2)]
    pub zoom: u8,

    /// Center the map on the markers
    #[arg(long)]
    pub fit: bool,

    /// Base path or URL of the marker icons
    #[arg(long, env = "WPT_ICON_BASE", default_value = "/images")]
    pub icon_base: String,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = WPTModels::REQUEST_TIMEOUT_SECS)]
    pub timeout: u64,

    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }

    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            center: Location { lat: self.lat, lng: self.lng },
            zoom: self.zoom,
            fit: self.fit,
            icon_base: self.icon_base.clone(),
        }
    }
}

pub struct WPTControllers;

impl WPTControllers {
    /// Fetch → resolve → present → output.
    pub fn run(cli: &Cli) -> Result<()> {
        let now = Self::reference_instant(cli.now.as_deref())?;
        let zone = Self::parse_zone(cli.tz.as_deref())?;
        let config = cli.view_config();

        let source = match &cli.file {
            Some(path) => path.display().to_string(),
            None => cli.url.clone(),
        };
        if cli.format == OutputFormat::Text && cli.output.is_none() {
            WPTViews::show_banner(&source);
        }

        let feed = Self::load_feed(cli);

        let view = match zone {
            Some(tz) => Self::build_map_view(feed.as_ref(), &now.with_timezone(&tz), &config),
            None => Self::build_map_view(feed.as_ref(), &now.with_timezone(&Local), &config),
        };
        log::info!("Rendering {} markers", view.markers.len());

        let rendered = match cli.format {
            OutputFormat::Text => WPTViews::render_text(&view),
            OutputFormat::Geojson => WPTViews::render_geojson(&view)?,
            OutputFormat::Html => WPTViews::render_html(&view)?,
        };

        match &cli.output {
            Some(path) => {
                fs::write(path, rendered)
                    .map_err(|e| WPTError::FileError(format!("Failed to write {:?}: {}", path, e)))?;
                WPTViews::output_written(path, view.markers.len());
            }
            None => println!("{}", rendered),
        }

        Ok(())
    }

    /// A failed fetch is reported and treated as "no data".
    fn load_feed(cli: &Cli) -> Option<Feed> {
        let result = match &cli.file {
            Some(path) => WPTModels::load_feed_file(path),
            None => WPTModels::fetch_feed(&cli.url, cli.timeout),
        };

        match result {
            Ok(feed) => Some(feed),
            Err(e) => {
                log::debug!("Feed load failed: {:?}", e);
                WPTViews::feed_error(&e.to_string());
                None
            }
        }
    }

    /// Resolve the feed against `now` and build the map view.
    ///
    /// Without destinations the resolver is skipped and the view has no markers.
    pub fn build_map_view<Z>(feed: Option<&Feed>, now: &DateTime<Z>, config: &ViewConfig) -> MapView
    where
        Z: TimeZone,
        Z::Offset: Display,
    {
        let normalized = match feed.and_then(|f| f.destinations.as_deref()) {
            Some(destinations) => WPTResolver::resolve(destinations, now),
            None => {
                log::debug!("No destinations, skipping resolution");
                Vec::new()
            }
        };

        WPTViews::map_view(&normalized, &now.timezone(), config)
    }

    pub fn reference_instant(now: Option<&str>) -> Result<DateTime<Utc>> {
        match now {
            Some(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| WPTError::ConfigError(format!("Invalid --now '{}': {}", text, e))),
            None => Ok(Utc::now()),
        }
    }

    pub fn parse_zone(tz: Option<&str>) -> Result<Option<Tz>> {
        tz.map(|name| {
            name.parse::<Tz>()
                .map_err(|e| WPTError::ConfigError(format!("Unknown time zone '{}': {}", name, e)))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wpt_models::WaypointStatus;
    use rstest::rstest;
    use std::io::Write;

    const FEED: &str = r#"{"destinations": [
        {"id": "a", "arrival": "2019-12-24T08:00:00Z", "departure": "2019-12-24T08:15:00Z",
         "city": "Alpha", "region": "One", "location": {"lat": 1.0, "lng": 1.0}},
        {"id": "b", "arrival": "2019-12-25T00:00:00Z", "departure": "2019-12-25T00:30:00Z",
         "city": "Beta", "region": "Two", "location": {"lat": 2.0, "lng": 2.0}},
        {"id": "c", "arrival": "2019-12-25T23:00:00Z", "departure": "2019-12-25T23:10:00Z",
         "city": "Gamma", "region": "Three", "location": {"lat": 3.0, "lng": 3.0}}
    ]}"#;

    fn now() -> DateTime<Utc> {
        WPTControllers::reference_instant(Some("2024-12-25T00:10:00Z")).unwrap()
    }

    #[test]
    fn test_build_map_view() {
        let feed = WPTModels::parse_feed(FEED).unwrap();
        let view = WPTControllers::build_map_view(Some(&feed), &now(), &ViewConfig::default());

        let statuses: Vec<WaypointStatus> = view.markers.iter().map(|m| m.status).collect();
        assert_eq!(
            vec![WaypointStatus::Visited, WaypointStatus::Active, WaypointStatus::Upcoming],
            statuses
        );
        assert_eq!("Wed Dec 25 2024", view.markers[2].popup.arrival_date);
        assert_eq!("23:00", view.markers[2].popup.arrival_time);
    }

    #[test]
    fn test_build_map_view_without_feed() {
        let view = WPTControllers::build_map_view(None, &now(), &ViewConfig::default());
        assert!(view.markers.is_empty());
    }

    #[rstest]
    #[case("null")]
    #[case(r#"{"destinations": []}"#)]
    fn test_build_map_view_no_markers(#[case] body: &str) {
        let feed = WPTModels::parse_feed(body).unwrap();
        let view = WPTControllers::build_map_view(Some(&feed), &now(), &ViewConfig::default());
        assert!(view.markers.is_empty());
    }

    #[test]
    fn test_build_map_view_in_zone() {
        let feed = WPTModels::parse_feed(FEED).unwrap();
        let tz = WPTControllers::parse_zone(Some("Asia/Tokyo")).unwrap().unwrap();
        let view = WPTControllers::build_map_view(Some(&feed), &now().with_timezone(&tz), &ViewConfig::default());

        // 08:00 UTC is 17:00 in Tokyo
        assert_eq!("17:00", view.markers[0].popup.arrival_time);
        assert_eq!(WaypointStatus::Visited, view.markers[0].status);
    }

    #[rstest]
    #[case(Some("2024-12-25T00:10:00+01:00"), true)]
    #[case(Some("yesterday"), false)]
    #[case(None, true)]
    fn test_reference_instant(#[case] input: Option<&str>, #[case] ok: bool) {
        assert_eq!(ok, WPTControllers::reference_instant(input).is_ok());
    }

    #[test]
    fn test_parse_zone() {
        assert_eq!(None, WPTControllers::parse_zone(None).unwrap());
        assert_eq!(Some(chrono_tz::Europe::Paris), WPTControllers::parse_zone(Some("Europe/Paris")).unwrap());
        assert!(matches!(WPTControllers::parse_zone(Some("Mars/Olympus")), Err(WPTError::ConfigError(_))));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["wpt"]).unwrap();

        assert_eq!(OutputFormat::Text, cli.format);
        assert_eq!(2, cli.zoom);
        assert_eq!("info", cli.log_level());
        assert_eq!(Location { lat: 0.0, lng: 0.0 }, cli.view_config().center);
    }

    #[test]
    fn test_cli_options() {
        let cli = Cli::try_parse_from([
            "wpt", "--format", "geojson", "--lat", "-33.9", "--lng", "151.2", "--zoom", "5", "--fit", "-v",
        ])
        .unwrap();

        assert_eq!(OutputFormat::Geojson, cli.format);
        assert_eq!("debug", cli.log_level());
        let config = cli.view_config();
        assert_eq!(Location { lat: -33.9, lng: 151.2 }, config.center);
        assert_eq!(5, config.zoom);
        assert!(config.fit);
    }

    #[test]
    fn test_run_from_file_to_file() {
        let mut input = tempfile::NamedTempFile::new().unwrap();
        input.write_all(FEED.as_bytes()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("map.geojson");

        let cli = Cli::try_parse_from([
            "wpt",
            "--file",
            input.path().to_str().unwrap(),
            "--now",
            "2024-12-25T00:10:00Z",
            "--tz",
            "UTC",
            "--format",
            "geojson",
            "--output",
            out.to_str().unwrap(),
        ])
        .unwrap();
        WPTControllers::run(&cli).unwrap();

        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(3, value["features"].as_array().unwrap().len());
        assert_eq!("active", value["features"][1]["properties"]["status"]);
    }

    #[test]
    fn test_run_with_missing_file_renders_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("map.html");

        let cli = Cli::try_parse_from([
            "wpt",
            "--file",
            dir.path().join("absent.json").to_str().unwrap(),
            "--format",
            "html",
            "--output",
            out.to_str().unwrap(),
        ])
        .unwrap();
        WPTControllers::run(&cli).unwrap();

        let html = fs::read_to_string(&out).unwrap();
        assert!(html.contains(r#""markers":[]"#));
    }
}
