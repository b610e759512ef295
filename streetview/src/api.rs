//! Wire format of the unofficial Street View endpoints.
//!
//! The metadata services answer with deeply nested JSON arrays guarded by a
//! `)]}'` anti-hijacking prefix. Fields are addressed by position; this
//! module holds the URL builders, the index map and the parsers that turn
//! those arrays into [`Panorama`] values.

use serde_json::Value;
use snafu::ResultExt;

use crate::error::*;
use crate::model::{
    CaptureDate, CoveragePanorama, HistoricalPanorama, ImageSize, LinkedPanorama, Panorama,
};

/// Zoom level of the web-mercator grid coverage tiles are served on.
pub const COVERAGE_TILE_ZOOM: u32 = 17;

const DEFAULT_TILE_SIZE: u32 = 512;

pub fn photometa_url(pano_id: &str) -> String {
    format!(
        "https://www.google.com/maps/photometa/v1?authuser=0&hl=en&gl=us\
         &pb=!1m4!1smaps_sv.tactile!11m2!2m1!1b1!2m2!1sen!2sus!3m3!1m2!1e2!2s{pano_id}\
         !4m6!1e1!1e2!1e3!1e4!1e8!1e6"
    )
}

pub fn search_url(lat: f64, lon: f64, radius_m: u32) -> String {
    format!(
        "https://www.google.com/maps/photometa/si/v1?authuser=0&hl=en&gl=us\
         &pb=!1m4!1smaps_sv.tactile!11m2!2m1!1b1!2m2!1sen!2sus!3m5!1m3!1d{radius_m}\
         !2d{lon}!3d{lat}!2d50!3m3!1m2!1e2!2e2!4m6!1e1!1e2!1e3!1e4!1e8!1e6"
    )
}

pub fn coverage_tile_url(tile_x: u32, tile_y: u32) -> String {
    format!(
        "https://www.google.com/maps/photometa/ac/v1?authuser=0&hl=en&gl=us\
         &pb=!1m1!1smaps_sv.tactile!6m3!1i{tile_x}!2i{tile_y}!3i{COVERAGE_TILE_ZOOM}!8b1"
    )
}

pub fn tile_url(pano_id: &str, x: u32, y: u32, zoom: u32) -> String {
    format!(
        "https://streetviewpixels-pa.googleapis.com/v1/tile?cb_client=maps_sv.tactile\
         &panoid={pano_id}&x={x}&y={y}&zoom={zoom}"
    )
}

/// Strips the `)]}'` anti-hijacking prefix the metadata endpoints prepend.
pub fn strip_protection_prefix(body: &str) -> &str {
    body.trim_start_matches(")]}'").trim_start()
}

fn walk<'a>(value: &'a Value, path: &[usize]) -> Option<&'a Value> {
    let mut current = value;
    for &index in path {
        current = current.get(index)?;
    }
    Some(current)
}

fn str_at(value: &Value, path: &[usize]) -> Option<String> {
    walk(value, path)?.as_str().map(str::to_string)
}

fn f64_at(value: &Value, path: &[usize]) -> Option<f64> {
    walk(value, path)?.as_f64()
}

fn u32_at(value: &Value, path: &[usize]) -> Option<u32> {
    walk(value, path)?.as_u64().map(|n| n as u32)
}

fn required<T>(field: Option<T>, message: &str) -> Result<T, StreetviewError> {
    field.ok_or_else(|| StreetviewError::Parse {
        message: message.to_string(),
    })
}

/// Parses a photometa response for one panorama. The panorama node sits at
/// `[1][0]` of the response root.
pub fn parse_photometa_response(body: &str, pano_id: &str) -> Result<Panorama, StreetviewError> {
    let root: Value = serde_json::from_str(strip_protection_prefix(body)).context(JsonSnafu)?;

    let node = walk(&root, &[1, 0]).ok_or_else(|| StreetviewError::NotFound {
        id: pano_id.to_string(),
    })?;

    parse_panorama_node(node)
}

/// Parses a nearby-search response. The panorama node sits at `[1]` of the
/// response root; an absent node means there is no coverage near the point.
pub fn parse_search_response(body: &str, lat: f64, lon: f64) -> Result<Panorama, StreetviewError> {
    let root: Value = serde_json::from_str(strip_protection_prefix(body)).context(JsonSnafu)?;

    let node = walk(&root, &[1]).filter(|node| node.is_array());
    match node {
        Some(node) => parse_panorama_node(node),
        None => Err(StreetviewError::NoPanorama { lat, lon }),
    }
}

/// Index map, relative to the panorama node:
///
/// ```text
/// [1][1]            pano id
/// [2][3][0]         image sizes per zoom, each [_, height, width]
/// [2][3][1][0]      tile side length
/// [3][2]            address lines
/// [4][0][0][0][0]   copyright message
/// [5][0][1][0][2]   latitude          [5][0][1][0][3]  longitude
/// [5][0][1][1][0]   elevation
/// [5][0][1][2][0]   heading
/// [5][0][1][4]      country code
/// [5][0][3][0]      linked panoramas, each [0][1] id, [2][0][2] lat, [2][0][3] lon
/// [5][0][8]         historical refs, each [link index, year, month]
/// [6][5][2]         source
/// [6][7]            capture date [year, month]
/// ```
fn parse_panorama_node(node: &Value) -> Result<Panorama, StreetviewError> {
    let id = required(str_at(node, &[1, 1]), "panorama node carries no id")?;
    let lat = required(f64_at(node, &[5, 0, 1, 0, 2]), "panorama has no latitude")?;
    let lon = required(f64_at(node, &[5, 0, 1, 0, 3]), "panorama has no longitude")?;

    let date = walk(node, &[6, 7]).and_then(parse_date);

    let image_sizes = walk(node, &[2, 3, 0])
        .and_then(Value::as_array)
        .map(|levels| {
            levels
                .iter()
                .filter_map(|level| {
                    Some(ImageSize {
                        x: u32_at(level, &[2])?,
                        y: u32_at(level, &[1])?,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let tile_size = u32_at(node, &[2, 3, 1, 0]).unwrap_or(DEFAULT_TILE_SIZE);

    let links: Vec<LinkedPanorama> = walk(node, &[5, 0, 3, 0])
        .and_then(Value::as_array)
        .map(|links| {
            links
                .iter()
                .filter_map(|link| {
                    Some(LinkedPanorama {
                        id: str_at(link, &[0, 1])?,
                        lat: f64_at(link, &[2, 0, 2]),
                        lon: f64_at(link, &[2, 0, 3]),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    // Historical entries reference the link list by index; links not
    // referenced are the navigable neighbors.
    let mut historical = Vec::new();
    let mut historical_indices = Vec::new();
    if let Some(refs) = walk(node, &[5, 0, 8]).and_then(Value::as_array) {
        for history_ref in refs {
            let Some(index) = u32_at(history_ref, &[0]).map(|n| n as usize) else {
                continue;
            };
            let Some(link) = links.get(index) else {
                continue;
            };
            historical.push(HistoricalPanorama {
                id: link.id.clone(),
                date: parse_date(history_ref),
            });
            historical_indices.push(index);
        }
    }

    let neighbors = links
        .iter()
        .enumerate()
        .filter(|(index, _)| !historical_indices.contains(index))
        .map(|(_, link)| link.clone())
        .collect();

    let address = walk(node, &[3, 2])
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(|line| line.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(Panorama {
        id,
        lat,
        lon,
        date,
        heading: f64_at(node, &[5, 0, 1, 2, 0]),
        elevation: f64_at(node, &[5, 0, 1, 1, 0]),
        image_sizes,
        tile_size,
        neighbors,
        historical,
        address,
        country_code: str_at(node, &[5, 0, 1, 4]),
        source: str_at(node, &[6, 5, 2]),
        copyright_message: str_at(node, &[4, 0, 0, 0, 0]),
    })
}

/// A date value is either `[year, month]` directly or a historical ref
/// `[link index, year, month]`.
fn parse_date(value: &Value) -> Option<CaptureDate> {
    let items = value.as_array()?;
    let (year, month) = match items.len() {
        2 => (items[0].as_i64()?, items[1].as_u64()?),
        3 => (items[1].as_i64()?, items[2].as_u64()?),
        _ => return None,
    };
    Some(CaptureDate {
        year: year as i32,
        month: month as u32,
    })
}

/// Parses a coverage tile response. Panoramas are listed at `[1][1]`; each
/// entry holds its id at `[0][0][1]` and position at `[0][2][0][2..=3]`.
pub fn parse_coverage_tile_response(body: &str) -> Result<Vec<CoveragePanorama>, StreetviewError> {
    let root: Value = serde_json::from_str(strip_protection_prefix(body)).context(JsonSnafu)?;

    let Some(entries) = walk(&root, &[1, 1]).and_then(Value::as_array) else {
        // A tile with no coverage is an empty list, not an error.
        return Ok(Vec::new());
    };

    Ok(entries
        .iter()
        .filter_map(|entry| {
            Some(CoveragePanorama {
                id: str_at(entry, &[0, 0, 1])?,
                lat: f64_at(entry, &[0, 2, 0, 2]),
                lon: f64_at(entry, &[0, 2, 0, 3]),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A minimal panorama node following the index map above.
    fn pano_node() -> Value {
        json!([
            null,
            [null, "PANO_MAIN"],
            [null, null, null, [
                [[null, 256, 512], [null, 512, 1024], [null, 1024, 2048]],
                [512, 512]
            ]],
            [null, null, ["Ames St", "Cambridge, MA"]],
            [[[["© 2024 Google"]]]],
            [[
                null,
                [[null, null, 42.3601, -71.0868], [12.5], [178.25], null, "US"],
                null,
                [[
                    [
                        [null, "PANO_NEIGHBOR"],
                        null,
                        [[null, null, 42.3602, -71.0869]]
                    ],
                    [
                        [null, "PANO_OLD"],
                        null,
                        [[null, null, 42.3601, -71.0868]]
                    ]
                ]],
                null, null, null, null,
                [[1, 2016, 9]]
            ]],
            [null, null, null, null, null, [null, null, "launch"], null, [2019, 5]]
        ])
    }

    fn photometa_body() -> String {
        let root = json!([null, [pano_node()]]);
        format!(")]}}'\n{root}")
    }

    #[test]
    fn test_parse_photometa_full() {
        let pano = parse_photometa_response(&photometa_body(), "PANO_MAIN").unwrap();

        assert_eq!(pano.id, "PANO_MAIN");
        assert!((pano.lat - 42.3601).abs() < 1e-9);
        assert!((pano.lon - -71.0868).abs() < 1e-9);
        assert_eq!(pano.date.unwrap().to_string(), "2019-05");
        assert_eq!(pano.heading, Some(178.25));
        assert_eq!(pano.elevation, Some(12.5));
        assert_eq!(pano.country_code.as_deref(), Some("US"));
        assert_eq!(pano.source.as_deref(), Some("launch"));
        assert_eq!(pano.copyright_message.as_deref(), Some("© 2024 Google"));
        assert_eq!(pano.address, vec!["Ames St", "Cambridge, MA"]);

        assert_eq!(pano.tile_size, 512);
        assert_eq!(
            pano.image_sizes,
            vec![
                ImageSize { x: 512, y: 256 },
                ImageSize { x: 1024, y: 512 },
                ImageSize { x: 2048, y: 1024 },
            ]
        );
        assert_eq!(pano.max_zoom(), 2);

        // Link 1 is claimed by the historical ref, link 0 stays a neighbor.
        assert_eq!(pano.neighbors.len(), 1);
        assert_eq!(pano.neighbors[0].id, "PANO_NEIGHBOR");
        assert_eq!(pano.neighbors[0].lat, Some(42.3602));
        assert_eq!(pano.neighbors[0].lon, Some(-71.0869));
        assert_eq!(pano.historical.len(), 1);
        assert_eq!(pano.historical[0].id, "PANO_OLD");
        assert_eq!(pano.historical[0].date.unwrap().to_string(), "2016-09");
    }

    #[test]
    fn test_parse_search_found_and_missing() {
        let found = format!(")]}}'\n{}", json!([null, pano_node()]));
        let pano = parse_search_response(&found, 42.36, -71.09).unwrap();
        assert_eq!(pano.id, "PANO_MAIN");

        let missing = format!(")]}}'\n{}", json!([null]));
        let err = parse_search_response(&missing, 42.36, -71.09).unwrap_err();
        assert!(matches!(err, StreetviewError::NoPanorama { .. }));
    }

    #[test]
    fn test_parse_coverage_tile() {
        let body = format!(
            ")]}}'\n{}",
            json!([null, [null, [
                [[[null, "COV_A"], null, [[null, null, 42.1, -71.2]]]],
                [[[null, "COV_B"], null, [[null, null, 42.2, -71.3]]]]
            ]]])
        );

        let panos = parse_coverage_tile_response(&body).unwrap();
        assert_eq!(panos.len(), 2);
        assert_eq!(panos[0].id, "COV_A");
        assert_eq!(panos[1].lat, Some(42.2));
    }

    #[test]
    fn test_parse_coverage_tile_empty() {
        let body = format!(")]}}'\n{}", json!([null]));
        assert!(parse_coverage_tile_response(&body).unwrap().is_empty());
    }

    #[test]
    fn test_strip_protection_prefix() {
        assert_eq!(strip_protection_prefix(")]}'\n[1]"), "[1]");
        assert_eq!(strip_protection_prefix("[1]"), "[1]");
    }

    #[test]
    fn test_urls_embed_parameters() {
        assert!(photometa_url("abc").contains("!2sabc"));
        assert!(coverage_tile_url(39650, 48478).contains("!1i39650"));
        assert!(coverage_tile_url(39650, 48478).contains("!2i48478"));

        let tile = tile_url("abc", 3, 1, 4);
        assert!(tile.contains("panoid=abc"));
        assert!(tile.contains("x=3"));
        assert!(tile.contains("y=1"));
        assert!(tile.contains("zoom=4"));
    }
}
