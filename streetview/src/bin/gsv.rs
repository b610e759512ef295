use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use streetview::{Panorama, StreetViewClient};

/// Pause between requests when downloading in bulk.
const POLITENESS_DELAY: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "gsv")]
#[command(about = "Find, inspect and download Google Street View panoramas")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find the panorama nearest a coordinate
    Find {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,
    },

    /// Show full metadata for a panorama id
    Info {
        id: String,
    },

    /// Download and stitch a panorama
    Download {
        id: String,

        #[arg(short, long, help = "Output image path, defaults to <id>.jpg")]
        output: Option<PathBuf>,

        #[arg(short, long, default_value_t = 4, help = "Zoom level, 0 lowest")]
        zoom: u32,

        #[arg(
            long,
            help = "Also download the oldest historical capture of this spot"
        )]
        oldest: bool,
    },

    /// List every panorama in the coverage tile containing a coordinate
    Coverage {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,

        #[arg(short, long, default_value_t = 10, help = "Rows to print, 0 for all")]
        limit: usize,

        #[arg(short, long, help = "Write the full listing to a JSON file")]
        output: Option<PathBuf>,
    },

    /// Download panoramas along a route of lat,lon points
    Route {
        #[arg(
            required = true,
            value_parser = parse_point,
            allow_negative_numbers = true,
            help = "Waypoints as lat,lon"
        )]
        points: Vec<(f64, f64)>,

        #[arg(short, long, default_value = "route", help = "Output directory")]
        output: PathBuf,

        #[arg(short, long, default_value_t = 3, help = "Zoom level, 0 lowest")]
        zoom: u32,
    },
}

fn parse_point(raw: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected lat,lon but got `{raw}`"))?;
    let lat = lat.trim().parse::<f64>().map_err(|e| e.to_string())?;
    let lon = lon.trim().parse::<f64>().map_err(|e| e.to_string())?;
    Ok((lat, lon))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let client = StreetViewClient::new();

    match args.command {
        Command::Find { lat, lon } => {
            let pano = client.find_panorama(lat, lon).await?;
            println!("Found panorama!");
            println!("  ID:       {}", pano.id);
            println!("  Location: {:.6}, {:.6}", pano.lat, pano.lon);
            if let Some(date) = pano.date {
                println!("  Date:     {date}");
            }
            println!("  Link:     {}", pano.permalink());
        }

        Command::Info { id } => {
            let pano = client.find_panorama_by_id(&id).await?;
            print_metadata(&pano);
        }

        Command::Download {
            id,
            output,
            zoom,
            oldest,
        } => {
            let pano = client.find_panorama_by_id(&id).await?;
            let output = output.unwrap_or_else(|| PathBuf::from(format!("{id}.jpg")));
            client.download_panorama(&pano, &output, zoom).await?;
            println!("Saved to {}", output.display());

            // Historical captures are listed newest first.
            if oldest {
                match pano.historical.last() {
                    Some(entry) => {
                        tokio::time::sleep(POLITENESS_DELAY).await;
                        let old_pano = client.find_panorama_by_id(&entry.id).await?;
                        let old_output = PathBuf::from(format!("{}.jpg", old_pano.id));
                        client.download_panorama(&old_pano, &old_output, zoom).await?;
                        let date = old_pano
                            .date
                            .map_or("unknown date".to_string(), |d| d.to_string());
                        println!("Saved oldest capture ({date}) to {}", old_output.display());
                    }
                    None => println!("No historical imagery available at this location."),
                }
            }
        }

        Command::Coverage {
            lat,
            lon,
            limit,
            output,
        } => {
            let panos = client.get_coverage_tile_by_latlon(lat, lon).await?;
            println!("Found {} panoramas in this tile\n", panos.len());

            let shown = if limit == 0 { panos.len() } else { limit };
            for pano in panos.iter().take(shown) {
                let lat = pano.lat.map_or("N/A".to_string(), |v| format!("{v:.6}"));
                let lon = pano.lon.map_or("N/A".to_string(), |v| format!("{v:.6}"));
                println!("  {}  ({lat}, {lon})", pano.id);
            }
            if panos.len() > shown {
                println!("  ... and {} more", panos.len() - shown);
            }

            if let Some(path) = output {
                let file = std::fs::File::create(&path)
                    .with_context(|| format!("creating {}", path.display()))?;
                serde_json::to_writer_pretty(file, &panos)?;
                println!("\nListing written to {}", path.display());
            }
        }

        Command::Route {
            points,
            output,
            zoom,
        } => {
            std::fs::create_dir_all(&output)
                .with_context(|| format!("creating output directory {}", output.display()))?;

            let mut downloaded = 0usize;
            for (index, (lat, lon)) in points.iter().enumerate() {
                match client.find_panorama(*lat, *lon).await {
                    Ok(pano) => {
                        let path = output.join(format!("{index:02}_{}.jpg", pano.id));
                        client.download_panorama(&pano, &path, zoom).await?;
                        let date = pano
                            .date
                            .map_or("unknown date".to_string(), |d| d.to_string());
                        println!(
                            "[{index}] Downloaded {} ({date}) at {:.5}, {:.5}",
                            pano.id, pano.lat, pano.lon
                        );
                        downloaded += 1;
                    }
                    Err(streetview::StreetviewError::NoPanorama { .. }) => {
                        warn!(lat, lon, "no panorama near waypoint");
                        println!("[{index}] No panorama found near ({lat}, {lon})");
                    }
                    Err(error) => bail!(error),
                }

                if index + 1 < points.len() {
                    tokio::time::sleep(POLITENESS_DELAY).await;
                }
            }

            info!(downloaded, total = points.len(), "route finished");
            println!("\nDownloaded {downloaded} panoramas along the route.");
        }
    }

    Ok(())
}

fn print_metadata(pano: &Panorama) {
    println!("=== Panorama Metadata ===");
    println!("ID:        {}", pano.id);
    println!("Location:  {:.6}, {:.6}", pano.lat, pano.lon);
    if let Some(date) = pano.date {
        println!("Date:      {date}");
    }
    if let Some(source) = &pano.source {
        println!("Source:    {source}");
    }
    if let Some(copyright) = &pano.copyright_message {
        println!("Copyright: {copyright}");
    }
    if let Some(country) = &pano.country_code {
        println!("Country:   {country}");
    }
    if let Some(elevation) = pano.elevation {
        println!("Elevation: {elevation:.1}m");
    }
    if !pano.address.is_empty() {
        println!("Address:   {}", pano.address.join(", "));
    }
    for (zoom, size) in pano.image_sizes.iter().enumerate() {
        println!("Zoom {zoom}:    {} x {}", size.x, size.y);
    }

    println!("\nThis panorama has {} neighbors:", pano.neighbors.len());
    for (index, neighbor) in pano.neighbors.iter().enumerate() {
        let lat = neighbor.lat.map_or("N/A".to_string(), |v| format!("{v:.6}"));
        let lon = neighbor.lon.map_or("N/A".to_string(), |v| format!("{v:.6}"));
        println!("  [{index}] {}  ({lat}, {lon})", neighbor.id);
    }

    if pano.historical.is_empty() {
        println!("\nNo historical imagery available at this location.");
    } else {
        println!("\nFound {} historical panorama(s):", pano.historical.len());
        for entry in &pano.historical {
            let date = entry
                .date
                .map_or("unknown".to_string(), |d| d.to_string());
            println!("  {date}  {}", entry.id);
        }
    }
}
