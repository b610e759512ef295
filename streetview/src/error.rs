use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StreetviewError {
    #[snafu(display("Request to {url} failed: {source}"))]
    Http { source: reqwest::Error, url: String },

    #[snafu(display("Request to {url} returned status {status}"))]
    Status { url: String, status: u16 },

    #[snafu(display("Malformed response: {message}"))]
    Parse { message: String },

    #[snafu(display("Response is not valid JSON: {source}"))]
    Json { source: serde_json::Error },

    #[snafu(display("No panorama found near ({lat}, {lon})"))]
    NoPanorama { lat: f64, lon: f64 },

    #[snafu(display("No panorama with id `{id}`"))]
    NotFound { id: String },

    #[snafu(display("Failed to decode tile image: {source}"))]
    TileDecode { source: image::ImageError },

    #[snafu(display("Failed to write image to {path}: {source}"))]
    ImageWrite {
        source: image::ImageError,
        path: String,
    },

    #[snafu(display("I/O error on {path}: {source}"))]
    Io {
        source: std::io::Error,
        path: String,
    },
}
