//! Configuration constants for the importer.

/// Download URL of the published registry archive (ZIP containing one XML).
pub const PSM_ARCHIVE_URL: &str = "https://www.blv.admin.ch/dam/blv/de/dokumente/zulassung-pflanzenschutzmittel/pflanzenschutzmittelverzeichnis/daten-pflanzenschutzmittelverzeichnis.zip.download.zip/Daten%20Pflanzenschutzmittelverzeichnis.zip";

/// HTTP timeout in seconds.
///
/// The full export is a multi-megabyte archive served from a slow CDN;
/// 60 seconds matches the observed worst case with headroom.
pub const HTTP_TIMEOUT_SECS: u64 = 60;

/// Archive URL, honoring the `PSM_ARCHIVE_URL` environment override.
pub fn archive_url() -> String {
    std::env::var("PSM_ARCHIVE_URL").unwrap_or_else(|_| PSM_ARCHIVE_URL.to_string())
}
