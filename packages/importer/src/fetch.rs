//! End-to-end fetch of the published registry.

use crate::archive::{decode_xml, extract_xml};
use crate::error::Result;
use crate::http::{create_client, download_bytes};
use crate::parser::parse_registry;
use crate::types::ParsedRegistry;

/// Download, extract and parse the registry archive.
///
/// Fails without side effects: the caller decides what to do with the
/// parsed result, and nothing is persisted here.
pub fn fetch_registry(url: &str) -> Result<ParsedRegistry> {
    let client = create_client()?;

    tracing::info!(url, "downloading registry archive");
    let archive_bytes = download_bytes(&client, url)?;
    tracing::info!(bytes = archive_bytes.len(), "archive downloaded");

    let xml_bytes = extract_xml(&archive_bytes)?;
    let xml = decode_xml(&xml_bytes)?;

    parse_registry(&xml)
}

/// Parse a registry archive already on hand (e.g. a local file).
pub fn parse_archive(data: &[u8]) -> Result<ParsedRegistry> {
    let xml_bytes = extract_xml(data)?;
    let xml = decode_xml(&xml_bytes)?;
    parse_registry(&xml)
}
