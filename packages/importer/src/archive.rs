//! ZIP extraction and character decoding for the registry payload.
//!
//! The published archive holds a single XML export next to changelog and
//! licence files; the XML member is located by extension, not by name,
//! because the name carries the release date.

use std::io::{Cursor, Read};

use crate::error::{ImporterError, Result};

/// Extract the first XML member of the archive.
pub fn extract_xml(data: &[u8]) -> Result<Vec<u8>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

    let mut xml_name: Option<String> = None;
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if entry.is_file() && entry.name().to_ascii_lowercase().ends_with(".xml") {
            xml_name = Some(entry.name().to_string());
            break;
        }
    }
    let xml_name = xml_name.ok_or(ImporterError::NoXmlEntry)?;

    let mut entry = archive.by_name(&xml_name)?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes)?;

    tracing::debug!(entry = %xml_name, bytes = bytes.len(), "extracted XML member");
    Ok(bytes)
}

/// Decode the XML payload to a string.
///
/// The feed has shipped both as UTF-8 and as ISO-8859-1 over the years.
/// The declared encoding in the XML prolog decides: a Latin-1 family
/// declaration is decoded via WINDOWS-1252 (its superset), everything else
/// as UTF-8 with the BOM stripped.
pub fn decode_xml(bytes: &[u8]) -> Result<String> {
    if let Some(encoding) = declared_encoding(bytes) {
        if encoding.eq_ignore_ascii_case("iso-8859-1")
            || encoding.eq_ignore_ascii_case("latin1")
            || encoding.eq_ignore_ascii_case("windows-1252")
        {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            return Ok(text.into_owned());
        }
    }

    let stripped = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    String::from_utf8(stripped.to_vec()).map_err(|_| ImporterError::Decode {
        encoding: "UTF-8".to_string(),
    })
}

/// Read the `encoding` pseudo-attribute of the XML declaration, if any.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    // The declaration is ASCII by definition; sniff the first line only.
    let prefix_len = bytes.len().min(256);
    let prefix: String = bytes[..prefix_len]
        .iter()
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect();

    if !prefix.trim_start().starts_with("<?xml") {
        return None;
    }
    let declaration = prefix.split("?>").next()?;
    let after = declaration.split("encoding=").nth(1)?;
    let quote = after.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    after[1..].split(quote).next().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut cursor);
        for (name, content) in entries {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
        cursor.into_inner()
    }

    #[test]
    fn test_extract_xml_picks_first_xml_entry() {
        let data = build_archive(&[
            ("Liesmich.txt", b"changelog"),
            ("Daten_2025.XML", b"<Products/>"),
            ("Other.xml", b"<Other/>"),
        ]);

        let bytes = extract_xml(&data).unwrap();
        assert_eq!(bytes, b"<Products/>");
    }

    #[test]
    fn test_extract_xml_no_xml_entry() {
        let data = build_archive(&[("Liesmich.txt", b"changelog")]);

        let err = extract_xml(&data).unwrap_err();
        assert!(matches!(err, ImporterError::NoXmlEntry));
    }

    #[test]
    fn test_extract_xml_rejects_garbage() {
        let err = extract_xml(b"not a zip archive").unwrap_err();
        assert!(matches!(err, ImporterError::Zip(_)));
    }

    #[test]
    fn test_decode_utf8_with_bom() {
        let mut bytes = b"\xef\xbb\xbf".to_vec();
        bytes.extend_from_slice("<?xml version=\"1.0\"?><a>\u{e4}</a>".as_bytes());

        let text = decode_xml(&bytes).unwrap();
        assert_eq!(text, "<?xml version=\"1.0\"?><a>\u{e4}</a>");
    }

    #[test]
    fn test_decode_latin1_declaration() {
        // "Rüben" with 0xFC, undecodable as UTF-8.
        let mut bytes =
            b"<?xml version='1.0' encoding='ISO-8859-1'?><a name='R".to_vec();
        bytes.push(0xFC);
        bytes.extend_from_slice(b"ben'/>");

        let text = decode_xml(&bytes).unwrap();
        assert!(text.contains("R\u{fc}ben"));
    }

    #[test]
    fn test_decode_invalid_utf8_without_declaration() {
        let bytes = vec![b'<', b'a', b'>', 0xFC, b'<', b'/', b'a', b'>'];

        let err = decode_xml(&bytes).unwrap_err();
        assert!(matches!(err, ImporterError::Decode { .. }));
    }

    #[test]
    fn test_declared_encoding() {
        assert_eq!(
            declared_encoding(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><a/>"),
            Some("UTF-8".to_string())
        );
        assert_eq!(
            declared_encoding(b"<?xml version='1.0' encoding='iso-8859-1'?>"),
            Some("iso-8859-1".to_string())
        );
        assert_eq!(declared_encoding(b"<?xml version=\"1.0\"?><a/>"), None);
        assert_eq!(declared_encoding(b"<a/>"), None);
    }
}
