//! Parse the registry XML export into a [`ParsedRegistry`].
//!
//! The export carries four metadata blocks (`Culture`, `Pest`, `Obligation`,
//! `Measure`) followed by the product list. `Measure` entries are only a
//! lookup from dosage-unit identifier to display text and are never
//! persisted; the other three become registry tables downstream.

use std::collections::HashMap;

use roxmltree::{Document, Node};

use crate::error::Result;
use crate::types::{MetaEntry, ParsedIndication, ParsedProduct, ParsedRegistry};
use crate::xml::{attr, find_child, find_children, local_name};

/// Parse the decoded registry XML.
pub fn parse_registry(xml: &str) -> Result<ParsedRegistry> {
    let doc = Document::parse(xml)?;

    let crops = parse_metadata(&doc, "Culture");
    let pests = parse_metadata(&doc, "Pest");
    let conditions = parse_metadata(&doc, "Obligation");

    // Dosage units resolve transiently during fact construction.
    let units: HashMap<String, String> = parse_metadata(&doc, "Measure")
        .into_iter()
        .map(|entry| (entry.blv_id, entry.name))
        .collect();

    let mut products = Vec::new();
    let mut skipped_products = 0usize;
    for node in doc.descendants().filter(|n| {
        n.is_element() && matches!(local_name(*n), "Product" | "Parallelimport")
    }) {
        match parse_product(node, &units) {
            Some(product) => products.push(product),
            None => skipped_products += 1,
        }
    }

    tracing::info!(
        crops = crops.len(),
        pests = pests.len(),
        conditions = conditions.len(),
        products = products.len(),
        skipped_products,
        "registry XML parsed"
    );

    Ok(ParsedRegistry {
        crops,
        pests,
        conditions,
        products,
        skipped_products,
    })
}

/// Extract one metadata block by category name.
///
/// Every `Detail` child with a primary key and a German description yields
/// an entry; anything else is ignored.
fn parse_metadata(doc: &Document<'_>, category: &str) -> Vec<MetaEntry> {
    let Some(block) = doc.descendants().find(|n| {
        n.is_element() && local_name(*n) == "MetaData" && attr(*n, "name") == Some(category)
    }) else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    for detail in find_children(block, "Detail") {
        let Some(key) = attr(detail, "primaryKey") else {
            continue;
        };
        let Some(description) = find_children(detail, "Description")
            .find(|d| attr(*d, "language") == Some("de"))
        else {
            continue;
        };
        let Some(value) = attr(description, "value") else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }
        entries.push(MetaEntry {
            blv_id: key.to_string(),
            name: value.to_string(),
        });
    }
    entries
}

/// Parse a `Product` or `Parallelimport` node.
///
/// Parallel imports carry their registration number in `id`, ordinary
/// products in `wNbr`. Nodes missing a name or number are dropped.
fn parse_product(node: Node<'_, '_>, units: &HashMap<String, String>) -> Option<ParsedProduct> {
    let name = attr(node, "name").filter(|v| !v.is_empty())?;
    let registration_no = if local_name(node) == "Parallelimport" {
        attr(node, "id")
    } else {
        attr(node, "wNbr")
    }
    .filter(|v| !v.is_empty())?;

    let mut indications = Vec::new();
    if let Some(info) = find_child(node, "ProductInformation") {
        for indication in find_children(info, "Indication") {
            indications.extend(parse_indication(indication, units));
        }
    }

    Some(ParsedProduct {
        registration_no: registration_no.to_string(),
        name: name.to_string(),
        indications,
    })
}

/// Parse one `Indication` element into one record per referenced pest.
fn parse_indication(
    node: Node<'_, '_>,
    units: &HashMap<String, String>,
) -> Vec<ParsedIndication> {
    let Some(culture) = find_child(node, "Culture") else {
        return Vec::new();
    };
    let Some(crop_id) = attr(culture, "primaryKey").filter(|v| !v.is_empty()) else {
        return Vec::new();
    };

    let dosage = attr(node, "expenditureForm").unwrap_or_default();
    let dosage_from = attr(node, "dosageFrom").unwrap_or_default();
    let dosage_to = attr(node, "dosageTo").unwrap_or_default();
    let waiting_period = attr(node, "waitingPeriod").unwrap_or_default();
    let max_applications = attr(node, "applicationsCount").unwrap_or_default();
    let dosage_unit = attr(node, "measure")
        .and_then(|id| units.get(id))
        .cloned()
        .unwrap_or_default();

    let condition_ids: Vec<String> = find_children(node, "Obligation")
        .filter_map(|o| attr(o, "primaryKey"))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();

    find_children(node, "Pest")
        .filter_map(|p| attr(p, "primaryKey"))
        .filter(|v| !v.is_empty())
        .map(|pest_id| ParsedIndication {
            crop_id: crop_id.to_string(),
            pest_id: pest_id.to_string(),
            dosage: dosage.to_string(),
            dosage_from: dosage_from.to_string(),
            dosage_to: dosage_to.to_string(),
            dosage_unit: dosage_unit.clone(),
            waiting_period: waiting_period.to_string(),
            max_applications: max_applications.to_string(),
            condition_ids: condition_ids.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<PublicationData>
  <MetaData name="Culture">
    <Detail primaryKey="C1">
      <Description language="de" value="Weizen"/>
      <Description language="fr" value="Ble"/>
    </Detail>
    <Detail primaryKey="C2">
      <Description language="de" value="Apfel"/>
    </Detail>
    <Detail primaryKey="C3">
      <Description language="fr" value="Seulement francais"/>
    </Detail>
  </MetaData>
  <MetaData name="Pest">
    <Detail primaryKey="P1">
      <Description language="de" value="Mehltau"/>
    </Detail>
  </MetaData>
  <MetaData name="Obligation">
    <Detail primaryKey="O1">
      <Description language="de" value="SPe 3: Gewaesserschutz 20 m"/>
    </Detail>
  </MetaData>
  <MetaData name="Measure">
    <Detail primaryKey="M1">
      <Description language="de" value="l/ha"/>
    </Detail>
  </MetaData>
  <Product name="TestProdukt" wNbr="1001">
    <ProductInformation>
      <Indication expenditureForm="2" waitingPeriod="7" measure="M1"
                  dosageFrom="1.5" dosageTo="2.0" applicationsCount="3">
        <Culture primaryKey="C1"/>
        <Pest primaryKey="P1"/>
        <Obligation primaryKey="O1"/>
      </Indication>
    </ProductInformation>
  </Product>
  <Parallelimport name="ImportProdukt" id="I-2002"/>
  <Product wNbr="3003"/>
</PublicationData>"#;

    #[test]
    fn test_parse_metadata_german_only() {
        let registry = parse_registry(SAMPLE).unwrap();

        assert_eq!(
            registry.crops,
            vec![
                MetaEntry {
                    blv_id: "C1".to_string(),
                    name: "Weizen".to_string()
                },
                MetaEntry {
                    blv_id: "C2".to_string(),
                    name: "Apfel".to_string()
                },
            ]
        );
        assert_eq!(registry.pests.len(), 1);
        assert_eq!(registry.conditions[0].name, "SPe 3: Gewaesserschutz 20 m");
    }

    #[test]
    fn test_parse_product_and_parallelimport_numbers() {
        let registry = parse_registry(SAMPLE).unwrap();

        let numbers: Vec<&str> = registry
            .products
            .iter()
            .map(|p| p.registration_no.as_str())
            .collect();
        assert_eq!(numbers, vec!["1001", "I-2002"]);
        // The nameless product node is dropped, not an error.
        assert_eq!(registry.skipped_products, 1);
    }

    #[test]
    fn test_parse_indication_fields() {
        let registry = parse_registry(SAMPLE).unwrap();

        let indication = &registry.products[0].indications[0];
        assert_eq!(indication.crop_id, "C1");
        assert_eq!(indication.pest_id, "P1");
        assert_eq!(indication.dosage, "2");
        assert_eq!(indication.dosage_from, "1.5");
        assert_eq!(indication.dosage_to, "2.0");
        assert_eq!(indication.dosage_unit, "l/ha");
        assert_eq!(indication.waiting_period, "7");
        assert_eq!(indication.max_applications, "3");
        assert_eq!(indication.condition_ids, vec!["O1".to_string()]);
    }

    #[test]
    fn test_indication_flattens_per_pest() {
        let xml = r#"<Products>
          <Product name="P" wNbr="1">
            <ProductInformation>
              <Indication expenditureForm="1">
                <Culture primaryKey="C1"/>
                <Pest primaryKey="P1"/>
                <Pest primaryKey="P2"/>
              </Indication>
            </ProductInformation>
          </Product>
        </Products>"#;

        let registry = parse_registry(xml).unwrap();
        let pests: Vec<&str> = registry.products[0]
            .indications
            .iter()
            .map(|i| i.pest_id.as_str())
            .collect();
        assert_eq!(pests, vec!["P1", "P2"]);
    }

    #[test]
    fn test_indication_without_culture_dropped() {
        let xml = r#"<Products>
          <Product name="P" wNbr="1">
            <ProductInformation>
              <Indication expenditureForm="1">
                <Pest primaryKey="P1"/>
              </Indication>
            </ProductInformation>
          </Product>
        </Products>"#;

        let registry = parse_registry(xml).unwrap();
        assert!(registry.products[0].indications.is_empty());
    }

    #[test]
    fn test_unresolved_measure_yields_empty_unit() {
        let xml = r#"<Products>
          <Product name="P" wNbr="1">
            <ProductInformation>
              <Indication measure="UNKNOWN">
                <Culture primaryKey="C1"/>
                <Pest primaryKey="P1"/>
              </Indication>
            </ProductInformation>
          </Product>
        </Products>"#;

        let registry = parse_registry(xml).unwrap();
        assert_eq!(registry.products[0].indications[0].dosage_unit, "");
    }

    #[test]
    fn test_namespaced_feed_variant() {
        let xml = r#"<ns:Products xmlns:ns="urn:blv">
          <ns:MetaData name="Culture">
            <ns:Detail primaryKey="C1">
              <ns:Description language="de" value="Weizen"/>
            </ns:Detail>
          </ns:MetaData>
          <ns:Product name="P" wNbr="1">
            <ns:ProductInformation>
              <ns:Indication expenditureForm="5">
                <ns:Culture primaryKey="C1"/>
                <ns:Pest primaryKey="P1"/>
              </ns:Indication>
            </ns:ProductInformation>
          </ns:Product>
        </ns:Products>"#;

        let registry = parse_registry(xml).unwrap();
        assert_eq!(registry.crops.len(), 1);
        assert_eq!(registry.products.len(), 1);
        assert_eq!(registry.products[0].indications[0].dosage, "5");
    }

    #[test]
    fn test_malformed_xml() {
        assert!(parse_registry("<Products><broken").is_err());
    }

    #[test]
    fn test_indication_count() {
        let registry = parse_registry(SAMPLE).unwrap();
        assert_eq!(registry.indication_count(), 1);
    }
}
