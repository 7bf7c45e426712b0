//! Parsed registry data as extracted from the XML export.

/// One entry of a metadata block (crop, pest, condition or dosage unit),
/// keyed by its external BLV identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEntry {
    pub blv_id: String,
    pub name: String,
}

/// One approval fact: a product may be used on `crop_id` against `pest_id`
/// under the attached dosage and waiting-period terms.
///
/// Indications are flattened at parse time: an `Indication` element with
/// several `Pest` children yields one record per pest, sharing the dosage
/// fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIndication {
    pub crop_id: String,
    pub pest_id: String,
    pub dosage: String,
    pub dosage_from: String,
    pub dosage_to: String,
    pub dosage_unit: String,
    pub waiting_period: String,
    pub max_applications: String,
    pub condition_ids: Vec<String>,
}

/// A product (or parallel import) with its registration number and the
/// indications listed under its first `ProductInformation` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedProduct {
    pub registration_no: String,
    pub name: String,
    pub indications: Vec<ParsedIndication>,
}

/// The full parsed registry feed.
#[derive(Debug, Clone, Default)]
pub struct ParsedRegistry {
    pub crops: Vec<MetaEntry>,
    pub pests: Vec<MetaEntry>,
    pub conditions: Vec<MetaEntry>,
    pub products: Vec<ParsedProduct>,
    /// Product nodes dropped for missing a name or registration number.
    pub skipped_products: usize,
}

impl ParsedRegistry {
    /// Total number of flattened indication records across all products.
    pub fn indication_count(&self) -> usize {
        self.products.iter().map(|p| p.indications.len()).sum()
    }
}
