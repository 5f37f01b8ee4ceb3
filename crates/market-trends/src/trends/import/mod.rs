mod parser;

use super::domain::SaleRecord;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read sales export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid sales CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// A parsed sale together with the market it was recorded in, when the export names one.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedSale {
    pub location: Option<String>,
    pub record: SaleRecord,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaleImport {
    pub sales: Vec<ImportedSale>,
    /// Rows dropped for a missing segment, month or sold price.
    pub skipped_rows: usize,
}

impl SaleImport {
    pub fn records(&self) -> impl Iterator<Item = &SaleRecord> {
        self.sales.iter().map(|sale| &sale.record)
    }

    /// Groups records per location in first-seen order; rows without a location are left out.
    pub fn by_location(&self) -> Vec<(String, Vec<SaleRecord>)> {
        let mut groups: Vec<(String, Vec<SaleRecord>)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for sale in &self.sales {
            let Some(location) = sale.location.as_deref() else {
                continue;
            };
            let slot = *index.entry(location).or_insert_with(|| {
                groups.push((location.to_string(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(sale.record.clone());
        }

        groups
    }
}

/// Reads sale records from a brokerage CSV export.
pub struct SaleRecordImporter;

impl SaleRecordImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<SaleImport, ImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<SaleImport, ImportError> {
        let parsed = parser::parse_rows(reader)?;
        if parsed.skipped > 0 {
            debug!(skipped = parsed.skipped, "unparseable sale rows skipped");
        }

        Ok(SaleImport {
            sales: parsed
                .sales
                .into_iter()
                .map(|(location, record)| ImportedSale { location, record })
                .collect(),
            skipped_rows: parsed.skipped,
        })
    }
}
