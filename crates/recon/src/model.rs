use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One sales transaction in the canonical six-field shape every source
/// normalizer emits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesRecord {
    pub store: String,
    pub product_code: String,
    pub model: String,
    /// Negative for returns and adjustments.
    pub units: f64,
    pub amount: f64,
    pub date: NaiveDate,
}

/// Output of one source normalizer.
///
/// `index[i]` is the source row index of `records[i]`. Directory sources are
/// re-indexed contiguously; multi-sheet sources keep each sheet's own indices.
#[derive(Debug, Clone, Default)]
pub struct SalesBatch {
    pub chain: String,
    pub index: Vec<usize>,
    pub records: Vec<SalesRecord>,
}

impl SalesBatch {
    pub fn new(chain: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            ..Default::default()
        }
    }

    /// Batch indexed `0..n`.
    pub fn from_records(chain: impl Into<String>, records: Vec<SalesRecord>) -> Self {
        Self {
            chain: chain.into(),
            index: (0..records.len()).collect(),
            records,
        }
    }

    pub fn push(&mut self, index: usize, record: SalesRecord) {
        self.index.push(index);
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append `other`, keeping its indices as they are.
    pub fn extend(&mut self, other: SalesBatch) {
        self.index.extend(other.index);
        self.records.extend(other.records);
    }

    /// Renumber rows `0..n`.
    pub fn reindex(&mut self) {
        self.index = (0..self.records.len()).collect();
    }
}

/// Typed projection of the master (inventory) table. Only the dimension
/// columns are carried; period and transactional columns are never loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MasterRow {
    pub store: Option<String>,
    pub homologated_store: Option<String>,
    pub store_type: Option<String>,
    pub channel: Option<String>,
    pub chain: Option<String>,
    pub sub_chain: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub core_store: Option<String>,
    pub promoter: Option<String>,
    pub product_code: Option<String>,
    pub homologated_reference: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub line: Option<String>,
    pub subline: Option<String>,
}

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Product {
    pub product_code: String,
    pub homologated_reference: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub line: Option<String>,
    pub subline: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Store {
    pub store: String,
    pub homologated_store: Option<String>,
    pub store_type: Option<String>,
    pub channel: Option<String>,
    pub chain: Option<String>,
    pub sub_chain: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub core_store: Option<String>,
    pub promoter: Option<String>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Column names of the persisted sales table, in storage order.
pub const FACT_COLUMNS: [&str; 23] = [
    "TYPE",
    "TYPE2",
    "CHANNEL",
    "CHAIN",
    "SUB-CHAIN",
    "STORE",
    "HOMOLOGATED-STORE",
    "PRODUCT-CODE",
    "MODEL",
    "HOMOLOGATED-REFERENCE",
    "CATEGORY",
    "SUBCATEGORY",
    "LINE",
    "SUBLINE",
    "UNITS",
    "AMOUNT",
    "REGION",
    "CITY",
    "WEEK-NUMBER",
    "DATE",
    "MONTH",
    "CORE-STORE-FLAG",
    "PROMOTER-FLAG",
];

/// Enriched sales fact. Field order matches [`FACT_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesFact {
    pub store_type: Option<String>,
    pub record_type: String,
    pub channel: Option<String>,
    pub chain: Option<String>,
    pub sub_chain: Option<String>,
    pub store: String,
    pub homologated_store: Option<String>,
    pub product_code: String,
    pub model: String,
    pub homologated_reference: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub line: Option<String>,
    pub subline: Option<String>,
    pub units: f64,
    pub amount: f64,
    pub region: Option<String>,
    pub city: Option<String>,
    pub week: String,
    pub date: NaiveDate,
    pub month: String,
    pub core_store: Option<String>,
    pub promoter: Option<String>,
}

/// Per-run counters reported after reconciliation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconSummary {
    pub total_rows: usize,
    pub rows_by_chain: BTreeMap<String, usize>,
    pub products: usize,
    pub stores: usize,
    pub unmatched_product_rows: usize,
    pub unmatched_store_rows: usize,
    pub unmatched_product_codes: Vec<String>,
    pub unmatched_store_names: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub facts: Vec<SalesFact>,
    pub summary: ReconSummary,
}

/// One store's share of its (chain, line) unit volume.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionShare {
    pub chain: String,
    pub line: String,
    pub store: String,
    pub units: f64,
    pub line_units: f64,
    pub ratio: f64,
}
