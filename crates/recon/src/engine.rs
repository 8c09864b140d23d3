use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};

use crate::calendar::{month_name, week_label, MonthLocale};
use crate::config::PipelineConfig;
use crate::dimension::{ProductDimension, StoreDimension};
use crate::error::ReconError;
use crate::model::{
    MasterRow, Product, ReconSummary, Reconciliation, SalesBatch, SalesFact, SalesRecord, Store,
};

/// Number of unmatched keys named in the warning log.
const UNMATCHED_LOG_SAMPLE: usize = 5;

/// Reconcile every chain's batch against the master data per config.
pub fn run(
    config: &PipelineConfig,
    batches: Vec<SalesBatch>,
    master: &[MasterRow],
) -> Result<Reconciliation, ReconError> {
    let products = ProductDimension::from_master(master);
    let stores = StoreDimension::from_master(master);
    info!(
        "master data: {} rows -> {} products, {} stores",
        master.len(),
        products.len(),
        stores.len()
    );
    reconcile(batches, &products, &stores, &config.record_type, config.locale)
}

/// Concatenate batches in order, counting rows per chain.
pub fn concat_batches(batches: Vec<SalesBatch>) -> (Vec<SalesRecord>, BTreeMap<String, usize>) {
    let total = batches.iter().map(SalesBatch::len).sum();
    let mut records = Vec::with_capacity(total);
    let mut rows_by_chain = BTreeMap::new();
    for batch in batches {
        *rows_by_chain.entry(batch.chain).or_insert(0) += batch.records.len();
        records.extend(batch.records);
    }
    (records, rows_by_chain)
}

/// Left-join sales onto the product and store dimensions, stamp the record
/// type, derive week/month labels and emit facts in canonical order.
pub fn reconcile(
    batches: Vec<SalesBatch>,
    products: &ProductDimension,
    stores: &StoreDimension,
    record_type: &str,
    locale: MonthLocale,
) -> Result<Reconciliation, ReconError> {
    let (records, rows_by_chain) = concat_batches(batches);

    // Unique keys make both left joins one-to-one.
    let product_index = products.index()?;
    let store_index = stores.index()?;

    let mut summary = ReconSummary {
        rows_by_chain,
        products: products.len(),
        stores: stores.len(),
        ..Default::default()
    };
    let mut missing_codes = BTreeSet::new();
    let mut missing_stores = BTreeSet::new();

    let joined: Vec<(SalesRecord, Option<&Product>)> = records
        .into_iter()
        .map(|record| {
            let product = product_index.get(record.product_code.as_str()).copied();
            if product.is_none() {
                summary.unmatched_product_rows += 1;
                missing_codes.insert(record.product_code.clone());
            }
            (record, product)
        })
        .collect();

    let joined: Vec<(SalesRecord, Option<&Product>, Option<&Store>)> = joined
        .into_iter()
        .map(|(record, product)| {
            let store = store_index.get(record.store.as_str()).copied();
            if store.is_none() {
                summary.unmatched_store_rows += 1;
                missing_stores.insert(record.store.clone());
            }
            (record, product, store)
        })
        .collect();

    let facts: Vec<SalesFact> = joined
        .into_iter()
        .map(|(record, product, store)| build_fact(record, product, store, record_type, locale))
        .collect();

    summary.total_rows = facts.len();
    summary.unmatched_product_codes = missing_codes.into_iter().collect();
    summary.unmatched_store_names = missing_stores.into_iter().collect();

    if !summary.unmatched_product_codes.is_empty() {
        warn!(
            "{} rows reference {} product codes missing from master data (e.g. {})",
            summary.unmatched_product_rows,
            summary.unmatched_product_codes.len(),
            sample(&summary.unmatched_product_codes)
        );
    }
    if !summary.unmatched_store_names.is_empty() {
        warn!(
            "{} rows reference {} stores missing from master data (e.g. {})",
            summary.unmatched_store_rows,
            summary.unmatched_store_names.len(),
            sample(&summary.unmatched_store_names)
        );
    }
    info!("reconciled {} sales rows", summary.total_rows);

    Ok(Reconciliation { facts, summary })
}

fn build_fact(
    record: SalesRecord,
    product: Option<&Product>,
    store: Option<&Store>,
    record_type: &str,
    locale: MonthLocale,
) -> SalesFact {
    let product = product.cloned().unwrap_or_default();
    let store = store.cloned().unwrap_or_default();

    SalesFact {
        store_type: store.store_type,
        record_type: record_type.to_string(),
        channel: store.channel,
        chain: store.chain,
        sub_chain: store.sub_chain,
        store: record.store,
        homologated_store: store.homologated_store,
        product_code: record.product_code,
        model: record.model,
        homologated_reference: product.homologated_reference,
        category: product.category,
        subcategory: product.subcategory,
        line: product.line,
        subline: product.subline,
        units: record.units,
        amount: record.amount,
        region: store.region,
        city: store.city,
        week: week_label(record.date),
        date: record.date,
        month: month_name(record.date, locale),
        core_store: store.core_store,
        promoter: store.promoter,
    }
}

fn sample(keys: &[String]) -> String {
    let mut out = keys
        .iter()
        .take(UNMATCHED_LOG_SAMPLE)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if keys.len() > UNMATCHED_LOG_SAMPLE {
        out.push_str(", ...");
    }
    out
}
