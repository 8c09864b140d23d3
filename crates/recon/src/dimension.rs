//! Product and store dimensions built from master data.
//!
//! A dimension is a list of rows; joins go through [`ProductDimension::index`]
//! and [`StoreDimension::index`], which refuse a key seen twice so a left
//! join can never fan out. Building from master rows keeps the first row seen
//! for each key; building from explicit rows keeps them as given.

use std::collections::{HashMap, HashSet};

use crate::error::ReconError;
use crate::model::{MasterRow, Product, Store};

#[derive(Debug, Clone, Default)]
pub struct ProductDimension {
    rows: Vec<Product>,
}

impl ProductDimension {
    /// First occurrence of each product code wins; rows without a code are ignored.
    pub fn from_master(rows: &[MasterRow]) -> Self {
        let mut seen = HashSet::new();
        let mut products = Vec::new();
        for row in rows {
            let Some(code) = row.product_code.as_ref() else {
                continue;
            };
            if !seen.insert(code.as_str()) {
                continue;
            }
            products.push(Product {
                product_code: code.clone(),
                homologated_reference: row.homologated_reference.clone(),
                category: row.category.clone(),
                subcategory: row.subcategory.clone(),
                line: row.line.clone(),
                subline: row.subline.clone(),
            });
        }
        Self { rows: products }
    }

    /// Rows as given, duplicates included; [`Self::index`] rejects them.
    pub fn from_rows(rows: Vec<Product>) -> Self {
        Self { rows }
    }

    /// Join index by product code.
    pub fn index(&self) -> Result<HashMap<&str, &Product>, ReconError> {
        unique_index("product", &self.rows, |p| p.product_code.as_str())
    }

    pub fn rows(&self) -> &[Product] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreDimension {
    rows: Vec<Store>,
}

impl StoreDimension {
    /// First occurrence of each store name wins; rows without a name are ignored.
    pub fn from_master(rows: &[MasterRow]) -> Self {
        let mut seen = HashSet::new();
        let mut stores = Vec::new();
        for row in rows {
            let Some(name) = row.store.as_ref() else {
                continue;
            };
            if !seen.insert(name.as_str()) {
                continue;
            }
            stores.push(Store {
                store: name.clone(),
                homologated_store: row.homologated_store.clone(),
                store_type: row.store_type.clone(),
                channel: row.channel.clone(),
                chain: row.chain.clone(),
                sub_chain: row.sub_chain.clone(),
                region: row.region.clone(),
                city: row.city.clone(),
                core_store: row.core_store.clone(),
                promoter: row.promoter.clone(),
            });
        }
        Self { rows: stores }
    }

    /// Rows as given, duplicates included; [`Self::index`] rejects them.
    pub fn from_rows(rows: Vec<Store>) -> Self {
        Self { rows }
    }

    /// Join index by store name.
    pub fn index(&self) -> Result<HashMap<&str, &Store>, ReconError> {
        unique_index("store", &self.rows, |s| s.store.as_str())
    }

    pub fn rows(&self) -> &[Store] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn unique_index<'a, T>(
    dimension: &'static str,
    rows: &'a [T],
    key: impl Fn(&'a T) -> &'a str,
) -> Result<HashMap<&'a str, &'a T>, ReconError> {
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        let k = key(row);
        if index.insert(k, row).is_some() {
            return Err(ReconError::DuplicateDimensionKey {
                dimension,
                key: k.to_string(),
            });
        }
    }
    Ok(index)
}
