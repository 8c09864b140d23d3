use std::collections::BTreeMap;

use log::{info, warn};

use crate::config::ZeroVolumePolicy;
use crate::error::ReconError;
use crate::model::{DistributionShare, SalesFact};

/// Each store's share of unit volume within its (chain, line).
///
/// Rows without a chain or a line (unmatched master data) do not form groups.
/// Groups whose units sum to zero are handled per `policy`.
pub fn store_shares(
    facts: &[SalesFact],
    policy: ZeroVolumePolicy,
) -> Result<Vec<DistributionShare>, ReconError> {
    let mut by_line: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    let mut by_store: BTreeMap<(&str, &str, &str), f64> = BTreeMap::new();

    for fact in facts {
        let (Some(chain), Some(line)) = (fact.chain.as_deref(), fact.line.as_deref()) else {
            continue;
        };
        *by_line.entry((chain, line)).or_insert(0.0) += fact.units;
        *by_store.entry((chain, line, fact.store.as_str())).or_insert(0.0) += fact.units;
    }

    for (&(chain, line), &total) in &by_line {
        if total == 0.0 && policy == ZeroVolumePolicy::Fail {
            return Err(ReconError::ZeroVolumeGroup {
                chain: chain.to_string(),
                line: line.to_string(),
            });
        }
    }

    let mut shares = Vec::with_capacity(by_store.len());
    let mut skipped = 0usize;
    for ((chain, line, store), units) in by_store {
        let line_units = by_line[&(chain, line)];
        if line_units == 0.0 {
            skipped += 1;
            continue;
        }
        shares.push(DistributionShare {
            chain: chain.to_string(),
            line: line.to_string(),
            store: store.to_string(),
            units,
            line_units,
            ratio: units / line_units,
        });
    }

    if skipped > 0 {
        let zero_groups: Vec<String> = by_line
            .iter()
            .filter(|(_, total)| **total == 0.0)
            .map(|((chain, line), _)| format!("{chain}/{line}"))
            .collect();
        warn!(
            "skipped {} zero-volume groups ({} store rows): {}",
            zero_groups.len(),
            skipped,
            zero_groups.join(", ")
        );
    }
    info!(
        "distribution: {} store shares across {} chain/line groups",
        shares.len(),
        by_line.len()
    );

    Ok(shares)
}
