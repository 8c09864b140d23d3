use chrono::NaiveDate;

use sellout_recon::config::{PipelineConfig, ZeroVolumePolicy};
use sellout_recon::distribution::store_shares;
use sellout_recon::model::{MasterRow, SalesBatch, SalesRecord};
use sellout_recon::{run, ReconError};

const CONFIG: &str = r#"
name = "sell-out"
sales_folder = "Ventas"

[database]
path = "PruebaDB.sqlite"

[master]
file = "BASE_INVENTARIO.sqlite"

[[chains]]
name = "ALKOSTO"
layout = "passthrough"
path = "VENTAS ALKOSTO.xlsx"

[[chains]]
name = "FALABELLA"
layout = "melt"
path = "VENTAS FALABELLA.xlsx"
"#;

fn config() -> PipelineConfig {
    PipelineConfig::from_toml(CONFIG).unwrap()
}

fn record(store: &str, code: &str, units: f64, amount: f64, date: (i32, u32, u32)) -> SalesRecord {
    SalesRecord {
        store: store.into(),
        product_code: code.into(),
        model: format!("MODEL-{code}"),
        units,
        amount,
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
    }
}

fn master(store: &str, chain: &str, store_type: &str, code: &str, line: &str) -> MasterRow {
    MasterRow {
        store: Some(store.into()),
        store_type: Some(store_type.into()),
        chain: Some(chain.into()),
        city: Some("BOGOTA".into()),
        product_code: Some(code.into()),
        category: Some("TV".into()),
        line: Some(line.into()),
        ..Default::default()
    }
}

// -------------------------------------------------------------------------
// Reconciliation
// -------------------------------------------------------------------------

#[test]
fn two_chains_concatenate_with_labels() {
    let alkosto =
        SalesBatch::from_records("ALKOSTO", vec![record("S1", "E1", 5.0, 100.0, (2023, 1, 15))]);
    let falabella =
        SalesBatch::from_records("FALABELLA", vec![record("S2", "E2", 2.0, 250.0, (2023, 1, 15))]);
    let rows = vec![
        master("S1", "ALKOSTO", "GRANDES SUPERFICIES", "E1", "OLED"),
        master("S2", "FALABELLA", "DEPARTAMENTALES", "E2", "QNED"),
    ];

    let recon = run(&config(), vec![alkosto, falabella], &rows).unwrap();
    assert_eq!(recon.facts.len(), 2);
    assert_eq!(recon.summary.total_rows, 2);
    assert_eq!(recon.summary.rows_by_chain["ALKOSTO"], 1);
    assert_eq!(recon.summary.rows_by_chain["FALABELLA"], 1);

    for fact in &recon.facts {
        assert_eq!(fact.week, "W02");
        assert_eq!(fact.month, "ENERO");
        assert_eq!(fact.record_type, "SO");
    }
    assert_eq!(recon.facts[0].store_type.as_deref(), Some("GRANDES SUPERFICIES"));
    assert_eq!(recon.facts[1].line.as_deref(), Some("QNED"));
    assert_eq!(recon.facts[1].city.as_deref(), Some("BOGOTA"));
}

#[test]
fn missing_product_keeps_row_with_null_attributes() {
    let batch =
        SalesBatch::from_records("ALKOSTO", vec![record("S1", "E1", 1.0, 10.0, (2023, 3, 1))]);
    let rows = vec![master("S1", "ALKOSTO", "T", "E7", "OLED")];

    let recon = run(&config(), vec![batch], &rows).unwrap();
    let fact = &recon.facts[0];
    assert_eq!(fact.product_code, "E1");
    assert_eq!(fact.category, None);
    assert_eq!(fact.line, None);
    assert_eq!(fact.homologated_reference, None);
    assert_eq!(fact.chain.as_deref(), Some("ALKOSTO"));
    assert_eq!(fact.month, "MARZO");
    assert_eq!(recon.summary.unmatched_product_rows, 1);
    assert_eq!(recon.summary.unmatched_product_codes, vec!["E1".to_string()]);
}

#[test]
fn duplicate_store_uses_first_row() {
    let batch =
        SalesBatch::from_records("ALKOSTO", vec![record("S1", "E1", 1.0, 10.0, (2023, 1, 2))]);
    let rows = vec![
        master("S1", "ALKOSTO", "PRIMERA", "E1", "OLED"),
        master("S1", "EXITO", "SEGUNDA", "E1", "QNED"),
    ];

    let recon = run(&config(), vec![batch], &rows).unwrap();
    assert_eq!(recon.facts.len(), 1);
    assert_eq!(recon.facts[0].store_type.as_deref(), Some("PRIMERA"));
    assert_eq!(recon.facts[0].chain.as_deref(), Some("ALKOSTO"));
    assert_eq!(recon.facts[0].line.as_deref(), Some("OLED"));
}

#[test]
fn month_locale_follows_config() {
    let toml = CONFIG.replace("name = \"sell-out\"", "name = \"sell-out\"\nlocale = \"en_US\"");
    let config = PipelineConfig::from_toml(&toml).unwrap();
    let batch =
        SalesBatch::from_records("ALKOSTO", vec![record("S1", "E1", 1.0, 10.0, (2023, 9, 4))]);

    let recon = run(&config, vec![batch], &[]).unwrap();
    assert_eq!(recon.facts[0].month, "SEPTEMBER");
    assert_eq!(recon.facts[0].week, "W36");
}

#[test]
fn summary_serializes_for_reports() {
    let batch =
        SalesBatch::from_records("ALKOSTO", vec![record("S9", "E1", 1.0, 10.0, (2023, 1, 2))]);
    let recon = run(&config(), vec![batch], &[]).unwrap();

    let json = serde_json::to_value(&recon.summary).unwrap();
    assert_eq!(json["total_rows"], 1);
    assert_eq!(json["unmatched_store_rows"], 1);
    assert_eq!(json["unmatched_store_names"][0], "S9");
}

// -------------------------------------------------------------------------
// Distribution
// -------------------------------------------------------------------------

#[test]
fn distribution_over_reconciled_facts() {
    let batch = SalesBatch::from_records(
        "ALKOSTO",
        vec![
            record("S1", "E1", 10.0, 100.0, (2023, 1, 2)),
            record("S2", "E1", 30.0, 300.0, (2023, 1, 3)),
            record("S3", "E404", 99.0, 990.0, (2023, 1, 3)),
        ],
    );
    let rows = vec![
        master("S1", "chainA", "T", "E1", "lineX"),
        master("S2", "chainA", "T", "E2", "lineY"),
        master("S3", "chainA", "T", "E3", "lineY"),
    ];

    let recon = run(&config(), vec![batch], &rows).unwrap();
    let shares = store_shares(&recon.facts, ZeroVolumePolicy::Skip).unwrap();

    // S3's product is unknown, so its row has no line and is left out.
    let got: Vec<_> = shares.iter().map(|s| (s.store.as_str(), s.ratio)).collect();
    assert_eq!(got, [("S1", 0.25), ("S2", 0.75)]);
}

#[test]
fn zero_volume_policy_is_configurable() {
    let toml = format!("{CONFIG}\n[distribution]\nzero_volume = \"fail\"\n");
    let config = PipelineConfig::from_toml(&toml).unwrap();
    assert_eq!(config.distribution.zero_volume, ZeroVolumePolicy::Fail);

    let batch = SalesBatch::from_records(
        "ALKOSTO",
        vec![
            record("S1", "E1", 4.0, 100.0, (2023, 1, 2)),
            record("S1", "E1", -4.0, -100.0, (2023, 1, 9)),
        ],
    );
    let rows = vec![master("S1", "ALKOSTO", "T", "E1", "OLED")];
    let recon = run(&config, vec![batch], &rows).unwrap();

    let err = store_shares(&recon.facts, config.distribution.zero_volume).unwrap_err();
    assert!(matches!(err, ReconError::ZeroVolumeGroup { .. }));
    assert_eq!(err.to_string(), "chain 'ALKOSTO', line 'OLED': total units are zero");
}
