//! Synthetic fixture data written to a temporary directory.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use cider_core::table::Table;
use cider_core::{GeometryReader, Result, TableReader};
use tempfile::TempDir;

pub const ANTENNA_ROWS: usize = 297;
pub const TXN_ROWS: usize = 1000;
pub const LABEL_ROWS: usize = 50;
pub const SURVEY_QUESTIONS: usize = 16;
pub const SHAPEFILE_LEVELS: [&str; 3] = ["regions", "prefectures", "communes"];

/// Days covered by the recharge and mobile-data fixtures: 2020-01-01 through
/// 2020-02-29.
pub const FIXTURE_DAYS: usize = 60;

pub struct Fixture {
    pub dir: TempDir,
    pub config_path: PathBuf,
}

impl Fixture {
    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }
}

/// Write every fixture file plus a config that points at them.
pub fn write_fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(&data).unwrap();

    write(&data, "antennas.csv", &antennas());
    write(&data, "cdr.csv", &cdr());
    write(&data, "recharges.csv", &daily("amount"));
    write(&data, "mobiledata.csv", &daily("volume"));
    write(&data, "mobilemoney.csv", &mobilemoney());
    write(&data, "labels.csv", &labels());
    write(&data, "features.csv", &features());
    write(&data, "survey.csv", &survey());
    write(&data, "home_ground_truth.csv", &ground_truth());
    write(&data, "poverty_scores.csv", &poverty_scores());
    write(&data, "targeting.csv", &weighted_population());
    write(&data, "fairness.csv", &weighted_population());
    for (i, level) in SHAPEFILE_LEVELS.iter().enumerate() {
        write(&data, &format!("{level}.geojson"), &shapefile(i + 2));
    }

    let mut config = String::new();
    writeln!(config, "[paths]\ndata_dir = \"data\"\n\n[paths.files]").unwrap();
    for kind in [
        "antennas",
        "cdr",
        "recharges",
        "mobiledata",
        "mobilemoney",
        "labels",
        "features",
        "home_ground_truth",
        "poverty_scores",
        "targeting",
        "fairness",
    ] {
        writeln!(config, "{kind} = \"{kind}.csv\"").unwrap();
    }
    writeln!(config, "survey_data = \"survey.csv\"\n\n[paths.shapefiles]").unwrap();
    for level in SHAPEFILE_LEVELS {
        writeln!(config, "{level} = \"{level}.geojson\"").unwrap();
    }
    let questions = |prefix: &str| {
        (0..SURVEY_QUESTIONS)
            .map(|i| format!("\"{prefix}{i}\""))
            .collect::<Vec<_>>()
            .join(", ")
    };
    writeln!(
        config,
        "\n[survey]\nbinary = [{}]\ncontinuous = [{}]\n\n[params]\nseed = 42",
        questions("bin"),
        questions("con")
    )
    .unwrap();

    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, config).unwrap();
    Fixture { dir, config_path }
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

fn timestamp(i: usize) -> String {
    let day = i % FIXTURE_DAYS;
    let (month, dom) = if day < 31 { (1, day + 1) } else { (2, day - 30) };
    format!(
        "2020-{month:02}-{dom:02} {:02}:{:02}:00",
        i % 24,
        (i * 7) % 60
    )
}

fn antennas() -> String {
    let mut out = String::from("antenna_id,tower_id,latitude,longitude\n");
    for i in 0..ANTENNA_ROWS {
        writeln!(
            out,
            "a{i},t{},{:.4},{:.4}",
            i / 3,
            8.0 + (i as f64) * 0.01,
            1.0 + (i as f64) * 0.005
        )
        .unwrap();
    }
    out
}

fn cdr() -> String {
    let mut out = String::from(
        "txn_type,caller_id,recipient_id,timestamp,duration,international,caller_antenna,recipient_antenna\n",
    );
    for i in 0..TXN_ROWS {
        let txn = if i % 3 == 0 { "text" } else { "call" };
        let duration = if txn == "text" { 0 } else { 30 + i % 600 };
        let international = ["domestic", "international", "other"][i % 3];
        writeln!(
            out,
            "{txn},c{},c{},{},{duration},{international},a{},a{}",
            i % 97,
            (i + 13) % 97,
            timestamp(i),
            i % ANTENNA_ROWS,
            (i * 5) % ANTENNA_ROWS
        )
        .unwrap();
    }
    out
}

fn daily(measure: &str) -> String {
    let mut out = format!("caller_id,{measure},timestamp\n");
    for i in 0..TXN_ROWS {
        writeln!(out, "c{},{},{}", i % 97, 10 + i % 90, timestamp(i)).unwrap();
    }
    out
}

fn mobilemoney() -> String {
    let mut out = String::from(
        "txn_type,caller_id,recipient_id,timestamp,amount,sender_balance_before,sender_balance_after,recipient_balance_before,recipient_balance_after\n",
    );
    let types = ["cashin", "cashout", "p2p", "billpay", "other"];
    for i in 0..TXN_ROWS {
        let amount = 5 + i % 50;
        writeln!(
            out,
            "{},c{},c{},{},{amount},{},{},{},{}",
            types[i % types.len()],
            i % 97,
            (i + 7) % 97,
            timestamp(i),
            1000 + i,
            1000 + i - amount,
            200 + i,
            200 + i + amount
        )
        .unwrap();
    }
    out
}

fn labels() -> String {
    let mut out = String::from("name,label,weight\n");
    for i in 0..LABEL_ROWS {
        writeln!(out, "id{i},{},{}", 1000 + i * 37, 1 + i % 4).unwrap();
    }
    out
}

fn features() -> String {
    let mut out = String::from("name,calls,texts,recharge_total,data_volume,contacts\n");
    for i in 0..TXN_ROWS {
        writeln!(
            out,
            "id{i},{},{},{:.2},{},{}",
            i % 40,
            i % 25,
            (i as f64) * 1.5,
            i * 3,
            i % 12
        )
        .unwrap();
    }
    out
}

fn survey() -> String {
    let mut header = vec!["unique_id".to_string()];
    header.extend((0..SURVEY_QUESTIONS).map(|q| format!("bin{q}")));
    header.extend((0..SURVEY_QUESTIONS).map(|q| format!("con{q}")));
    let mut out = header.join(",");
    out.push('\n');
    for i in 0..TXN_ROWS {
        let mut row = vec![format!("s{i}")];
        row.extend((0..SURVEY_QUESTIONS).map(|q| ((i + q) % 2).to_string()));
        row.extend((0..SURVEY_QUESTIONS).map(|q| format!("{:.1}", (i * (q + 1)) as f64 / 10.0)));
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

fn ground_truth() -> String {
    let mut out = String::from("subscriber_id,region\n");
    for i in 0..TXN_ROWS {
        writeln!(out, "c{i},r{}", i % 5).unwrap();
    }
    out
}

fn poverty_scores() -> String {
    let mut out = String::from("name,predicted\n");
    for i in 0..TXN_ROWS {
        writeln!(out, "id{i},{:.3}", (i % 100) as f64 / 100.0).unwrap();
    }
    out
}

fn weighted_population() -> String {
    let mut out = String::from("unique_id,region,weight\n");
    for i in 0..TXN_ROWS {
        writeln!(out, "u{i},r{},{}", i % 5, 1 + i % 5).unwrap();
    }
    out
}

fn shapefile(count: usize) -> String {
    let items: Vec<String> = (0..count)
        .map(|i| {
            let x = i as f64;
            format!(
                r#"{{"type":"Feature","properties":{{"region":"r{i}"}},"geometry":{{"type":"Polygon","coordinates":[[[{x},0.0],[{x1},0.0],[{x1},1.0],[{x},1.0],[{x},0.0]]]}}}}"#,
                x1 = x + 1.0
            )
        })
        .collect();
    format!(
        r#"{{"type":"FeatureCollection","features":[{}]}}"#,
        items.join(",")
    )
}

/// A reader that ignores the path and returns a fixed table, standing in for
/// a patched CSV reader.
pub struct FixedReader(pub Table);

impl TableReader for FixedReader {
    fn read_csv(&self, _path: &Path) -> Result<Table> {
        Ok(self.0.clone())
    }
}

/// Geometry counterpart of [`FixedReader`]: every configured level reads back
/// the same table.
pub struct FixedGeometryReader(pub Table);

impl GeometryReader for FixedGeometryReader {
    fn read_geometry(&self, _path: &Path) -> Result<Table> {
        Ok(self.0.clone())
    }
}
