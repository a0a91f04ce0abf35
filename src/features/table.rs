//! Headerless SHARP feature CSV: label, timestamp, NOAA region, HARP number,
//! optional extra metadata up to `start_feature`, then the 18 features.

use super::{FEATURE_COUNT, FEATURE_NAMES};
use crate::error::DataError;
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// History-only row; never a sample of its own
    Padding,
    /// Flare without an associated CME
    Negative,
    /// Flare with an associated CME
    Positive,
}

impl Label {
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "padding" => Some(Label::Padding),
            "n" | "negative" => Some(Label::Negative),
            "p" | "positive" => Some(Label::Positive),
            _ => None,
        }
    }

    /// Binary target; padding rows have none.
    pub fn target(self) -> Option<u8> {
        match self {
            Label::Padding => None,
            Label::Negative => Some(0),
            Label::Positive => Some(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub label: Label,
    pub timestamp: NaiveDateTime,
    /// NOAA active region number as written in the file
    pub region: String,
    pub harp: u32,
    pub features: [f32; FEATURE_COUNT],
}

impl FeatureRecord {
    /// First `n` ranked features.
    pub fn top(&self, n: usize) -> &[f32] {
        &self.features[..n.min(FEATURE_COUNT)]
    }
}

/// Rows in file order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureTable {
    pub records: Vec<FeatureRecord>,
}

impl FeatureTable {
    pub fn from_path(path: &Path, start_feature: usize) -> Result<Self, DataError> {
        let file = File::open(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(file, start_feature)?;
        tracing::debug!(path = %path.display(), rows = table.len(), "feature table loaded");
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R, start_feature: usize) -> Result<Self, DataError> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row?;
            records.push(parse_row(&row, start_feature)?);
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn parse_row(row: &StringRecord, start_feature: usize) -> Result<FeatureRecord, DataError> {
    let line = row.position().map(|p| p.line()).unwrap_or(0);
    let expected = start_feature + FEATURE_COUNT;
    if row.len() != expected {
        return Err(DataError::RowLength {
            line,
            expected,
            found: row.len(),
        });
    }

    let label = Label::parse(&row[0]).ok_or_else(|| DataError::BadLabel {
        line,
        value: row[0].to_string(),
    })?;
    let timestamp = parse_timestamp(&row[1]).ok_or_else(|| DataError::BadTimestamp {
        line,
        value: row[1].to_string(),
    })?;
    let harp = parse_integral(&row[3]).ok_or_else(|| DataError::BadNumber {
        line,
        column: "HARPNUM",
        value: row[3].to_string(),
    })?;

    let mut features = [0.0f32; FEATURE_COUNT];
    for (i, slot) in features.iter_mut().enumerate() {
        let raw = &row[start_feature + i];
        *slot = raw.parse::<f32>().map_err(|_| DataError::BadNumber {
            line,
            column: FEATURE_NAMES[i],
            value: raw.to_string(),
        })?;
    }

    Ok(FeatureRecord {
        label,
        timestamp,
        region: row[2].to_string(),
        harp,
        features,
    })
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

// HARP numbers sometimes arrive as "377.0".
fn parse_integral(raw: &str) -> Option<u32> {
    if let Ok(v) = raw.parse::<u32>() {
        return Some(v);
    }
    let f = raw.parse::<f64>().ok()?;
    (f.fract() == 0.0 && f >= 0.0 && f <= u32::MAX as f64).then_some(f as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str, harp: &str, value: f32) -> String {
        let feats: Vec<String> = (0..FEATURE_COUNT).map(|_| value.to_string()).collect();
        format!("{label},2012-03-07T00:00:00Z,11429,{harp},{}\n", feats.join(","))
    }

    #[test]
    fn parses_labels_and_features() {
        let data = [row("padding", "1449", 0.5), row("P", "1449.0", 0.25)].concat();
        let table = FeatureTable::from_reader(data.as_bytes(), 4).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].label, Label::Padding);
        assert_eq!(table.records[1].label, Label::Positive);
        assert_eq!(table.records[1].harp, 1449);
        assert_eq!(table.records[1].features[17], 0.25);
        assert_eq!(table.records[0].region, "11429");
    }

    #[test]
    fn short_row_reports_line() {
        let mut data = row("N", "1", 0.1);
        data.push_str("N,2012-03-07T00:00:00Z,11429,1,0.1,0.2\n");
        let err = FeatureTable::from_reader(data.as_bytes(), 4).unwrap_err();
        match err {
            DataError::RowLength { line, expected, found } => {
                assert_eq!(line, 2);
                assert_eq!(expected, 22);
                assert_eq!(found, 6);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_unknown_label() {
        let data = row("maybe", "1", 0.1);
        assert!(matches!(
            FeatureTable::from_reader(data.as_bytes(), 4),
            Err(DataError::BadLabel { .. })
        ));
    }

    #[test]
    fn rejects_non_numeric_feature() {
        let data = row("N", "1", 0.1).replacen(",0.1", ",abc", 1);
        match FeatureTable::from_reader(data.as_bytes(), 4) {
            Err(DataError::BadNumber { column, .. }) => assert_eq!(column, "TOTUSJH"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn accepts_space_separated_timestamp() {
        assert!(parse_timestamp("2012-03-07 01:12:00").is_some());
        assert!(parse_timestamp("2012-03-07T01:12:00.00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
