//! Declarative per-dataset schema registry.
//!
//! Every dataset kind the datastore understands has exactly one
//! [`SchemaEntry`] describing its canonical columns, the semantic type each
//! column must coerce to, accepted column-name synonyms, and the natural key
//! used for deduplication. Lookup is the only operation.

use crate::table::ColumnType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every dataset kind the datastore can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Cdr,
    Antennas,
    Recharges,
    #[serde(rename = "mobiledata")]
    MobileData,
    #[serde(rename = "mobilemoney")]
    MobileMoney,
    Shapefiles,
    HomeGroundTruth,
    PovertyScores,
    Features,
    Labels,
    Targeting,
    Fairness,
    #[serde(alias = "survey")]
    SurveyData,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 13] = [
        DatasetKind::Cdr,
        DatasetKind::Antennas,
        DatasetKind::Recharges,
        DatasetKind::MobileData,
        DatasetKind::MobileMoney,
        DatasetKind::Shapefiles,
        DatasetKind::HomeGroundTruth,
        DatasetKind::PovertyScores,
        DatasetKind::Features,
        DatasetKind::Labels,
        DatasetKind::Targeting,
        DatasetKind::Fairness,
        DatasetKind::SurveyData,
    ];

    /// Slot / configuration key for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cdr => "cdr",
            Self::Antennas => "antennas",
            Self::Recharges => "recharges",
            Self::MobileData => "mobiledata",
            Self::MobileMoney => "mobilemoney",
            Self::Shapefiles => "shapefiles",
            Self::HomeGroundTruth => "home_ground_truth",
            Self::PovertyScores => "poverty_scores",
            Self::Features => "features",
            Self::Labels => "labels",
            Self::Targeting => "targeting",
            Self::Fairness => "fairness",
            Self::SurveyData => "survey_data",
        }
    }

    /// Kinds carrying a `timestamp` and a derived `day` column.
    pub fn is_time_indexed(&self) -> bool {
        matches!(
            self,
            Self::Cdr | Self::Recharges | Self::MobileData | Self::MobileMoney
        )
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        if normalized == "survey" {
            return Ok(Self::SurveyData);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown dataset kind '{s}'"))
    }
}

/// The type a column must coerce to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    Text,
    Numeric,
    Timestamp,
    /// Text restricted to an enumerated vocabulary.
    Categorical(&'static [&'static str]),
    Geometry,
}

impl SemanticType {
    /// Physical dtype a successfully coerced column carries.
    pub fn output_type(&self) -> ColumnType {
        match self {
            Self::Text | Self::Categorical(_) => ColumnType::String,
            Self::Numeric => ColumnType::Float,
            Self::Timestamp => ColumnType::DateTime,
            Self::Geometry => ColumnType::Geometry,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Numeric => write!(f, "numeric"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Categorical(values) => write!(f, "one of [{}]", values.join(", ")),
            Self::Geometry => write!(f, "geometry"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub ty: SemanticType,
    pub required: bool,
}

const fn required(name: &'static str, ty: SemanticType) -> ColumnSpec {
    ColumnSpec {
        name,
        ty,
        required: true,
    }
}

const fn optional(name: &'static str, ty: SemanticType) -> ColumnSpec {
    ColumnSpec {
        name,
        ty,
        required: false,
    }
}

/// Schema contract for one dataset kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaEntry {
    pub kind: DatasetKind,
    pub columns: &'static [ColumnSpec],
    /// `(alias, canonical)` pairs accepted in place of canonical names.
    pub synonyms: &'static [(&'static str, &'static str)],
    /// Columns identifying a record for deduplication; empty when the kind
    /// is not deduplicated.
    pub natural_key: &'static [&'static str],
}

impl SchemaEntry {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn required_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.required)
    }
}

pub const CDR_TXN_TYPES: &[&str] = &["call", "text"];
pub const INTERNATIONAL_FLAGS: &[&str] = &["domestic", "international", "other"];
pub const MOBILEMONEY_TXN_TYPES: &[&str] = &["cashin", "cashout", "p2p", "billpay", "other"];

/// Identifier shared by features and labels.
pub const ID_COLUMN: &str = "name";
pub const LABEL_COLUMN: &str = "label";
pub const WEIGHT_COLUMN: &str = "weight";
pub const DAY_COLUMN: &str = "day";
pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const RANDOM_COLUMN: &str = "random";
pub const GEOMETRY_COLUMN: &str = "geometry";
pub const REGION_COLUMN: &str = "region";
pub const SURVEY_ID_COLUMN: &str = "unique_id";

static CDR: SchemaEntry = SchemaEntry {
    kind: DatasetKind::Cdr,
    columns: &[
        required("txn_type", SemanticType::Categorical(CDR_TXN_TYPES)),
        required("caller_id", SemanticType::Text),
        required("recipient_id", SemanticType::Text),
        required(TIMESTAMP_COLUMN, SemanticType::Timestamp),
        required("duration", SemanticType::Numeric),
        required(
            "international",
            SemanticType::Categorical(INTERNATIONAL_FLAGS),
        ),
        optional("caller_antenna", SemanticType::Text),
        optional("recipient_antenna", SemanticType::Text),
    ],
    synonyms: &[
        ("transaction_type", "txn_type"),
        ("caller_msisdn", "caller_id"),
        ("recipient_msisdn", "recipient_id"),
        ("datetime", TIMESTAMP_COLUMN),
    ],
    natural_key: &["caller_id", "recipient_id", TIMESTAMP_COLUMN, "txn_type"],
};

static ANTENNAS: SchemaEntry = SchemaEntry {
    kind: DatasetKind::Antennas,
    columns: &[
        required("antenna_id", SemanticType::Text),
        required("latitude", SemanticType::Numeric),
        required("longitude", SemanticType::Numeric),
        optional("tower_id", SemanticType::Text),
    ],
    synonyms: &[("lat", "latitude"), ("lon", "longitude"), ("lng", "longitude")],
    natural_key: &[],
};

static RECHARGES: SchemaEntry = SchemaEntry {
    kind: DatasetKind::Recharges,
    columns: &[
        required("caller_id", SemanticType::Text),
        required("amount", SemanticType::Numeric),
        required(TIMESTAMP_COLUMN, SemanticType::Timestamp),
    ],
    synonyms: &[("caller_msisdn", "caller_id"), ("datetime", TIMESTAMP_COLUMN)],
    natural_key: &["caller_id", TIMESTAMP_COLUMN],
};

static MOBILEDATA: SchemaEntry = SchemaEntry {
    kind: DatasetKind::MobileData,
    columns: &[
        required("caller_id", SemanticType::Text),
        required("volume", SemanticType::Numeric),
        required(TIMESTAMP_COLUMN, SemanticType::Timestamp),
    ],
    synonyms: &[("caller_msisdn", "caller_id"), ("datetime", TIMESTAMP_COLUMN)],
    natural_key: &["caller_id", TIMESTAMP_COLUMN],
};

static MOBILEMONEY: SchemaEntry = SchemaEntry {
    kind: DatasetKind::MobileMoney,
    columns: &[
        required("txn_type", SemanticType::Categorical(MOBILEMONEY_TXN_TYPES)),
        required("caller_id", SemanticType::Text),
        required("recipient_id", SemanticType::Text),
        required(TIMESTAMP_COLUMN, SemanticType::Timestamp),
        required("amount", SemanticType::Numeric),
        optional("sender_balance_before", SemanticType::Numeric),
        optional("sender_balance_after", SemanticType::Numeric),
        optional("recipient_balance_before", SemanticType::Numeric),
        optional("recipient_balance_after", SemanticType::Numeric),
    ],
    synonyms: &[
        ("transaction_type", "txn_type"),
        ("caller_msisdn", "caller_id"),
        ("recipient_msisdn", "recipient_id"),
        ("datetime", TIMESTAMP_COLUMN),
    ],
    natural_key: &["caller_id", "recipient_id", TIMESTAMP_COLUMN, "txn_type"],
};

static SHAPEFILES: SchemaEntry = SchemaEntry {
    kind: DatasetKind::Shapefiles,
    columns: &[
        required(REGION_COLUMN, SemanticType::Text),
        required(GEOMETRY_COLUMN, SemanticType::Geometry),
    ],
    synonyms: &[("geom", GEOMETRY_COLUMN)],
    natural_key: &[],
};

static HOME_GROUND_TRUTH: SchemaEntry = SchemaEntry {
    kind: DatasetKind::HomeGroundTruth,
    columns: &[
        required("subscriber_id", SemanticType::Text),
        required(REGION_COLUMN, SemanticType::Text),
    ],
    synonyms: &[("caller_id", "subscriber_id")],
    natural_key: &[],
};

static POVERTY_SCORES: SchemaEntry = SchemaEntry {
    kind: DatasetKind::PovertyScores,
    columns: &[
        required(ID_COLUMN, SemanticType::Text),
        required("predicted", SemanticType::Numeric),
    ],
    synonyms: &[("score", "predicted")],
    natural_key: &[],
};

// Feature columns beyond the identifier are open-ended; the features loader
// casts them to numeric itself.
static FEATURES: SchemaEntry = SchemaEntry {
    kind: DatasetKind::Features,
    columns: &[required(ID_COLUMN, SemanticType::Text)],
    synonyms: &[],
    natural_key: &[],
};

static LABELS: SchemaEntry = SchemaEntry {
    kind: DatasetKind::Labels,
    columns: &[
        required(ID_COLUMN, SemanticType::Text),
        required(LABEL_COLUMN, SemanticType::Numeric),
        optional(WEIGHT_COLUMN, SemanticType::Numeric),
    ],
    synonyms: &[],
    natural_key: &[],
};

static TARGETING: SchemaEntry = SchemaEntry {
    kind: DatasetKind::Targeting,
    columns: &[
        required(SURVEY_ID_COLUMN, SemanticType::Text),
        optional(WEIGHT_COLUMN, SemanticType::Numeric),
    ],
    synonyms: &[],
    natural_key: &[],
};

static FAIRNESS: SchemaEntry = SchemaEntry {
    kind: DatasetKind::Fairness,
    columns: &[
        required(SURVEY_ID_COLUMN, SemanticType::Text),
        optional(WEIGHT_COLUMN, SemanticType::Numeric),
    ],
    synonyms: &[],
    natural_key: &[],
};

static SURVEY_DATA: SchemaEntry = SchemaEntry {
    kind: DatasetKind::SurveyData,
    columns: &[
        required(SURVEY_ID_COLUMN, SemanticType::Text),
        optional(WEIGHT_COLUMN, SemanticType::Numeric),
    ],
    synonyms: &[],
    natural_key: &[],
};

/// Look up the schema contract for a dataset kind.
pub fn schema_for(kind: DatasetKind) -> &'static SchemaEntry {
    match kind {
        DatasetKind::Cdr => &CDR,
        DatasetKind::Antennas => &ANTENNAS,
        DatasetKind::Recharges => &RECHARGES,
        DatasetKind::MobileData => &MOBILEDATA,
        DatasetKind::MobileMoney => &MOBILEMONEY,
        DatasetKind::Shapefiles => &SHAPEFILES,
        DatasetKind::HomeGroundTruth => &HOME_GROUND_TRUTH,
        DatasetKind::PovertyScores => &POVERTY_SCORES,
        DatasetKind::Features => &FEATURES,
        DatasetKind::Labels => &LABELS,
        DatasetKind::Targeting => &TARGETING,
        DatasetKind::Fairness => &FAIRNESS,
        DatasetKind::SurveyData => &SURVEY_DATA,
    }
}
