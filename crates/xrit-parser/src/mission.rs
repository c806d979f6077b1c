//! Per-mission header record tables.
//!
//! Every mission shares the generic parser in [`crate::records`]; what differs
//! is which tags exist and how their fields are laid out. Supporting a new
//! mission means adding a table here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::XritError;
use crate::records::layout::{field, FieldType::*, RecordKind, RecordLayout};

/// Source of a set of xRIT files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mission {
    /// Plain LRIT/HRIT records as defined by CGMS.
    #[default]
    Base,
    /// EUMETSAT MSG HRIT.
    MsgHrit,
    /// JMA Himawari HRIT.
    JmaHrit,
    /// GOES/MTSAT data re-disseminated by EUMETSAT.
    Sgs,
    /// Roshydromet Electro-L (GOMS) HRIT.
    Goms,
    /// EUMETSAT native MSG (UMARF) files. These carry no xRIT records of
    /// their own; the base table applies to any embedded xRIT product.
    MsgNative,
}

const PRIMARY: RecordLayout = RecordLayout {
    tag: 0,
    name: "primary_header",
    kind: RecordKind::Primary,
    fields: &[
        field("file_type", U8),
        field("total_header_length", U32),
        field("data_field_length", U64),
    ],
};

const STRUCTURE: RecordLayout = RecordLayout {
    tag: 1,
    name: "structure",
    kind: RecordKind::ImageStructure,
    fields: &[
        field("bits_per_pixel", U8),
        field("columns", U16),
        field("lines", U16),
        field("compression", U8),
    ],
};

const NAVIGATION: RecordLayout = RecordLayout {
    tag: 2,
    name: "navigation",
    kind: RecordKind::ImageNavigation,
    fields: &[
        field("projection_name", Text(32)),
        field("cfac", I32),
        field("lfac", I32),
        field("coff", I32),
        field("loff", I32),
    ],
};

const DATA_FUNCTION: RecordLayout = RecordLayout {
    tag: 3,
    name: "data_function",
    kind: RecordKind::ImageDataFunction,
    fields: &[field("data_definition", VarText)],
};

const ANNOTATION: RecordLayout = RecordLayout {
    tag: 4,
    name: "annotation",
    kind: RecordKind::Annotation,
    fields: &[field("text", VarText)],
};

const TIME_STAMP: RecordLayout = RecordLayout {
    tag: 5,
    name: "time_stamp",
    kind: RecordKind::TimeStamp,
    fields: &[field("cds_p_field", U8), field("time", CdsTime)],
};

const SEGMENT: RecordLayout = RecordLayout {
    tag: 128,
    name: "segment",
    kind: RecordKind::SegmentIdentification,
    fields: &[
        field("spacecraft_id", U16),
        field("spectral_channel_id", U8),
        field("segment_number", U16),
        field("planned_start_segment", U16),
        field("planned_end_segment", U16),
        field("data_field_representation", U8),
    ],
};

const LINE_QUALITY: RecordLayout = RecordLayout {
    tag: 129,
    name: "image_quality",
    kind: RecordKind::LineQuality,
    fields: &[field("line_quality", LineQualityTable)],
};

const BASE_TABLE: &[RecordLayout] = &[
    PRIMARY,
    STRUCTURE,
    NAVIGATION,
    DATA_FUNCTION,
    ANNOTATION,
    TIME_STAMP,
    SEGMENT,
    LINE_QUALITY,
];

const JMA_TABLE: &[RecordLayout] = &[
    PRIMARY,
    STRUCTURE,
    NAVIGATION,
    DATA_FUNCTION,
    RecordLayout {
        tag: 4,
        name: "annotation",
        kind: RecordKind::JmaAnnotation,
        fields: &[field("text", VarText)],
    },
    TIME_STAMP,
    RecordLayout {
        tag: 128,
        name: "segment",
        kind: RecordKind::JmaSegmentIdentification,
        fields: &[
            field("segment_number", U8),
            field("planned_end_segment", U8),
            field("first_line", U16),
        ],
    },
    RecordLayout {
        tag: 129,
        name: "encryption_key",
        kind: RecordKind::EncryptionKey,
        fields: &[field("station_id", U16)],
    },
    RecordLayout {
        tag: 130,
        name: "image_compensation",
        kind: RecordKind::MissionText,
        fields: &[field("text", VarText)],
    },
    RecordLayout {
        tag: 131,
        name: "observation_time",
        kind: RecordKind::MissionText,
        fields: &[field("text", VarText)],
    },
    RecordLayout {
        tag: 132,
        name: "image_quality",
        kind: RecordKind::MissionText,
        fields: &[field("text", VarText)],
    },
];

impl Mission {
    pub const ALL: [Mission; 6] = [
        Mission::Base,
        Mission::MsgHrit,
        Mission::JmaHrit,
        Mission::Sgs,
        Mission::Goms,
        Mission::MsgNative,
    ];

    /// The tag to layout table of this mission.
    pub fn layouts(&self) -> &'static [RecordLayout] {
        match self {
            Mission::JmaHrit => JMA_TABLE,
            Mission::Base | Mission::MsgHrit | Mission::Sgs | Mission::Goms | Mission::MsgNative => BASE_TABLE,
        }
    }

    pub fn layout(&self, tag: u8) -> Option<&'static RecordLayout> {
        self.layouts().iter().find(|l| l.tag == tag)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mission::Base => "base",
            Mission::MsgHrit => "msg",
            Mission::JmaHrit => "jma",
            Mission::Sgs => "sgs",
            Mission::Goms => "goms",
            Mission::MsgNative => "native",
        }
    }
}

impl FromStr for Mission {
    type Err = XritError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "base" | "lrit" | "hrit" => Ok(Mission::Base),
            "msg" | "msg_hrit" | "met" => Ok(Mission::MsgHrit),
            "jma" | "jma_hrit" | "himawari" | "h8" => Ok(Mission::JmaHrit),
            "sgs" | "goes" | "mtsat" => Ok(Mission::Sgs),
            "goms" | "electro" | "electro_l" => Ok(Mission::Goms),
            "native" | "msg_native" => Ok(Mission::MsgNative),
            other => Err(XritError::header(format!("unknown mission '{other}'"))),
        }
    }
}

impl fmt::Display for Mission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
