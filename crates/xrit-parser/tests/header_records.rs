//! Header record parsing against synthetic files.

mod common;

use std::io::Cursor;

use chrono::{Datelike, Timelike};
use test_utils::{file_type, HritBuilder, SyntheticChannel};
use xrit_parser::records::FieldValue;
use xrit_parser::{parse_headers, read_headers, FileType, Mission, RecordBody, XritError};

fn msg_segment() -> Vec<u8> {
    SyntheticChannel::small(16, 4, 3, 10).segment_builder(2).to_bytes()
}

#[test]
fn test_parse_msg_segment_header() {
    let bytes = msg_segment();
    let records = parse_headers(&bytes, Mission::MsgHrit).expect("header should parse");

    let tags: Vec<u8> = records.iter().map(|r| r.tag).collect();
    assert_eq!(tags, vec![0, 1, 2, 4, 5, 128]);

    match &records[0].body {
        RecordBody::Primary(p) => {
            assert_eq!(p.file_type, FileType::ImageData);
            assert_eq!(p.data_field_length, 4 * 20 * 8);
        }
        other => panic!("expected primary header, got {other:?}"),
    }
    match &records[1].body {
        RecordBody::ImageStructure(s) => {
            assert_eq!((s.bits_per_pixel, s.columns, s.lines, s.compression), (10, 16, 4, 0));
        }
        other => panic!("expected image structure, got {other:?}"),
    }
    match &records[2].body {
        RecordBody::ImageNavigation(n) => {
            assert_eq!(n.projection_name, "GEOS(+000.0)");
            assert_eq!(n.sub_satellite_longitude, Some(0.0));
            assert_eq!((n.coff, n.loff), (8, 6));
        }
        other => panic!("expected navigation, got {other:?}"),
    }
    match &records[3].body {
        RecordBody::Annotation(a) => {
            assert_eq!(a.platform, "MSG3");
            assert_eq!(a.product_name, "IR_108");
            assert_eq!(a.segment_id().as_deref(), Some("MSG3_IR_108_000002_20151011_1400"));
            assert_eq!(a.product_id().as_deref(), Some("MSG3_IR_108_20151011_1400"));
        }
        other => panic!("expected annotation, got {other:?}"),
    }
    match &records[4].body {
        RecordBody::TimeStamp(t) => {
            // 21102 days after 1958-01-01 is 2015-10-11; 50400000 ms is 14:00.
            assert_eq!((t.time.year(), t.time.month(), t.time.day()), (2015, 10, 11));
            assert_eq!(t.time.hour(), 14);
        }
        other => panic!("expected time stamp, got {other:?}"),
    }
    match &records[5].body {
        RecordBody::SegmentIdentification(s) => {
            assert_eq!(s.segment_number, 2);
            assert_eq!((s.planned_start_segment, s.planned_end_segment), (1, 3));
            assert_eq!(s.spacecraft_id, Some(324));
        }
        other => panic!("expected segment identification, got {other:?}"),
    }

    assert_eq!(records[1].fields.get("columns"), Some(&FieldValue::Unsigned(16)));
}

#[test]
fn test_read_headers_reports_data_offset() {
    let builder = SyntheticChannel::small(16, 4, 3, 10).segment_builder(1);
    let bytes = builder.to_bytes();
    let mut cursor = Cursor::new(&bytes);
    let (records, header_len) = read_headers(&mut cursor, Mission::MsgHrit).unwrap();
    assert_eq!(header_len as usize, builder.header_len());
    assert_eq!(cursor.position(), header_len);
    assert_eq!(records.len(), 6);
}

#[test]
fn test_unknown_tag_is_opaque() {
    let bytes = HritBuilder::new(file_type::IMAGE_DATA)
        .structure(8, 4, 1, 0)
        .raw_record(200, vec![1, 2, 3, 4])
        .data(vec![0; 4])
        .to_bytes();
    let records = parse_headers(&bytes, Mission::Base).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[2].tag, 200);
    assert_eq!(records[2].length, 7);
    match &records[2].body {
        RecordBody::Opaque(b) => assert_eq!(b.as_ref(), &[1, 2, 3, 4]),
        other => panic!("expected opaque record, got {other:?}"),
    }
}

#[test]
fn test_first_record_must_be_primary() {
    let mut bytes = msg_segment();
    bytes[0] = 1;
    let err = parse_headers(&bytes, Mission::MsgHrit).unwrap_err();
    assert!(matches!(err, XritError::HeaderDecode { .. }), "{err}");
}

#[test]
fn test_record_overrunning_buffer_fails() {
    let builder = HritBuilder::new(file_type::IMAGE_DATA).structure(8, 4, 1, 0);
    let bytes = builder.to_bytes();
    // Cut the buffer in the middle of the structure record.
    let err = parse_headers(&bytes[..20], Mission::Base).unwrap_err();
    assert!(matches!(err, XritError::HeaderDecode { .. }), "{err}");
}

#[test]
fn test_short_fixed_record_fails() {
    let bytes = HritBuilder::new(file_type::IMAGE_DATA)
        .raw_record(1, vec![10, 0, 16])
        .to_bytes();
    let err = parse_headers(&bytes, Mission::Base).unwrap_err();
    assert!(err.to_string().contains("structure"), "{err}");
}

#[test]
fn test_jma_records() {
    let bytes = HritBuilder::new(file_type::IMAGE_DATA)
        .structure(16, 2750, 275, 0)
        .navigation("GEOS(140.70)", 20466275, 20466275, 1375, 1375)
        .data_function(&["_UNIT:=KELVIN", "0:=330.06", "1023:=180.00"])
        .annotation("IMG_DK01B13_201510111400_001")
        .jma_segment(3, 10, 551)
        .raw_record(129, vec![0, 7])
        .raw_record(131, b"LINE:=1\rTIME:=57306.58".to_vec())
        .to_bytes();
    let records = parse_headers(&bytes, Mission::JmaHrit).unwrap();

    let nav = records
        .iter()
        .find_map(|r| match &r.body {
            RecordBody::ImageNavigation(n) => Some(n),
            _ => None,
        })
        .unwrap();
    assert_eq!(nav.sub_satellite_longitude, Some(140.7));

    let ann = records
        .iter()
        .find_map(|r| match &r.body {
            RecordBody::Annotation(a) => Some(a),
            _ => None,
        })
        .unwrap();
    assert_eq!(ann.product_name, "B13");
    assert_eq!(ann.platform, "Himawari-8");
    assert!(ann.segment_id().is_none());

    let seg = records
        .iter()
        .find_map(|r| match &r.body {
            RecordBody::SegmentIdentification(s) => Some(s),
            _ => None,
        })
        .unwrap();
    assert_eq!((seg.segment_number, seg.planned_start_segment, seg.planned_end_segment), (3, 1, 10));
    assert_eq!(seg.first_line, Some(551));

    assert!(records
        .iter()
        .any(|r| matches!(r.body, RecordBody::EncryptionKey(ref k) if k.station_id == 7)));
    assert!(records
        .iter()
        .any(|r| r.name == "observation_time" && matches!(r.body, RecordBody::MissionText(_))));
}

#[test]
fn test_data_function_table() {
    let bytes = HritBuilder::new(file_type::IMAGE_DATA)
        .data_function(&["$HALFTONE:=8", "_NAME:=INFRARED", "_UNIT:=KELVIN", "0:=320.0", "255:=180.5"])
        .to_bytes();
    let records = parse_headers(&bytes, Mission::Sgs).unwrap();
    let RecordBody::ImageDataFunction(df) = &records[1].body else {
        panic!("expected data function");
    };
    assert_eq!(df.definition.integer("$HALFTONE"), Some(8));
    assert_eq!(df.definition.string("_UNIT"), Some("KELVIN"));
    assert_eq!(df.definition.table, vec![(0, 320.0), (255, 180.5)]);
}

#[test]
fn test_bad_data_function_fails() {
    let bytes = HritBuilder::new(file_type::IMAGE_DATA)
        .data_function(&["NAME=INFRARED"])
        .to_bytes();
    assert!(matches!(
        parse_headers(&bytes, Mission::Sgs),
        Err(XritError::HeaderDecode { .. })
    ));
}

#[test]
fn test_records_serialize_to_json() {
    let records = parse_headers(&msg_segment(), Mission::MsgHrit).unwrap();
    let json = serde_json::to_value(&records).unwrap();
    assert_eq!(json[1]["name"], "structure");
    assert_eq!(json[1]["fields"]["columns"], 16);
}
