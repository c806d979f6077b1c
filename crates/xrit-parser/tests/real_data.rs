//! Checks against real EUMETSAT files. Skipped unless TEST_DATA_DIR holds them.

use test_utils::require_test_file;
use xrit_parser::{FileType, Mission, SegmentFile};

#[test]
fn test_real_msg_prologue() {
    let path = require_test_file!("H-000-MSG2__-MSG2________-_________-PRO______-201010111400-__");
    let file = SegmentFile::open(&path, Mission::MsgHrit).expect("prologue should parse");
    assert_eq!(file.file_type(), FileType::Prologue);
    assert!(file.read_data().unwrap().len() >= 387_257);
}

#[test]
fn test_real_msg_segment() {
    let path = require_test_file!("H-000-MSG2__-MSG2________-IR_108___-000004___-201010111400-__");
    let file = SegmentFile::open(&path, Mission::MsgHrit).expect("segment should parse");
    let descriptor = file.descriptor().unwrap();
    assert_eq!(descriptor.segment_number, 4);
    assert_eq!((descriptor.columns, descriptor.lines), (3712, 464));
    assert_eq!(descriptor.bits_per_pixel, 10);
    let annotation = file.annotation().unwrap();
    assert_eq!(annotation.product_name, "IR_108");
}
