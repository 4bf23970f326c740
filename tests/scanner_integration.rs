//! End-to-end table discovery over a synthetic image: scan for the
//! table, interpret its records, group them into sets.

use memdig::analysis::equipment::ArmorRecord;
use memdig::analysis::scanner::TableScanner;
use memdig::analysis::sets::{NameTable, SetBuilder};
use memdig::core::address_range::AddressRange;
use memdig::core::address_space::{AddressSpace, VirtualAddress};
use memdig::core::memory_image::MemoryImage;

const BASE: u32 = 0x0896_0000;
const STRIDE: u32 = 8;

/// Stride-8 records: model s16 at +0, secondary s16 at +2, tag at +4.
fn record(model: i16, tag: u8) -> [u8; 8] {
    let mut bytes = [0u8; 8];
    bytes[0..2].copy_from_slice(&model.to_le_bytes());
    bytes[4] = tag;
    bytes
}

fn model_of(bytes: &[u8]) -> i16 {
    i16::from_le_bytes([bytes[0], bytes[1]])
}

/// An image with garbage slots around a 3-record table.
fn synthetic_image() -> MemoryImage {
    let mut data = Vec::new();
    data.extend_from_slice(&record(9999, 0)); // fails the validator
    data.extend_from_slice(&record(0, 0x0F));
    data.extend_from_slice(&record(5, 0x07));
    data.extend_from_slice(&record(9, 0x0B));
    data.extend_from_slice(&record(4000, 0)); // fails the validator
    MemoryImage::new(data, AddressSpace::new(VirtualAddress(BASE), 0))
}

fn plausible(bytes: &[u8]) -> bool {
    (0..=100).contains(&model_of(bytes))
}

#[test]
fn scan_finds_the_three_record_table() {
    let image = synthetic_image();
    let range = AddressRange::new(VirtualAddress(BASE), VirtualAddress(BASE + 40));
    let runs = TableScanner::new(STRIDE).scan(&image, range, &[], plausible);

    assert_eq!(runs.len(), 1);
    let run = runs[0];
    assert_eq!(run.start, VirtualAddress(BASE + 8));
    assert_eq!(run.end, VirtualAddress(BASE + 32));
    assert_eq!(run.count, 3);
    assert_eq!(run.end.0, run.start.0 + run.count as u32 * run.stride);

    // Maximality: the slots flanking the run fail the validator.
    let before = image.read_bytes(VirtualAddress(run.start.0 - STRIDE), 8).unwrap();
    let after = image.read_bytes(run.end, 8).unwrap();
    assert!(!plausible(before));
    assert!(!plausible(after));
}

#[test]
fn scanned_records_group_into_two_sets() {
    let image = synthetic_image();
    let range = AddressRange::new(VirtualAddress(BASE), VirtualAddress(BASE + 40));
    let runs = TableScanner::new(STRIDE).scan(&image, range, &[], plausible);
    let run = runs[0];

    let records: Vec<ArmorRecord> = run
        .record_addresses()
        .enumerate()
        .map(|(i, addr)| {
            let bytes = image.read_bytes(addr, STRIDE as usize).unwrap();
            ArmorRecord::parse(i as u32, bytes).unwrap()
        })
        .collect();
    assert_eq!(records.len(), 3);

    let names = NameTable::default();
    let sets = SetBuilder::new(&names).build(&records);

    // The tagged blank stands alone; the A/B pair forms one set.
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[0].variants.len(), 1);
    assert_eq!(sets[0].variants[0].source_indices, vec![0]);
    assert_eq!(sets[0].names, vec!["Nothing Equipped"]);
    assert_eq!(sets[1].variants.len(), 2);
    assert_eq!(sets[1].variants[0].source_indices, vec![1]);
    assert_eq!(sets[1].variants[1].source_indices, vec![2]);
}

#[test]
fn scan_results_are_reproducible() {
    let image = synthetic_image();
    let range = AddressRange::new(VirtualAddress(BASE), VirtualAddress(BASE + 40));
    let scanner = TableScanner::new(STRIDE);
    let first = scanner.scan(&image, range, &[], plausible);
    for _ in 0..5 {
        assert_eq!(scanner.scan(&image, range, &[], plausible), first);
    }
}
