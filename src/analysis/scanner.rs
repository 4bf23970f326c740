//! Fixed-stride table boundary detection.
//!
//! Table start addresses in the image are not statically known; what is
//! known is one or more good sample record addresses and a plausibility
//! predicate over raw record bytes. The scanner walks every alignment
//! phase implied by the samples, keeps validator-passing records, and
//! folds them into maximal contiguous runs.
//!
//! The phase heuristic stands in for a properly documented format
//! grammar. It is deliberately isolated behind this interface so an
//! exact-grammar implementation could replace it without touching the
//! grouping layer above.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::core::address_range::AddressRange;
use crate::core::address_space::VirtualAddress;
use crate::core::memory_image::MemoryImage;

/// A maximal contiguous run of validator-passing records.
///
/// For an unmerged run, `end == start + count * stride`. A run merged
/// across a small gap keeps `end` from its last fragment while `count`
/// counts valid records only, so slots and records can differ there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRun {
    /// Address of the first record.
    pub start: VirtualAddress,
    /// One past the last record.
    pub end: VirtualAddress,
    /// Record size in bytes.
    pub stride: u32,
    /// Number of valid records in the run.
    pub count: usize,
}

impl TableRun {
    /// Total slots spanned, gaps included.
    pub fn slots(&self) -> usize {
        (self.end.0.saturating_sub(self.start.0) / self.stride) as usize
    }

    /// Slot addresses from `start` to `end` in stride steps.
    pub fn record_addresses(&self) -> impl Iterator<Item = VirtualAddress> + '_ {
        (0..self.slots() as u32).map(move |i| self.start.wrapping_add(i * self.stride))
    }
}

/// Locates runs of plausible fixed-stride records.
pub struct TableScanner {
    stride: u32,
    min_run: usize,
    merge_gap_records: u32,
}

impl TableScanner {
    /// Scanner for `stride`-byte records. Runs shorter than 2 records are
    /// discarded as noise, and runs separated by at most 5 invalid slots
    /// are merged, matching the exploratory defaults the heuristic was
    /// tuned with.
    pub fn new(stride: u32) -> Self {
        Self {
            stride,
            min_run: 2,
            merge_gap_records: 5,
        }
    }

    /// Minimum records for a run to be reported.
    pub fn with_min_run(mut self, min_run: usize) -> Self {
        self.min_run = min_run;
        self
    }

    /// Maximum gap, in record slots, bridged when merging adjacent runs.
    pub fn with_merge_gap(mut self, records: u32) -> Self {
        self.merge_gap_records = records;
        self
    }

    /// Scan `range` for maximal contiguous runs of records satisfying
    /// `validator`.
    ///
    /// One alignment phase is derived per sample address
    /// (`sample mod stride`, in image-absolute terms, so phases from
    /// different samples are directly comparable); with no samples the
    /// range start supplies the phase. Returned runs are disjoint and
    /// sorted by start address.
    ///
    /// An empty range or zero stride yields an empty list — which is
    /// indistinguishable from a validator that rejected everything.
    pub fn scan<F>(
        &self,
        image: &MemoryImage,
        range: AddressRange,
        samples: &[VirtualAddress],
        validator: F,
    ) -> Vec<TableRun>
    where
        F: Fn(&[u8]) -> bool,
    {
        if self.stride == 0 || range.is_empty() {
            return Vec::new();
        }

        let mut phases: BTreeSet<u32> = samples.iter().map(|s| s.0 % self.stride).collect();
        if phases.is_empty() {
            phases.insert(range.start.0 % self.stride);
        }

        // Valid record addresses, deduplicated across phases.
        let mut valid: BTreeSet<u32> = BTreeSet::new();
        for &phase in &phases {
            let before = valid.len();
            let start_rem = range.start.0 % self.stride;
            let mut addr = range.start.0 + (phase + self.stride - start_rem) % self.stride;
            while addr as u64 + self.stride as u64 <= range.end.0 as u64 {
                if let Ok(bytes) = image.read_bytes(VirtualAddress(addr), self.stride as usize) {
                    if validator(bytes) {
                        valid.insert(addr);
                    }
                }
                addr = match addr.checked_add(self.stride) {
                    Some(a) => a,
                    None => break,
                };
            }
            debug!(
                phase,
                stride = self.stride,
                records = valid.len() - before,
                "scanned alignment phase"
            );
        }

        let runs = self.collect_runs(&valid);
        let merged = self.merge_runs(runs);
        debug!(runs = merged.len(), "scan complete");
        merged
    }

    /// Fold sorted valid addresses into exact-contiguity runs, dropping
    /// those shorter than `min_run`.
    fn collect_runs(&self, valid: &BTreeSet<u32>) -> Vec<TableRun> {
        let mut runs = Vec::new();
        let mut current: Option<(u32, u32, usize)> = None; // (start, last, count)
        for &addr in valid {
            current = Some(match current {
                Some((start, last, count)) if addr == last + self.stride => {
                    (start, addr, count + 1)
                }
                Some(run) => {
                    self.push_run(&mut runs, run);
                    (addr, addr, 1)
                }
                None => (addr, addr, 1),
            });
        }
        if let Some(run) = current {
            self.push_run(&mut runs, run);
        }
        runs
    }

    fn push_run(&self, runs: &mut Vec<TableRun>, (start, last, count): (u32, u32, usize)) {
        if count >= self.min_run {
            runs.push(TableRun {
                start: VirtualAddress(start),
                end: VirtualAddress(last + self.stride),
                stride: self.stride,
                count,
            });
        }
    }

    /// Merge runs separated by at most `merge_gap_records` slots of
    /// presumed non-record padding. Runs from different phases can
    /// overlap; the saturating gap treats those as adjacent.
    fn merge_runs(&self, runs: Vec<TableRun>) -> Vec<TableRun> {
        let mut merged: Vec<TableRun> = Vec::with_capacity(runs.len());
        for run in runs {
            match merged.last_mut() {
                Some(prev)
                    if run.start.0.saturating_sub(prev.end.0)
                        <= self.merge_gap_records * self.stride =>
                {
                    prev.end = VirtualAddress(prev.end.0.max(run.end.0));
                    prev.count += run.count;
                }
                _ => merged.push(run),
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::address_space::AddressSpace;

    const BASE: u32 = 0x0896_0000;

    /// Image whose buffer mirrors RAM at `BASE` with no header.
    fn image(data: Vec<u8>) -> MemoryImage {
        MemoryImage::new(data, AddressSpace::new(VirtualAddress(BASE), 0))
    }

    /// Records are 8 bytes; a record is "valid" when its first byte is
    /// nonzero.
    fn first_byte_nonzero(bytes: &[u8]) -> bool {
        bytes[0] != 0
    }

    fn table(valid_slots: &[bool]) -> MemoryImage {
        let mut data = vec![0u8; valid_slots.len() * 8];
        for (i, &ok) in valid_slots.iter().enumerate() {
            if ok {
                data[i * 8] = 1;
            }
        }
        image(data)
    }

    fn full_range(img: &MemoryImage) -> AddressRange {
        AddressRange::new(
            VirtualAddress(BASE),
            VirtualAddress(BASE + img.len() as u32),
        )
    }

    #[test]
    fn finds_single_run() {
        let img = table(&[false, true, true, true, false]);
        let runs = TableScanner::new(8).scan(&img, full_range(&img), &[], first_byte_nonzero);
        assert_eq!(runs.len(), 1);
        let run = runs[0];
        assert_eq!(run.start, VirtualAddress(BASE + 8));
        assert_eq!(run.end, VirtualAddress(BASE + 32));
        assert_eq!(run.count, 3);
        assert_eq!(run.end.0, run.start.0 + (run.count as u32) * run.stride);
    }

    #[test]
    fn runs_are_maximal() {
        let img = table(&[true, true, false, false, false, false, false, false, true, true]);
        let scanner = TableScanner::new(8).with_merge_gap(2);
        let runs = scanner.scan(&img, full_range(&img), &[], first_byte_nonzero);
        assert_eq!(runs.len(), 2);
        // Slot before each start and after each end fails the validator.
        for run in &runs {
            if run.start.0 > BASE {
                let before = img
                    .read_bytes(VirtualAddress(run.start.0 - 8), 8)
                    .unwrap();
                assert!(!first_byte_nonzero(before));
            }
            if let Ok(after) = img.read_bytes(run.end, 8) {
                assert!(!first_byte_nonzero(after));
            }
        }
    }

    #[test]
    fn single_hits_are_noise() {
        let img = table(&[false, true, false, false, true, true, false]);
        let runs = TableScanner::new(8).scan(&img, full_range(&img), &[], first_byte_nonzero);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, VirtualAddress(BASE + 32));
        assert_eq!(runs[0].count, 2);
    }

    #[test]
    fn small_gaps_merge_and_count_valid_records_only() {
        // Two 2-record runs separated by one invalid slot.
        let img = table(&[true, true, false, true, true]);
        let runs = TableScanner::new(8).scan(&img, full_range(&img), &[], first_byte_nonzero);
        assert_eq!(runs.len(), 1);
        let run = runs[0];
        assert_eq!(run.count, 4);
        assert_eq!(run.slots(), 5);
        assert_eq!(run.end, VirtualAddress(BASE + 40));
    }

    #[test]
    fn wide_gaps_stay_separate() {
        let mut slots = vec![true, true];
        slots.extend(std::iter::repeat(false).take(6));
        slots.extend([true, true]);
        let img = table(&slots);
        let runs = TableScanner::new(8).scan(&img, full_range(&img), &[], first_byte_nonzero);
        assert_eq!(runs.len(), 2);
        assert!(runs[0].start < runs[1].start);
    }

    #[test]
    fn sample_addresses_define_phases() {
        // Records live at BASE+4, BASE+12, BASE+20: phase 4 of stride 8.
        let mut data = vec![0u8; 32];
        for off in [4usize, 12, 20] {
            data[off] = 1;
        }
        let img = image(data);
        let range = full_range(&img);

        // Phase 0 (no samples) sees nothing.
        let runs = TableScanner::new(8).scan(&img, range, &[], first_byte_nonzero);
        assert!(runs.is_empty());

        // A sample in the middle of the table recovers the run.
        let sample = VirtualAddress(BASE + 12);
        let runs = TableScanner::new(8).scan(&img, range, &[sample], first_byte_nonzero);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].start, VirtualAddress(BASE + 4));
        assert_eq!(runs[0].count, 3);
    }

    #[test]
    fn duplicate_phases_do_not_double_count() {
        let img = table(&[true, true, true]);
        let samples = [
            VirtualAddress(BASE),
            VirtualAddress(BASE + 8),
            VirtualAddress(BASE + 16),
        ];
        let runs = TableScanner::new(8).scan(&img, full_range(&img), &samples, first_byte_nonzero);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].count, 3);
    }

    #[test]
    fn degenerate_inputs_yield_empty() {
        let img = table(&[true, true]);
        let empty = AddressRange::new(VirtualAddress(BASE), VirtualAddress(BASE));
        assert!(TableScanner::new(8)
            .scan(&img, empty, &[], first_byte_nonzero)
            .is_empty());
        assert!(TableScanner::new(0)
            .scan(&img, full_range(&img), &[], first_byte_nonzero)
            .is_empty());
    }

    #[test]
    fn scan_is_idempotent() {
        let img = table(&[true, true, false, true, true, true]);
        let scanner = TableScanner::new(8);
        let a = scanner.scan(&img, full_range(&img), &[], first_byte_nonzero);
        let b = scanner.scan(&img, full_range(&img), &[], first_byte_nonzero);
        assert_eq!(a, b);
    }

    #[test]
    fn range_clamps_to_image_end() {
        let img = table(&[true, true, true]);
        // Range extends far past the buffer; unreadable records fail clean.
        let range = AddressRange::new(VirtualAddress(BASE), VirtualAddress(BASE + 0x1000));
        let runs = TableScanner::new(8).scan(&img, range, &[], first_byte_nonzero);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].count, 3);
    }
}
