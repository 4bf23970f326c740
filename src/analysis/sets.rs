//! Grouping of adjacent armor records into logical equipment sets.
//!
//! A logical item usually occupies two adjacent table slots, one per
//! physical variant; some items have a single universal form. Pairing is
//! a single greedy left-to-right pass with no backtracking: a run of
//! three or more records in which every adjacent pair satisfies the
//! pairing predicate pairs the first two and leaves the rest to the next
//! iteration. The source material resolves such runs only by manual
//! inspection, so no smarter tie-break is attempted here.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::analysis::equipment::{ArmorRecord, TAG_UNIVERSAL, TAG_VARIANT_A, TAG_VARIANT_B};

/// Display name used for the empty sentinel item.
const EMPTY_ITEM_NAME: &str = "Nothing Equipped";

/// One physical variant of a logical item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub primary_model: i16,
    pub secondary_model: i16,
    /// Table indices whose records resolve to this variant.
    pub source_indices: Vec<u32>,
}

impl Variant {
    fn from_record(rec: &ArmorRecord) -> Self {
        Self {
            primary_model: rec.primary_model,
            secondary_model: rec.secondary_model,
            source_indices: vec![rec.index],
        }
    }

    fn model_key(&self) -> (i16, i16) {
        (self.primary_model, self.secondary_model)
    }
}

/// A logical equipment item: one or two variants plus its display names,
/// ordered weakest to strongest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentSet {
    pub names: Vec<String>,
    pub variants: Vec<Variant>,
}

impl EquipmentSet {
    /// Serialize a collection of sets to the JSON document downstream
    /// tooling consumes.
    pub fn to_json(sets: &[EquipmentSet]) -> serde_json::Result<String> {
        serde_json::to_string_pretty(sets)
    }

    /// Deserialize a collection of sets from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Vec<EquipmentSet>> {
        serde_json::from_str(json)
    }
}

/// Model-id to display-name lookup, fed by an external documentation
/// collaborator. Primary and secondary models have separate namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameTable {
    primary: BTreeMap<u16, Vec<String>>,
    secondary: BTreeMap<u16, Vec<String>>,
}

impl NameTable {
    pub fn new(primary: BTreeMap<u16, Vec<String>>, secondary: BTreeMap<u16, Vec<String>>) -> Self {
        Self { primary, secondary }
    }

    fn primary_names(&self, model: i16) -> Option<Vec<String>> {
        u16::try_from(model)
            .ok()
            .and_then(|m| self.primary.get(&m))
            .cloned()
    }

    fn secondary_names(&self, model: i16) -> Option<Vec<String>> {
        u16::try_from(model)
            .ok()
            .and_then(|m| self.secondary.get(&m))
            .cloned()
    }

    /// Resolve a variant's model pair to display names. First match
    /// wins; unresolved ids get a placeholder carrying the raw ids, so
    /// resolution never fails a build.
    pub fn lookup(&self, primary_model: i16, secondary_model: i16) -> Vec<String> {
        if primary_model == 0 && secondary_model == 0 {
            return vec![EMPTY_ITEM_NAME.to_string()];
        }
        if primary_model == 0 && secondary_model > 0 {
            return self
                .secondary_names(secondary_model)
                .unwrap_or_else(|| vec![format!("Secondary-only (model {})", secondary_model)]);
        }
        if secondary_model == 0 && primary_model > 0 {
            return self
                .primary_names(primary_model)
                .unwrap_or_else(|| vec![format!("Primary-only (model {})", primary_model)]);
        }
        self.primary_names(primary_model)
            .or_else(|| self.secondary_names(secondary_model))
            .unwrap_or_else(|| {
                vec![format!(
                    "Unknown (model {}/{})",
                    primary_model, secondary_model
                )]
            })
    }
}

/// Groups an index-ordered record stream into [`EquipmentSet`]s.
pub struct SetBuilder<'a> {
    names: &'a NameTable,
}

impl<'a> SetBuilder<'a> {
    pub fn new(names: &'a NameTable) -> Self {
        Self { names }
    }

    /// Build sets from records ordered by table index.
    ///
    /// Empty-sentinel records whose tag is not a recognized variant tag
    /// are padding and belong to no set; every other record lands in
    /// exactly one variant's `source_indices`.
    pub fn build(&self, records: &[ArmorRecord]) -> Vec<EquipmentSet> {
        let mut sets = Vec::new();
        let mut i = 0;
        while i < records.len() {
            let rec = &records[i];

            if rec.is_empty_sentinel() && !is_variant_tag(rec.tag) {
                i += 1;
                continue;
            }

            let next = records.get(i + 1).filter(|n| pairs_with(rec, n));
            match next {
                Some(next) => {
                    let mut names = self.names.lookup(rec.primary_model, rec.secondary_model);
                    let second = self.names.lookup(next.primary_model, next.secondary_model);
                    if second != names {
                        names.extend(second);
                    }
                    sets.push(EquipmentSet {
                        names,
                        variants: vec![Variant::from_record(rec), Variant::from_record(next)],
                    });
                    i += 2;
                }
                None => {
                    sets.push(EquipmentSet {
                        names: self.names.lookup(rec.primary_model, rec.secondary_model),
                        variants: vec![Variant::from_record(rec)],
                    });
                    i += 1;
                }
            }
        }

        let merged = merge_duplicate_sets(sets);
        debug!(
            records = records.len(),
            sets = merged.len(),
            "grouped records into sets"
        );
        merged
    }
}

fn is_variant_tag(tag: u8) -> bool {
    matches!(tag, TAG_VARIANT_A | TAG_VARIANT_B | TAG_UNIVERSAL)
}

/// The pairing predicate: consecutive table indices and either an A/B
/// tag pair or two universal records with consecutive primary models.
fn pairs_with(rec: &ArmorRecord, next: &ArmorRecord) -> bool {
    if next.index != rec.index + 1 {
        return false;
    }
    (rec.tag == TAG_VARIANT_A && next.tag == TAG_VARIANT_B)
        || (rec.tag == TAG_UNIVERSAL
            && next.tag == TAG_UNIVERSAL
            && rec.primary_model > 0
            && next.primary_model == rec.primary_model + 1)
}

/// The same item can appear at several table indices. Sets whose
/// per-variant model tuples are bit-identical merge by unioning source
/// indices positionally; the first set's names win.
fn merge_duplicate_sets(sets: Vec<EquipmentSet>) -> Vec<EquipmentSet> {
    let mut by_key: HashMap<Vec<(i16, i16)>, usize> = HashMap::new();
    let mut merged: Vec<EquipmentSet> = Vec::with_capacity(sets.len());
    for set in sets {
        let key: Vec<(i16, i16)> = set.variants.iter().map(Variant::model_key).collect();
        match by_key.get(&key) {
            Some(&idx) => {
                for (slot, variant) in set.variants.into_iter().enumerate() {
                    merged[idx].variants[slot]
                        .source_indices
                        .extend(variant.source_indices);
                }
            }
            None => {
                by_key.insert(key, merged.len());
                merged.push(set);
            }
        }
    }
    merged
}
