//! Grouping, totals and ordering of instance records
//!
//! [`aggregate`] is side-effect free: the same records and keys always
//! produce the same view.

use crate::config::{GroupBy, SortBy, SortDirection};
use crate::models::{Classification, InstanceRecord};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Display key of the bucket for records whose group field is empty
pub const UNGROUPED: &str = "ungrouped";

/// Cost and count sums over a set of records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Monthly cost if every recommendation is applied
    pub optimized_cost: f64,
    /// Monthly cost as currently provisioned
    pub non_optimized_cost: f64,
    /// Always `non_optimized_cost - optimized_cost`
    pub saving: f64,
    pub optimized_count: usize,
    /// Every record that is not `optimized`, stale ones included
    pub non_optimized_count: usize,
    pub stale_count: usize,
    /// Monthly cost of stale instances
    pub stale_cost: f64,
    pub instance_count: usize,
}

impl Totals {
    /// Sum a set of records in one pass
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a InstanceRecord>) -> Self {
        let mut totals = Totals::default();
        for record in records {
            totals.add(record);
        }
        totals.saving = totals.non_optimized_cost - totals.optimized_cost;
        totals
    }

    fn add(&mut self, record: &InstanceRecord) {
        self.instance_count += 1;
        self.non_optimized_cost += record.current_cost;
        self.optimized_cost += record.optimized_cost;

        match record.classification {
            Classification::Optimized => self.optimized_count += 1,
            Classification::NonOptimized => self.non_optimized_count += 1,
            Classification::Stale => {
                self.non_optimized_count += 1;
                self.stale_count += 1;
                self.stale_cost += record.current_cost;
            }
        }
    }
}

/// Records sharing a group key, with their subtotals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub key: String,
    /// Records with no group value; kept apart from a real `"ungrouped"` key
    #[serde(default)]
    pub ungrouped: bool,
    pub totals: Totals,
    pub instances: Vec<InstanceRecord>,
}

enum SortValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl Group {
    fn sort_value(&self, sort_by: SortBy) -> SortValue<'_> {
        match sort_by {
            SortBy::NonOptimizedCost => SortValue::Number(self.totals.non_optimized_cost),
            SortBy::OptimizedCost => SortValue::Number(self.totals.optimized_cost),
            SortBy::Saving => SortValue::Number(self.totals.saving),
            SortBy::InstanceCount => SortValue::Number(self.totals.instance_count as f64),
            SortBy::OptimizedCount => SortValue::Number(self.totals.optimized_count as f64),
            SortBy::StaleCount => SortValue::Number(self.totals.stale_count as f64),
            SortBy::Name => SortValue::Text(&self.key),
        }
    }

    fn compare(&self, other: &Group, sort_by: SortBy) -> Ordering {
        let by_field = match (self.sort_value(sort_by), other.sort_value(sort_by)) {
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(&b),
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        };
        by_field
            .then_with(|| self.key.cmp(&other.key))
            .then_with(|| self.ungrouped.cmp(&other.ungrouped))
    }
}

/// Sorted groups plus global totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateView {
    pub groups: Vec<Group>,
    pub totals: Totals,
}

/// Group, total and order a set of records.
///
/// Groups are ordered ascending by the `sort_by` field with ties broken by
/// group key; descending is the exact reverse of that sequence. Members of a
/// group are ordered by descending monthly cost, ties by instance id.
pub fn aggregate(
    records: &[InstanceRecord],
    group_by: GroupBy,
    sort_by: SortBy,
    direction: SortDirection,
) -> AggregateView {
    let totals = Totals::from_records(records);

    let mut buckets: BTreeMap<Option<String>, Vec<InstanceRecord>> = BTreeMap::new();
    for record in records {
        buckets
            .entry(group_by.key_of(record))
            .or_default()
            .push(record.clone());
    }

    let mut groups: Vec<Group> = buckets
        .into_iter()
        .map(|(key, mut instances)| {
            instances.sort_by(|a, b| {
                b.current_cost
                    .total_cmp(&a.current_cost)
                    .then_with(|| a.instance_id.cmp(&b.instance_id))
            });
            Group {
                totals: Totals::from_records(&instances),
                ungrouped: key.is_none(),
                key: key.unwrap_or_else(|| UNGROUPED.to_string()),
                instances,
            }
        })
        .collect();

    groups.sort_by(|a, b| a.compare(b, sort_by));
    if direction == SortDirection::Desc {
        groups.reverse();
    }

    AggregateView { groups, totals }
}
