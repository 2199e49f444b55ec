//! Summary statistics over fetched records

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::{GlJournal, JournalStatus, MovementType, Product, StockMovement};
use crate::record::Record;

/// `part / total * 100`, with an empty total giving 0
pub fn percentage(part: f64, total: f64) -> f64 {
    if total == 0.0 || !total.is_finite() || !part.is_finite() {
        0.0
    } else {
        part / total * 100.0
    }
}

/// Sum of a numeric field; missing and non-numeric values count as zero
pub fn sum_field(records: &[Record], field: &str) -> f64 {
    records.iter().filter_map(|r| r.number(field)).sum()
}

/// One group of a categorical breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub key: String,
    pub count: usize,
    /// Sum of the value field within the group (0 when none was given)
    pub sum: f64,
    /// Share of the total: by sum when a value field was given, else by count
    pub percentage: f64,
}

/// Group key for records without the field
pub const MISSING_GROUP: &str = "(none)";

/// Group records by the raw text of `key_field`, in first-appearance order
pub fn group_by(records: &[Record], key_field: &str, value_field: Option<&str>) -> Vec<GroupStat> {
    let mut groups: Vec<GroupStat> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = record
            .text(key_field)
            .unwrap_or_else(|| MISSING_GROUP.to_string());
        let value = value_field.and_then(|f| record.number(f)).unwrap_or(0.0);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(GroupStat {
                key,
                count: 0,
                sum: 0.0,
                percentage: 0.0,
            });
            groups.len() - 1
        });
        groups[slot].count += 1;
        groups[slot].sum += value;
    }

    let total_count = records.len() as f64;
    let total_sum: f64 = groups.iter().map(|g| g.sum).sum();
    for group in &mut groups {
        group.percentage = match value_field {
            Some(_) => percentage(group.sum, total_sum),
            None => percentage(group.count as f64, total_count),
        };
    }
    groups
}

/// Movement totals for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayBucket {
    pub date: NaiveDate,
    pub count: usize,
    /// Sum of positive quantities
    pub inbound: f64,
    /// Sum of the absolute values of negative quantities
    pub outbound: f64,
    /// Signed sum
    pub net: f64,
}

impl DayBucket {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            count: 0,
            inbound: 0.0,
            outbound: 0.0,
            net: 0.0,
        }
    }

    fn add(&mut self, quantity: f64) {
        self.count += 1;
        if quantity > 0.0 {
            self.inbound += quantity;
        } else {
            self.outbound += -quantity;
        }
        self.net += quantity;
    }
}

/// Bucket signed quantities by day, ascending. Entries without a date are skipped.
pub fn bucket_by_day<I>(entries: I) -> Vec<DayBucket>
where
    I: IntoIterator<Item = (Option<NaiveDate>, f64)>,
{
    let mut buckets: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();
    for (date, quantity) in entries {
        let Some(date) = date else { continue };
        buckets
            .entry(date)
            .or_insert_with(|| DayBucket::new(date))
            .add(if quantity.is_finite() { quantity } else { 0.0 });
    }
    buckets.into_values().collect()
}

/// Day buckets over raw records, reading the date and signed quantity fields
pub fn day_buckets(records: &[Record], date_field: &str, quantity_field: &str) -> Vec<DayBucket> {
    bucket_by_day(
        records
            .iter()
            .map(|r| (r.date(date_field), r.number(quantity_field).unwrap_or(0.0))),
    )
}

// ==================== Typed analytics ====================

/// Count and quantity per movement type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementTypeStat {
    pub movement_type: MovementType,
    pub count: usize,
    pub quantity: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovementAnalytics {
    pub total_movements: usize,
    pub total_inbound: f64,
    pub total_outbound: f64,
    pub net_change: f64,
    pub by_day: Vec<DayBucket>,
    pub by_type: Vec<MovementTypeStat>,
}

/// Movement analytics over the window ending at `end` (inclusive).
/// With no `window_days`, or a window reaching past the earliest
/// representable date, every dated movement up to `end` counts.
pub fn movement_analytics(
    movements: &[StockMovement],
    end: NaiveDate,
    window_days: Option<u32>,
) -> MovementAnalytics {
    let start = window_days
        .and_then(|days| end.checked_sub_days(Days::new(u64::from(days.saturating_sub(1)))));
    let in_window: Vec<&StockMovement> = movements
        .iter()
        .filter(|m| match (m.date, start) {
            (Some(date), Some(start)) => date >= start && date <= end,
            (Some(date), None) => date <= end,
            (None, _) => false,
        })
        .collect();

    let by_day = bucket_by_day(in_window.iter().map(|m| (m.date, m.signed_quantity())));

    let mut by_type: Vec<MovementTypeStat> = Vec::new();
    for movement in &in_window {
        match by_type
            .iter_mut()
            .find(|s| s.movement_type == movement.movement_type)
        {
            Some(stat) => {
                stat.count += 1;
                stat.quantity += movement.quantity.abs();
            }
            None => by_type.push(MovementTypeStat {
                movement_type: movement.movement_type,
                count: 1,
                quantity: movement.quantity.abs(),
                percentage: 0.0,
            }),
        }
    }
    let total = in_window.len() as f64;
    for stat in &mut by_type {
        stat.percentage = percentage(stat.count as f64, total);
    }

    MovementAnalytics {
        total_movements: in_window.len(),
        total_inbound: by_day.iter().map(|b| b.inbound).sum(),
        total_outbound: by_day.iter().map(|b| b.outbound).sum(),
        net_change: by_day.iter().map(|b| b.net).sum(),
        by_day,
        by_type,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryValue {
    pub category: String,
    pub products: usize,
    pub stock_value: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventorySummary {
    pub product_count: usize,
    pub low_stock_count: usize,
    pub total_stock_value: f64,
    pub by_category: Vec<CategoryValue>,
}

pub fn inventory_summary(products: &[Product]) -> InventorySummary {
    let mut by_category: Vec<CategoryValue> = Vec::new();
    for product in products {
        let category = product
            .category
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| MISSING_GROUP.to_string());
        match by_category.iter_mut().find(|c| c.category == category) {
            Some(entry) => {
                entry.products += 1;
                entry.stock_value += product.stock_value();
            }
            None => by_category.push(CategoryValue {
                category,
                products: 1,
                stock_value: product.stock_value(),
                percentage: 0.0,
            }),
        }
    }

    let total_stock_value: f64 = by_category.iter().map(|c| c.stock_value).sum();
    for entry in &mut by_category {
        entry.percentage = percentage(entry.stock_value, total_stock_value);
    }

    InventorySummary {
        product_count: products.len(),
        low_stock_count: products.iter().filter(|p| p.is_low_stock()).count(),
        total_stock_value,
        by_category,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalSummary {
    pub total: usize,
    pub draft: usize,
    pub posted: usize,
    pub cancelled: usize,
    /// Debit total over posted journals
    pub posted_debit: f64,
    /// Credit total over posted journals
    pub posted_credit: f64,
    /// Draft journal numbers whose debits and credits differ
    pub unbalanced_drafts: Vec<String>,
}

pub fn journal_summary(journals: &[GlJournal]) -> JournalSummary {
    let count = |status: JournalStatus| journals.iter().filter(|j| j.status == status).count();
    let posted = journals.iter().filter(|j| j.status == JournalStatus::Posted);

    JournalSummary {
        total: journals.len(),
        draft: count(JournalStatus::Draft),
        posted: count(JournalStatus::Posted),
        cancelled: count(JournalStatus::Cancelled),
        posted_debit: posted.clone().map(|j| j.total_debit).sum(),
        posted_credit: posted.map(|j| j.total_credit).sum(),
        unbalanced_drafts: journals
            .iter()
            .filter(|j| j.status == JournalStatus::Draft && !j.is_balanced())
            .map(|j| j.journal_number.clone())
            .collect(),
    }
}
