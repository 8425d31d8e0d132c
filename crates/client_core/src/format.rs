//! Display helpers for the bills list.

use chrono::{Datelike, NaiveDate};
use shared::domain::BillRecord;

const MONTHS: [&str; 12] = [
    "Jan", "Fév", "Mar", "Avr", "Mai", "Jui", "Jui", "Aoû", "Sep", "Oct", "Nov", "Déc",
];

/// A bill as shown in the list view.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayBill {
    pub record: BillRecord,
    pub display_date: String,
    pub display_status: &'static str,
}

impl DisplayBill {
    pub fn from_record(record: BillRecord) -> Self {
        let display_date = format_date(&record.date).unwrap_or_else(|| record.date.clone());
        let display_status = record.status.label();
        Self {
            record,
            display_date,
            display_status,
        }
    }
}

pub fn parse_bill_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// `2004-04-04` -> `4 Avr. 04`.
pub fn format_date(raw: &str) -> Option<String> {
    let date = parse_bill_date(raw)?;
    let month = MONTHS[date.month0() as usize];
    Some(format!(
        "{} {}. {:02}",
        date.day(),
        month,
        date.year().rem_euclid(100)
    ))
}

/// Most recent first. Equal dates keep their input order and bills whose date
/// does not parse stay at their original index.
pub fn sort_most_recent_first(bills: Vec<DisplayBill>) -> Vec<DisplayBill> {
    let mut slots: Vec<Option<DisplayBill>> = Vec::with_capacity(bills.len());
    let mut dated: Vec<(NaiveDate, DisplayBill)> = Vec::new();
    let mut dated_slots: Vec<usize> = Vec::new();

    for (index, bill) in bills.into_iter().enumerate() {
        match parse_bill_date(&bill.record.date) {
            Some(date) => {
                dated_slots.push(index);
                dated.push((date, bill));
                slots.push(None);
            }
            None => slots.push(Some(bill)),
        }
    }

    dated.sort_by(|(a, _), (b, _)| b.cmp(a));
    for (slot, (_, bill)) in dated_slots.into_iter().zip(dated) {
        slots[slot] = Some(bill);
    }

    slots.into_iter().flatten().collect()
}
