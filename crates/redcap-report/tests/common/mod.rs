//! Shared fixtures for the report tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::DataFrame;

use redcap_model::{
    CellValue, CodeKey, DisplayDictionary, DisplayTermEntry, EventRecord, ParticipantRecord,
    RecordId,
};

pub const SITE: &str = "redcap_data_access_group";
pub const SITE_DISPLAY: &str = "redcap_data_access_group_display";

pub fn dictionary() -> DisplayDictionary {
    dictionary_with(&[])
}

/// The shared terms plus `extra` rows.
pub fn dictionary_with(extra: &[(&str, &str, &str)]) -> DisplayDictionary {
    let rows = [
        (SITE, "ut", "Utah"),
        (SITE, "tx", "Texas"),
        (SITE, "mi", "Michigan"),
        ("participation_interest", "0", "No"),
        ("participation_interest", "1", "Maybe"),
        ("participation_interest", "2", "Yes"),
        ("reason_not_interested", "1", "Too far"),
        ("reason_not_interested", "2", "No time"),
        ("reason_not_interested", "3", "Other"),
        ("erep_protdev_type", "1", "Informed Consent"),
        ("erep_protdev_type", "2", "Visit timeline"),
        ("erep_protdev_type", "3", "Imaging"),
        ("ewprimaryreason", "1", "Withdrew consent"),
        ("ewprimaryreason", "2", "Lost to follow-up"),
        ("sex", "1", "Male"),
        ("sex", "2", "Female"),
        ("dem_race", "1", "White"),
        ("dem_race", "2", "Black"),
        ("dem_race", "3", "Asian"),
        ("ethnic", "1", "Hispanic"),
        ("ethnic", "2", "Not Hispanic"),
    ];
    DisplayDictionary::from_entries(
        rows.iter()
            .chain(extra)
            .map(|(field, raw, label)| DisplayTermEntry::new(*field, *raw, *label)),
    )
    .expect("dictionary")
}

pub fn at(month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, month, day)
        .expect("date")
        .and_hms_opt(hour, 0, 0)
        .expect("time")
}

pub fn participant(id: u32, values: &[(&str, CellValue)]) -> ParticipantRecord {
    let mut map = BTreeMap::new();
    map.insert("record_id".to_string(), CellValue::Number(f64::from(id)));
    map.insert(
        "screening_id".to_string(),
        CellValue::text(format!("S-{id:03}")),
    );
    for (field, value) in values {
        map.insert((*field).to_string(), value.clone());
    }
    ParticipantRecord::new(RecordId::parse(&id.to_string()), map)
}

pub fn event(id: u32, instance: u32, values: &[(&str, CellValue)]) -> EventRecord {
    let mut map = BTreeMap::new();
    for (field, value) in values {
        map.insert((*field).to_string(), value.clone());
    }
    EventRecord::new(
        RecordId::parse(&id.to_string()).expect("record id"),
        CodeKey::from_number(f64::from(instance)),
        map,
    )
}

pub fn site(label: &str) -> (&'static str, CellValue) {
    (SITE_DISPLAY, CellValue::text(label))
}

pub fn number(value: f64) -> CellValue {
    CellValue::Number(value)
}

pub fn text(value: &str) -> CellValue {
    CellValue::text(value)
}

pub fn ints(df: &DataFrame, column: &str) -> Vec<Option<i64>> {
    df.column(column)
        .expect("column")
        .i64()
        .expect("i64 column")
        .into_iter()
        .collect()
}

pub fn strs(df: &DataFrame, column: &str) -> Vec<Option<String>> {
    df.column(column)
        .expect("column")
        .str()
        .expect("string column")
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect()
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}
