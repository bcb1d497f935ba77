//! Screening funnel, decline reasons and decline comments.

mod common;

use proptest::prelude::*;

use common::{
    at, column_names, dictionary, dictionary_with, ints, number, participant, site, strs, text,
};
use redcap_model::{CellValue, CodeKey, ParticipantRecord};
use redcap_report::{
    ReportConfig, ReportWindow, decline_comments, decline_reasons, explode_reasons,
    screening_funnel,
};

fn interested(id: u32, center: &str, label: &str, code: f64) -> ParticipantRecord {
    participant(
        id,
        &[
            site(center),
            ("participation_interest", number(code)),
            ("participation_interest_display", text(label)),
        ],
    )
}

fn declined(id: u32, center: &str, reason: CellValue) -> ParticipantRecord {
    participant(
        id,
        &[
            site(center),
            ("participation_interest", number(0.0)),
            ("participation_interest_display", text("No")),
            ("reason_not_interested", reason),
        ],
    )
}

#[test]
fn funnel_counts_by_site_and_interest() {
    let participants = vec![
        interested(1, "Utah", "Yes", 2.0),
        interested(2, "Utah", "Yes", 2.0),
        interested(3, "Utah", "No", 0.0),
        interested(4, "Texas", "Maybe", 1.0),
        // no site label: dropped
        participant(5, &[("participation_interest_display", text("Yes"))]),
    ];
    let df = screening_funnel(&participants, &ReportConfig::default()).unwrap();

    assert_eq!(
        column_names(&df),
        vec!["Center Name", "All Participants", "Yes", "Maybe", "No"]
    );
    assert_eq!(
        strs(&df, "Center Name"),
        vec![
            Some("Texas".to_string()),
            Some("Utah".to_string()),
            Some("All Sites".to_string())
        ]
    );
    assert_eq!(ints(&df, "All Participants"), vec![Some(1), Some(3), Some(4)]);
    assert_eq!(ints(&df, "Yes"), vec![Some(0), Some(2), Some(2)]);
    assert_eq!(ints(&df, "Maybe"), vec![Some(1), Some(0), Some(1)]);
    assert_eq!(ints(&df, "No"), vec![Some(0), Some(1), Some(1)]);
}

#[test]
fn funnel_summary_row_sums_site_rows() {
    let participants: Vec<ParticipantRecord> = (0..30)
        .map(|i| {
            let center = ["Utah", "Texas", "Michigan"][i % 3];
            let (label, code) = [("Yes", 2.0), ("Maybe", 1.0), ("No", 0.0)][i % 2];
            interested(i as u32, center, label, code)
        })
        .collect();
    let df = screening_funnel(&participants, &ReportConfig::default()).unwrap();
    for column in ["All Participants", "Yes", "Maybe", "No"] {
        let values = ints(&df, column);
        let (summary, sites) = values.split_last().unwrap();
        let total: i64 = sites.iter().map(|v| v.unwrap()).sum();
        assert_eq!(*summary, Some(total), "column {column}");
    }
}

#[test]
fn decline_reasons_explode_and_label() {
    let participants = vec![
        declined(1, "Utah", text("1|2|3")),
        declined(2, "Utah", CellValue::Missing),
        declined(3, "Texas", number(2.0)),
        interested(4, "Texas", "Yes", 2.0),
    ];
    let df = decline_reasons(&participants, &dictionary(), &ReportConfig::default()).unwrap();

    assert_eq!(
        column_names(&df),
        vec![
            "Center Name",
            "Total Declined",
            "Unknown",
            "Too far",
            "No time",
            "Other"
        ]
    );
    assert_eq!(ints(&df, "Total Declined"), vec![Some(1), Some(2), Some(3)]);
    assert_eq!(ints(&df, "Unknown"), vec![Some(0), Some(1), Some(1)]);
    assert_eq!(ints(&df, "Too far"), vec![Some(0), Some(1), Some(1)]);
    assert_eq!(ints(&df, "No time"), vec![Some(1), Some(1), Some(2)]);
    assert_eq!(ints(&df, "Other"), vec![Some(0), Some(1), Some(1)]);
}

#[test]
fn unknown_reason_uses_dictionary_label_when_present() {
    let dictionary = redcap_model::DisplayDictionary::from_entries(vec![
        redcap_model::DisplayTermEntry::new("reason_not_interested", "-1", "Not recorded"),
        redcap_model::DisplayTermEntry::new("reason_not_interested", "1", "Too far"),
    ])
    .unwrap();
    let participants = vec![declined(1, "Utah", CellValue::Missing)];
    let df = decline_reasons(&participants, &dictionary, &ReportConfig::default()).unwrap();
    assert_eq!(
        column_names(&df),
        vec!["Center Name", "Total Declined", "Not recorded"]
    );
}

#[test]
fn reasons_sharing_a_label_share_a_column() {
    let dictionary = dictionary_with(&[("reason_not_interested", "4", "Other")]);
    let participants = vec![
        declined(1, "Utah", text("3|4")),
        declined(2, "Texas", number(4.0)),
        declined(3, "Texas", text("1")),
    ];
    let df = decline_reasons(&participants, &dictionary, &ReportConfig::default()).unwrap();

    assert_eq!(
        column_names(&df),
        vec!["Center Name", "Total Declined", "Too far", "Other"]
    );
    assert_eq!(ints(&df, "Other"), vec![Some(1), Some(2), Some(3)]);
    assert_eq!(ints(&df, "Too far"), vec![Some(1), Some(0), Some(1)]);
}

#[test]
fn missing_reason_merges_with_dictionary_unknown_label() {
    let dictionary = dictionary_with(&[("reason_not_interested", "9", "Unknown")]);
    let participants = vec![
        declined(1, "Utah", CellValue::Missing),
        declined(2, "Utah", number(9.0)),
        declined(3, "Utah", number(1.0)),
    ];
    let df = decline_reasons(&participants, &dictionary, &ReportConfig::default()).unwrap();

    assert_eq!(
        column_names(&df),
        vec!["Center Name", "Total Declined", "Unknown", "Too far"]
    );
    assert_eq!(ints(&df, "Unknown"), vec![Some(2), Some(2)]);
    assert_eq!(ints(&df, "Total Declined"), vec![Some(3), Some(3)]);
}

fn comment(id: u32, contacted: CellValue, note: &str) -> ParticipantRecord {
    participant(
        id,
        &[
            site("Utah"),
            ("participation_interest", number(0.0)),
            ("date_of_contact", contacted),
            ("ptinterest_comment", text(note)),
        ],
    )
}

#[test]
fn decline_comments_use_half_open_window() {
    let window = ReportWindow::new(at(3, 1, 0), at(3, 8, 0)).unwrap();
    let participants = vec![
        comment(1, CellValue::DateTime(at(3, 1, 0)), "on start"),
        comment(2, CellValue::DateTime(at(3, 4, 9)), "inside"),
        comment(3, CellValue::DateTime(at(3, 8, 0)), "on end"),
        comment(4, CellValue::DateTime(at(3, 9, 0)), "after"),
        comment(5, CellValue::Missing, "undated"),
    ];
    let df = decline_comments(&participants, &window, &ReportConfig::default()).unwrap();
    assert_eq!(column_names(&df), vec!["Center Name", "Reason"]);
    assert_eq!(
        strs(&df, "Reason"),
        vec![Some("inside".to_string()), Some("on end".to_string())]
    );
}

proptest! {
    #[test]
    fn explode_yields_one_code_per_reason(codes in prop::collection::vec(0u8..20, 1..8)) {
        let joined = codes.iter().map(u8::to_string).collect::<Vec<_>>().join("|");
        let unknown = CodeKey::from_number(-1.0);
        let exploded = explode_reasons(&CellValue::text(joined), "|", &unknown);
        prop_assert_eq!(exploded.len(), codes.len());
        for (key, code) in exploded.iter().zip(&codes) {
            prop_assert_eq!(key.as_number(), Some(f64::from(*code)));
        }
    }
}
