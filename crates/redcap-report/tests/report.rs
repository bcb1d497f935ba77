//! End-to-end: load a snapshot and events, then build every table.

mod common;

use polars::prelude::{Column, DataFrame};
use serde_json::json;

use common::{at, dictionary_with, ints, strs};
use redcap_ingest::{EventOptions, SnapshotOptions, build_event_table, build_weekly_snapshot};
use redcap_report::{ReportConfig, ReportWindow, StudyReport, is_placeholder};

fn snapshot_frame() -> DataFrame {
    DataFrame::new(vec![
        Column::new("record_id".into(), ["1", "2", "3", "4"]),
        Column::new("screening_id".into(), ["S-1", "S-2", "S-3", "S-4"]),
        Column::new(
            "redcap_data_access_group".into(),
            ["ut", "ut", "tx", "mi"],
        ),
        Column::new("participation_interest".into(), ["2", "2", "1", "0"]),
        Column::new("reason_not_interested".into(), ["", "", "", "1|2"]),
        Column::new("ptinterest_comment".into(), ["", "", "", "lives too far"]),
        Column::new("consent_process_form_complete".into(), ["2", "2", "2", "0"]),
        Column::new(
            "date_of_contact".into(),
            ["2024-05-01", "2024-05-02", "2024-05-03", "2024-05-28"],
        ),
        Column::new(
            "date_and_time".into(),
            ["2024-05-10 09:00", "2024-05-20 10:30", "2024-04-01 08:00", ""],
        ),
        Column::new("ewdateterm".into(), ["", "2024-05-25", "", ""]),
        Column::new("sp_v1_preop_date".into(), ["2024-05-12", "", "2024-04-05", ""]),
        Column::new("sex".into(), ["1", "2", "", ""]),
        Column::new("screening_gender".into(), ["", "", "2", "1"]),
    ])
    .expect("snapshot frame")
}

#[test]
fn builds_every_table_from_loaded_data() {
    let dictionary = dictionary_with(&[
        ("screening_gender", "1", "Male"),
        ("screening_gender", "2", "Female"),
    ]);

    let snapshot =
        build_weekly_snapshot(&snapshot_frame(), &dictionary, &SnapshotOptions::default())
            .expect("snapshot");
    let events = build_event_table(
        &json!([{
            "1": {
                "1": {
                    "erep_prot_dev": "1",
                    "erep_protdev_type": "2",
                    "erep_local_dtime": "2024-05-29 10:00",
                    "erep_protdev_desc": "visit late",
                    "erep_protdev_caplan": "reminder calls",
                    "erep_ae_date": "",
                    "erep_onset_date": "",
                    "erep_resolution_date": ""
                }
            }
        }]),
        &EventOptions::default(),
    )
    .expect("events");

    let window = ReportWindow::ending_at(at(5, 31, 0), 7).expect("window");
    let report = StudyReport::build(
        &snapshot,
        &events,
        &dictionary,
        window,
        &ReportConfig::default(),
    )
    .expect("report");

    assert_eq!(ints(&report.screening_funnel, "All Participants"), vec![
        Some(1),
        Some(1),
        Some(2),
        Some(4)
    ]);
    assert_eq!(ints(&report.decline_reasons, "Total Declined"), vec![Some(1), Some(1)]);
    assert_eq!(
        strs(&report.decline_comments, "Reason"),
        vec![Some("lives too far".to_string())]
    );
    assert_eq!(ints(&report.consent.table, "Consented"), vec![
        Some(1),
        Some(2),
        Some(3)
    ]);
    assert!(!is_placeholder(&report.status.pre_procedure));
    assert!(is_placeholder(&report.status.post_procedure));
    assert_eq!(ints(&report.deviations_by_center, "Total Deviations"), vec![
        Some(1),
        Some(0),
        Some(0),
        Some(1)
    ]);
    assert_eq!(strs(&report.recent_deviations, "PID"), vec![Some("1".to_string())]);
    assert_eq!(
        strs(&report.demographics.table, "Sex"),
        vec![
            Some("Male".to_string()),
            Some("Female".to_string()),
            Some("Female".to_string())
        ]
    );

    let titles: Vec<String> = report.tables().into_iter().map(|(t, _)| t).collect();
    assert_eq!(titles.first().map(String::as_str), Some("Screening"));
    assert!(titles.iter().any(|t| t == "Sex Distribution"));
}
