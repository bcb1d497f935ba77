//! Early-termination cohorts.

mod common;

use common::{at, column_names, dictionary, number, participant, site, strs, text};
use redcap_model::{CellValue, DisplayDictionary};
use redcap_report::{NO_RECORDS_MARKER, ReportConfig, is_placeholder, termination_status};

#[test]
fn splits_terminations_by_procedure() {
    let participants = vec![
        participant(
            11,
            &[
                site("Utah"),
                ("date_and_time", CellValue::DateTime(at(1, 5, 10))),
                ("ewdateterm", CellValue::DateTime(at(2, 1, 0))),
                ("ewprimaryreason", number(1.0)),
                ("ewcomments", text("moved away")),
            ],
        ),
        participant(
            12,
            &[
                site("Texas"),
                ("date_and_time", CellValue::DateTime(at(1, 6, 10))),
                ("ewdateterm", CellValue::DateTime(at(3, 2, 0))),
                ("ewprimaryreason", number(2.0)),
                ("sp_surg_date", text("2024-02-20")),
            ],
        ),
        participant(13, &[site("Utah")]),
    ];
    let tables = termination_status(&participants, &dictionary(), &ReportConfig::default()).unwrap();

    let pre = &tables.pre_procedure;
    assert_eq!(
        column_names(pre),
        vec![
            "Center Name",
            "Record ID",
            "Consent Date",
            "Early Termination Date",
            "Reason",
            "Comments"
        ]
    );
    assert_eq!(strs(pre, "Record ID"), vec![Some("11".to_string())]);
    assert_eq!(strs(pre, "Consent Date"), vec![Some("2024-01-05".to_string())]);
    assert_eq!(strs(pre, "Reason"), vec![Some("Withdrew consent".to_string())]);
    assert_eq!(strs(pre, "Comments"), vec![Some("moved away".to_string())]);

    let post = &tables.post_procedure;
    assert_eq!(column_names(post).last().map(String::as_str), Some("Procedure Date"));
    assert_eq!(strs(post, "Center Name"), vec![Some("Texas".to_string())]);
    assert_eq!(strs(post, "Procedure Date"), vec![Some("2024-02-20".to_string())]);
    assert_eq!(strs(post, "Reason"), vec![Some("Lost to follow-up".to_string())]);
    assert_eq!(strs(post, "Comments"), vec![None]);
}

#[test]
fn empty_cohort_is_a_placeholder() {
    let participants = vec![participant(
        1,
        &[
            site("Utah"),
            ("ewdateterm", CellValue::DateTime(at(2, 1, 0))),
        ],
    )];
    let tables = termination_status(&participants, &dictionary(), &ReportConfig::default()).unwrap();
    assert!(!is_placeholder(&tables.pre_procedure));
    assert!(is_placeholder(&tables.post_procedure));
    assert_eq!(column_names(&tables.post_procedure), vec![NO_RECORDS_MARKER]);
    assert_eq!(tables.post_procedure.height(), 0);
}

#[test]
fn reason_without_terms_renders_raw_value() {
    let participants = vec![participant(
        1,
        &[
            ("ewdateterm", CellValue::DateTime(at(2, 1, 0))),
            ("ewprimaryreason", number(4.0)),
        ],
    )];
    let tables =
        termination_status(&participants, &DisplayDictionary::default(), &ReportConfig::default())
            .unwrap();
    assert_eq!(strs(&tables.pre_procedure, "Reason"), vec![Some("4".to_string())]);
    assert_eq!(strs(&tables.pre_procedure, "Center Name"), vec![None]);
}
