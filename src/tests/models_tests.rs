use crate::models::{QueryLogStatus, ReportStatus};

#[test]
fn test_report_status_forward_transitions() {
    assert!(ReportStatus::Pending.can_transition_to(ReportStatus::Processing));
    assert!(ReportStatus::Processing.can_transition_to(ReportStatus::Completed));
    assert!(ReportStatus::Processing.can_transition_to(ReportStatus::Failed));
}

#[test]
fn test_report_status_never_moves_backward() {
    assert!(!ReportStatus::Processing.can_transition_to(ReportStatus::Pending));
    assert!(!ReportStatus::Completed.can_transition_to(ReportStatus::Pending));
    assert!(!ReportStatus::Completed.can_transition_to(ReportStatus::Processing));
    assert!(!ReportStatus::Failed.can_transition_to(ReportStatus::Pending));
    assert!(!ReportStatus::Failed.can_transition_to(ReportStatus::Processing));
}

#[test]
fn test_report_status_skips_are_rejected() {
    assert!(!ReportStatus::Pending.can_transition_to(ReportStatus::Completed));
    assert!(!ReportStatus::Pending.can_transition_to(ReportStatus::Failed));
}

#[test]
fn test_terminal_statuses_cannot_change() {
    for terminal in [ReportStatus::Completed, ReportStatus::Failed] {
        assert!(terminal.is_terminal());
        for next in [
            ReportStatus::Pending,
            ReportStatus::Processing,
            ReportStatus::Completed,
            ReportStatus::Failed,
        ] {
            assert!(!terminal.can_transition_to(next));
        }
    }
}

#[test]
fn test_report_status_string_roundtrip() {
    for status in [
        ReportStatus::Pending,
        ReportStatus::Processing,
        ReportStatus::Completed,
        ReportStatus::Failed,
    ] {
        let parsed: ReportStatus = status.to_string().try_into().unwrap();
        assert_eq!(parsed, status);
    }
}

#[test]
fn test_report_status_rejects_unknown_values() {
    let result: Result<ReportStatus, _> = "queued".to_string().try_into();
    assert!(result.is_err());
}

#[test]
fn test_query_log_status_string_roundtrip() {
    for status in [
        QueryLogStatus::Pending,
        QueryLogStatus::Completed,
        QueryLogStatus::Failed,
    ] {
        let parsed: QueryLogStatus = status.to_string().try_into().unwrap();
        assert_eq!(parsed, status);
    }
}
