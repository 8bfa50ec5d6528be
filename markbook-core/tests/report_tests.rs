use markbook_core::report::{Averages, NO_SUBJECTS};
use markbook_core::{summarize, Ledger, Report, Subject};

fn subject(name: &str, credits: f64, got: f64, max: f64) -> Subject {
    Subject {
        got,
        max,
        ..Subject::new(name, credits)
    }
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn empty_ledger_renders_sentinel_only() {
    let report = summarize(&Ledger::new());
    assert_eq!(report, Report::Empty);
    assert_eq!(report.averages(), None);
    assert_eq!(report.render(), NO_SUBJECTS);
    assert_eq!(report.render(), "No subjects yet.");
}

#[test]
fn averages_are_credit_weighted() {
    let ledger = Ledger::from_subjects(vec![
        subject("A", 4.0, 8.0, 10.0),
        subject("B", 2.0, 5.0, 10.0),
    ]);
    let Averages { mark, ceiling, total_credits } =
        summarize(&ledger).averages().expect("averages");

    // (8*4 + 5*2) / (4 + 2)
    assert!(close(mark, 42.0 / 6.0));
    assert!(close(ceiling, 10.0));
    assert!(close(total_credits, 6.0));
}

#[test]
fn zero_credits_omit_summary_block() {
    let ledger = Ledger::from_subjects(vec![subject("Gym", 0.0, 3.0, 4.0)]);
    let report = summarize(&ledger);
    assert_eq!(report.averages(), None);

    let text = report.render();
    assert!(text.contains("Gym — got 3/4 (75.00%), credits: 0"));
    assert!(!text.contains("Your mark"));
    assert!(!text.contains("NaN"));
}

#[test]
fn ungraded_subject_shows_zero_percent() {
    let ledger = Ledger::from_subjects(vec![subject("Chem", 3.0, 0.0, 0.0)]);
    let Report::Populated { rows, .. } = summarize(&ledger) else {
        panic!("expected populated report");
    };
    assert_eq!(rows[0].percent, 0.0);
}

#[test]
fn render_matches_results_table_layout() {
    let ledger = Ledger::from_subjects(vec![
        subject("Math", 4.0, 7.5, 10.0),
        subject("Physics", 2.0, 5.0, 10.0),
    ]);
    let expected = "📊 *YOUR RESULTS:*\n\n\
                    Math — got 7.5/10 (75.00%), credits: 4\n\
                    Physics — got 5/10 (50.00%), credits: 2\n\
                    \nYour mark: 6.67 / 20\nMax possible: 10.00 / 20";
    assert_eq!(summarize(&ledger).render(), expected);
}

#[test]
fn display_order_follows_ledger_order() {
    let ledger = Ledger::from_subjects(vec![
        subject("Zoology", 1.0, 1.0, 2.0),
        subject("Art", 1.0, 1.0, 2.0),
    ]);
    let text = summarize(&ledger).render();
    let z = text.find("Zoology").unwrap();
    let a = text.find("Art").unwrap();
    assert!(z < a);
}
