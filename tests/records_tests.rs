/// Integration tests for customer intake: CSV parsing/serialization and the
/// manual-entry form, exercised through the public crate API.
use custpulse::analytics::histogram;
use custpulse::error::{ParseError, ValidationError};
use custpulse::records::csv::{parse_csv, to_csv};
use custpulse::records::{Column, CustomerDraft, CustomerRecord, ManualEntryForm};

fn full_record(id: &str, n: f64) -> CustomerRecord {
    CustomerRecord {
        customer_id: id.to_string(),
        age: Some(20.0 + n),
        gender: Some("Female".to_string()),
        last_purchase_date: Some("2024-03-01".to_string()),
        total_purchase_amount: Some(99.5 * n),
        visit_frequency: Some(n),
        last_active_date: Some("2024-04-15".to_string()),
        pages_visited: Some(10.0 * n),
        email_opens: Some(3.0),
        product_preferences: Some("shoes".to_string()),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

#[test]
fn csv_round_trip_preserves_records() {
    let records = vec![
        full_record("CUST1", 1.0),
        full_record("CUST2", 2.0),
        CustomerRecord::new("CUST3"),
        CustomerRecord {
            visit_frequency: Some(0.25),
            ..CustomerRecord::new("CUST4")
        },
    ];

    let text = to_csv(&records);
    let parsed = parse_csv(&text).expect("serialized CSV must parse");
    assert_eq!(parsed, records);
}

#[test]
fn csv_headers_are_case_insensitive_and_order_free() {
    let text = "PRODUCT PREFERENCES,customer id,Total Purchase Amount\n\
                electronics,C1,250\n\
                ,C2,\n";
    let records = parse_csv(text).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].product_preferences.as_deref(), Some("electronics"));
    assert_eq!(records[0].total_purchase_amount, Some(250.0));
    assert_eq!(records[1].total_purchase_amount, None);
    assert_eq!(records[1].product_preferences, None);
}

#[test]
fn unknown_header_is_named_never_dropped() {
    let err = parse_csv("Customer ID,Loyalty Tier\nC1,gold\n").unwrap_err();
    match &err {
        ParseError::UnknownHeader { header, expected } => {
            assert_eq!(header, "loyalty tier");
            assert!(expected.contains("customer id"));
            assert!(expected.contains("product preferences"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("loyalty tier"));
}

#[test]
fn column_count_mismatch_reports_row() {
    let err = parse_csv("Customer ID,Age\nC1,30\nC2,40,extra\n").unwrap_err();
    assert!(matches!(
        err,
        ParseError::ColumnCount {
            row: 2,
            expected: 2,
            actual: 3
        }
    ));
}

#[test]
fn non_numeric_csv_cell_is_absent_not_zero() {
    let records = parse_csv("Customer ID,Age,Email Opens\nC1,unknown,0\n").unwrap();
    assert_eq!(records[0].age, None);
    assert_eq!(records[0].email_opens, Some(0.0));
}

#[test]
fn parsed_values_feed_the_histogram() {
    let records = parse_csv("Customer ID,Visit Frequency\nA,1\nB,\nC,4\nD,x\nE,4\n").unwrap();
    let sample: Vec<Option<f64>> = records
        .iter()
        .map(|r| r.number(Column::VisitFrequency))
        .collect();
    let bins = histogram::bin(&sample, histogram::DEFAULT_BINS);
    let total: usize = bins.iter().map(|b| b.count).sum();
    assert_eq!(total, 3);
}

// ---------------------------------------------------------------------------
// Manual entry
// ---------------------------------------------------------------------------

#[test]
fn inline_entry_commits_typed_record() {
    let draft = CustomerDraft::parse_inline(
        "Customer ID=M1; age=52; Product Preferences=books, garden; totalPurchaseAmount=",
    )
    .unwrap();
    let record = draft.commit().unwrap();
    assert_eq!(record.customer_id, "M1");
    assert_eq!(record.age, Some(52.0));
    assert_eq!(record.product_preferences.as_deref(), Some("books, garden"));
    assert_eq!(record.total_purchase_amount, None);
}

#[test]
fn inline_entry_rejects_unknown_field() {
    assert_eq!(
        CustomerDraft::parse_inline("customerId=M1;shoeSize=9"),
        Err(ValidationError::UnknownField("shoeSize".to_string()))
    );
}

#[test]
fn form_resets_on_success_and_keeps_values_on_failure() {
    let mut form = ManualEntryForm::new(CustomerDraft {
        customer_id: "  ".to_string(),
        gender: "Male".to_string(),
        ..CustomerDraft::default()
    });

    assert_eq!(form.submit(), Err(ValidationError::MissingCustomerId));
    assert_eq!(form.draft.gender, "Male");
    assert!(form.error.is_some());

    form.draft.customer_id = "M2".to_string();
    let record = form.submit().unwrap();
    assert_eq!(record.gender.as_deref(), Some("Male"));
    assert_eq!(form.draft, CustomerDraft::default());
    assert!(form.error.is_none());
}
