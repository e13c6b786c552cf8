use bizdiag_config::VerticalConfig;
use bizdiag_ingest::{profile_table, read_csv_str};
use bizdiag_llm::{CollaboratorError, DisabledCollaborator, ScriptedCollaborator};
use bizdiag_map::{
    ConfidenceLevel, ConfidenceThresholds, FieldMapper, MAPPING_TASK, count_by_level,
};
use bizdiag_model::{PackType, Transform};

const RESTAURANT: &str = include_str!("../../../verticals/restaurant.json");

fn config() -> VerticalConfig {
    VerticalConfig::from_json_str(RESTAURANT).unwrap()
}

const PNL_CSV: &str = "\
Month,Net Sales,Food Cost,Payroll,Rent,Notes
2024-01,\"$42,000\",13100,12800,4000,slow start
2024-02,40500,12900,12500,4000,
2024-03,45800,14100,13200,4000,patio opened
";

const REVENUE_CSV: &str = "\
Business Date,Takings,Guests
2024-01-03,412.50,31
2024-01-04,388.00,27
2024-02-01,455.25,35
";

#[test]
fn restaurant_pnl_maps_by_synonym() {
    let config = config();
    let pack = config.pack(PackType::Pnl).unwrap();
    let table = read_csv_str("pnl.csv", PNL_CSV).unwrap();
    let profile = profile_table(&table);

    let result = FieldMapper::new(pack).suggest(&profile);

    for (field, column) in [
        ("month", "Month"),
        ("revenue", "Net Sales"),
        ("cogs", "Food Cost"),
        ("labor", "Payroll"),
        ("rent", "Rent"),
    ] {
        let mapping = result
            .mapping_for(field)
            .unwrap_or_else(|| panic!("{field} should be mapped"));
        assert_eq!(mapping.source_columns, vec![column.to_string()]);
        assert!(mapping.confirmed, "{field} should be auto-confirmed");
    }
    assert_eq!(result.mapping_for("month").unwrap().transform, Transform::ParseMonth);
    assert_eq!(result.unmapped_columns, vec!["Notes".to_string()]);
    assert_eq!(result.required_gaps().count(), 0);
    assert!(result.gaps.iter().any(|gap| gap.canonical_field == "utilities"));

    let levels = count_by_level(&result, &ConfidenceThresholds::default());
    assert_eq!(levels.get(&ConfidenceLevel::High), Some(&5));
}

#[test]
fn missing_required_field_is_a_gap_not_an_error() {
    let config = config();
    let pack = config.pack(PackType::Labor).unwrap();
    let table = read_csv_str(
        "labor.csv",
        "Start Date,End Date,Hours\n2024-01-01,2024-01-14,310\n2024-01-15,2024-01-28,295\n",
    )
    .unwrap();
    let result = FieldMapper::new(pack).suggest(&profile_table(&table));

    assert!(result.mapping_for("pay_period_start").is_some());
    assert!(result.mapping_for("pay_period_end").is_some());
    assert!(result.mapping_for("labor_hours").is_some());
    let required: Vec<_> = result
        .required_gaps()
        .map(|gap| gap.canonical_field.as_str())
        .collect();
    assert_eq!(required, vec!["labor"]);
}

#[test]
fn collaborator_advice_overrides_heuristic_score() {
    let config = config();
    let pack = config.pack(PackType::Revenue).unwrap();
    let table = read_csv_str("revenue.csv", REVENUE_CSV).unwrap();
    let profile = profile_table(&table);

    let collaborator = ScriptedCollaborator::new().with_response(
        MAPPING_TASK,
        r#"```json
{"mappings": [{"canonical_field": "revenue", "source_columns": ["Takings"], "confidence": 0.9, "reasoning": "daily takings are sales"}]}
```"#,
    );
    let assisted = FieldMapper::new(pack).suggest_assisted(&profile, &collaborator);

    assert!(assisted.advice_error.is_none());
    let revenue = assisted.result.mapping_for("revenue").unwrap();
    assert_eq!(revenue.source_columns, vec!["Takings".to_string()]);
    assert!((revenue.confidence - 0.9).abs() < 1e-6);
    assert!(!revenue.confirmed);
    assert_eq!(
        assisted.result.mapping_for("transaction_date").unwrap().source_columns,
        vec!["Business Date".to_string()]
    );

    // Only metadata leaves the process.
    let requests = collaborator.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].prompt.contains("Takings"));
    assert!(!requests[0].prompt.contains("412.5"));
    assert!(!requests[0].prompt.contains("2024-01-03"));
}

#[test]
fn invalid_advice_falls_back_to_heuristics() {
    let config = config();
    let pack = config.pack(PackType::Revenue).unwrap();
    let profile = profile_table(&read_csv_str("revenue.csv", REVENUE_CSV).unwrap());
    let mapper = FieldMapper::new(pack);

    let collaborator = ScriptedCollaborator::new().with_response(
        MAPPING_TASK,
        r#"{"mappings": [{"canonical_field": "revenue", "source_columns": ["Till"], "confidence": 1.5}]}"#,
    );
    let assisted = mapper.suggest_assisted(&profile, &collaborator);
    match assisted.advice_error {
        Some(CollaboratorError::SchemaViolation { problems }) => assert_eq!(problems.len(), 2),
        other => panic!("expected schema violation, got {other:?}"),
    }
    assert_eq!(assisted.result, mapper.suggest(&profile));

    let offline = mapper.suggest_assisted(&profile, &DisabledCollaborator);
    assert_eq!(offline.advice_error, Some(CollaboratorError::Disabled));
    assert_eq!(offline.result, mapper.suggest(&profile));
}

proptest::proptest! {
    #[test]
    fn each_column_feeds_at_most_one_field(
        headers in proptest::sample::subsequence(
            vec![
                "Month", "Net Sales", "Food Cost", "Payroll", "Rent", "Notes", "Sales",
                "Period", "Total", "Labor $", "COGS", "Guests",
            ],
            1..9,
        )
    ) {
        let config = config();
        let pack = config.pack(PackType::Pnl).unwrap();
        let values: Vec<String> = (0..headers.len()).map(|index| (100 + index).to_string()).collect();
        let csv = format!("{}\n{}\n{}\n", headers.join(","), values.join(","), values.join(","));
        let table = read_csv_str("generated.csv", &csv).unwrap();

        let result = FieldMapper::new(pack).suggest(&profile_table(&table));

        let mut used = std::collections::BTreeSet::new();
        for mapping in &result.mappings {
            proptest::prop_assert!((0.0..=1.0).contains(&mapping.confidence));
            for column in &mapping.source_columns {
                proptest::prop_assert!(used.insert(column.clone()), "`{}` used twice", column);
            }
        }
        for column in &result.unmapped_columns {
            proptest::prop_assert!(!used.contains(column));
        }
    }
}
