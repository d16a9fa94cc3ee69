use planning_core::{
    apply_edits, build_bridge, merge_updates, parse_raw_rows, resolve_grouping_level, synchronize,
    Action, FilterSelection, Level, ReportingWindow, Selection, Team, TeamEdit, TeamField,
    TeamInputs,
};
use planning_test_utils::{
    default_rollup, pinned, setup_store, sku_row, sku_selection, synced_row,
};
use pretty_assertions::assert_eq;

#[test]
fn two_rows_in_same_depot_sum_into_october() {
    let rows = vec![
        sku_row("1", "SKU-1", "2024-10-05", 100.0),
        sku_row("2", "SKU-2", "2024-10-18", 50.0),
    ];
    let selection = pinned(["North", "C1", "", "", ""], 2);
    let rollup = default_rollup(&rows, &selection);

    assert_eq!(rollup.level, Level::Depot);
    assert_eq!(rollup.len(), 1);
    assert_eq!(rollup.get("Depot-5").unwrap().baseline("Oct"), 150.0);
}

#[test]
fn grouping_level_follows_first_open_selection() {
    let all = FilterSelection::new().with(Level::Channel, "All");
    assert_eq!(resolve_grouping_level(&all), Level::Channel);

    let north = FilterSelection::new()
        .with(Level::Channel, "North")
        .with(Level::Chain, "All");
    assert_eq!(resolve_grouping_level(&north), Level::Chain);
}

#[test]
fn manual_edits_layer_onto_baseline() {
    let rows = vec![
        sku_row("1", "SKU-9", "2024-10-02", 120.0),
        sku_row("2", "SKU-9", "2024-10-20", 80.0),
    ];
    let rollup = default_rollup(&rows, &sku_selection());
    assert_eq!(rollup.get("SKU-9").unwrap().baseline("Oct"), 200.0);

    let (mut inputs, mut consensus) = synchronize(&rollup, &TeamInputs::new());
    apply_edits(
        &mut inputs,
        &mut consensus,
        &rollup,
        &[
            TeamEdit::value("SKU-9", Team::Sales, "Oct", "20"),
            TeamEdit::value("SKU-9", Team::Marketing, "Oct", "-5"),
            TeamEdit::value("SKU-9", Team::Finance, "Oct", ""),
        ],
    );
    assert_eq!(consensus.get("SKU-9", "Oct"), Some(215.0));
}

#[test]
fn upstream_consensus_with_sales_metadata_drives_delta() {
    let mut rows = vec![sku_row("K1", "SKU-1", "2024-10-07", 200.0)];
    let updates = parse_raw_rows(
        r#"[{"id":"K1","Consensus":230,"salesInput":{"comment":"retailer promo","owner":"ana"}}]"#,
    )
    .unwrap();
    assert_eq!(merge_updates(&mut rows, &updates).matched, 1);

    let rollup = default_rollup(&rows, &sku_selection());
    let (inputs, consensus) = synchronize(&rollup, &TeamInputs::new());

    let sales = inputs.get("SKU-1", Team::Sales, "Oct").unwrap();
    assert_eq!(sales.value, "30");
    assert_eq!(sales.comment, "retailer promo");
    assert_eq!(sales.owner, "ana");
    assert_eq!(inputs.team_delta("SKU-1", Team::Sales, "Oct"), 30.0);
    assert_eq!(consensus.get("SKU-1", "Oct"), Some(230.0));
}

#[test]
fn november_bridge_across_two_groups() {
    let rows = vec![
        sku_row("1", "SKU-1", "2024-11-04", 100.0),
        sku_row("2", "SKU-2", "2024-11-21", 50.0),
    ];
    let window = ReportingWindow::default();
    let rollup = default_rollup(&rows, &sku_selection());

    let mut inputs = TeamInputs::new();
    inputs.apply(&TeamEdit::value("SKU-1", Team::Sales, "Nov", "10"));

    let bridge = build_bridge(&rollup, &inputs, &window);
    let nov = bridge.iter().find(|b| b.period == "Nov").unwrap();
    assert_eq!(nov.baseline, 150.0);
    assert_eq!(nov.team(Team::Sales), 10.0);
    assert_eq!(nov.final_total, 160.0);
}

#[test]
fn store_runs_upstream_update_end_to_end() {
    let mut store = setup_store();
    store.dispatch(Action::Load(vec![
        sku_row("K1", "SKU-1", "2024-10-07", 200.0),
        sku_row("K2", "SKU-2", "2024-10-07", 40.0),
    ]));
    store.dispatch(Action::SetFilters(sku_selection()));
    store.dispatch(Action::Edit(TeamEdit::value("SKU-2", Team::Finance, "Oct", "4")));

    let updates = parse_raw_rows(
        r#"[{"id":"K1","Consensus":230,"salesInput":{"owner":"ana"}},{"id":"K404","Forecast":1}]"#,
    )
    .unwrap();
    let snapshot = store.dispatch(Action::ApplyUpdates(updates));

    assert_eq!(snapshot.consensus.get("SKU-1", "Oct"), Some(230.0));
    assert_eq!(snapshot.consensus.get("SKU-2", "Oct"), Some(44.0));
    let oct = &snapshot.bridge[0];
    assert_eq!(oct.baseline, 240.0);
    assert_eq!(oct.team(Team::Sales), 30.0);
    assert_eq!(oct.team(Team::Finance), 4.0);
    assert_eq!(oct.final_total, 274.0);
}

#[test]
fn empty_selection_result_is_well_typed() {
    let mut store = setup_store();
    store.dispatch(Action::Load(vec![sku_row("1", "SKU-1", "2024-10-01", 1.0)]));
    let snapshot = store.dispatch(Action::Select(Level::Channel, Selection::is("Nowhere")));

    assert!(snapshot.rollup.is_empty());
    assert!(snapshot.consensus.is_empty());
    assert_eq!(snapshot.bridge.len(), 3);
    assert!(snapshot.bridge.iter().all(|b| b.final_total == 0.0));
}

#[test]
fn annotated_upstream_delta_does_not_outlive_correction() {
    let mut store = setup_store();
    store.dispatch(Action::Load(vec![synced_row("K1", "SKU-1", "2024-10-07", 200.0, 230.0)]));
    store.dispatch(Action::SetFilters(sku_selection()));

    let snapshot = store.dispatch(Action::Edit(TeamEdit::field(
        "SKU-1",
        Team::Sales,
        "Oct",
        TeamField::Comment,
        "why",
    )));
    assert_eq!(snapshot.consensus.get("SKU-1", "Oct"), Some(230.0));

    let snapshot = store.dispatch(Action::Load(vec![sku_row("K1", "SKU-1", "2024-10-07", 200.0)]));
    assert_eq!(snapshot.consensus.get("SKU-1", "Oct"), Some(200.0));
    assert_eq!(snapshot.inputs.get("SKU-1", Team::Sales, "Oct"), None);
    assert_eq!(snapshot.bridge[0].final_total, 200.0);
}
