//! Snapshot export and import.
//!
//! Run with: `cargo test --test snapshot_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use tischplan::snapshot::parse_reservations_json;
use tischplan::{
    AllocationRequest, Config, PlanSnapshot, ReservationState, SeatingPlan, ShortfallPolicy,
    TableNumber,
};
use tischplan_core::environment::Clock;
use tischplan_testing::test_clock;

const EXPORT: &str = r#"{
    "tables": [
        [0, 70, "standing", null],
        [1, 14, "left", null],
        [2, 18, "left", "links"]
    ],
    "reservationsByTable": {
        "0": [],
        "1": [
            {"id": "a1", "bookingId": "003", "name": "Huber", "cards": 4, "notes": "",
             "ts": "2024-05-01T18:00:00.000Z", "sold": true}
        ],
        "2": []
    },
    "lastBookingSeq": 1
}"#;

#[test]
fn test_restore_recomputes_capacity_and_resyncs_sequence() {
    let now = test_clock().now();
    let mut plan = PlanSnapshot::from_json(EXPORT)
        .unwrap()
        .restore(ShortfallPolicy::Reject, now)
        .unwrap();

    let one = plan.ledger().get(TableNumber::new(1)).unwrap();
    assert_eq!((one.capacity, one.free_seats), (18, 14));
    let huber = &plan.reservations().bucket(TableNumber::new(1))[0];
    assert_eq!(huber.state, ReservationState::Sold);
    assert_eq!(huber.id.as_str(), "a1");
    assert_eq!(huber.timestamp.to_rfc3339(), "2024-05-01T18:00:00+00:00");
    assert_eq!(plan.sequencer().last(), 3);

    let next = plan
        .allocate(&AllocationRequest::new("Maier", 2).preferring(TableNumber::new(2)), now)
        .unwrap();
    assert_eq!(next.booking_id.as_str(), "004");
    plan.verify_conservation().unwrap();
}

#[test]
fn test_export_import_round_trip() {
    let now = test_clock().now();
    let mut plan = Config::default().build_plan().unwrap();
    plan.allocate(&AllocationRequest::new("Huber", 30).preferring(TableNumber::new(9)), now)
        .unwrap();
    plan.allocate(&AllocationRequest::new("Gruber", 5), now).unwrap();

    let json = plan.to_snapshot().to_json().unwrap();
    let restored =
        SeatingPlan::from_snapshot(PlanSnapshot::from_json(&json).unwrap(), plan.policy(), now)
            .unwrap();

    assert_eq!(restored, plan);
    assert_eq!(restored.to_snapshot().to_json().unwrap(), json);
}

#[test]
fn test_import_reservations_into_default_layout() {
    let now = test_clock().now();
    let mut plan = Config::default().build_plan().unwrap();
    plan.allocate(&AllocationRequest::new("Alt", 10), now).unwrap();

    let buckets = parse_reservations_json(
        r#"{
            "version": 1,
            "type": "reservations",
            "reservationsByTable": {
                "5": [
                    {"id": "x", "bookingId": "120", "name": "Huber", "cards": 6},
                    {"name": "Ohne Buchung", "cards": 2}
                ],
                "14": [{"bookingId": "121", "name": "Maier", "cards": 15, "inCart": true}],
                "notes": [{"name": "Ignored", "cards": 1}]
            }
        }"#,
    )
    .unwrap();
    plan.import_reservations(buckets, now).unwrap();

    assert_eq!(plan.reservations().len(), 3);
    assert_eq!(plan.ledger().get_free(TableNumber::new(5)), Some(10));
    let fourteen = plan.ledger().get(TableNumber::new(14)).unwrap();
    assert_eq!((fourteen.capacity, fourteen.free_seats), (15, 0));
    assert_eq!(plan.ledger().total_free(), plan.ledger().total_capacity() - 23);

    let assigned = &plan.reservations().bucket(TableNumber::new(5))[1];
    assert_eq!(assigned.booking_id.as_str(), "122");
    assert_eq!(plan.cart_entries().len(), 1);
    plan.verify_conservation().unwrap();
}
