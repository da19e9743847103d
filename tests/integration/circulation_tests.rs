//! End-to-end circulation flows

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use tokio_test::{assert_err, assert_ok};

use elidune_circulation::{
    error::AppError,
    models::{
        CheckinParams, CheckoutParams, CirculationAction, ItemStatus, LibrarySchedule, LoanState,
        RequestParams,
    },
    CirculationReport,
};

use crate::common::*;

fn checkin_at(location: i32) -> CheckinParams {
    CheckinParams {
        transaction_location_id: location,
    }
}

fn checkout_by(patron_id: i32, location: i32) -> CheckoutParams {
    CheckoutParams {
        patron_id,
        transaction_location_id: location,
        ..Default::default()
    }
}

fn request_by(patron_id: i32, pickup: i32) -> RequestParams {
    RequestParams {
        patron_id,
        transaction_location_id: pickup,
        pickup_location_id: Some(pickup),
    }
}

fn logged(report: &CirculationReport) -> Vec<(CirculationAction, LoanState)> {
    report
        .actions
        .iter()
        .map(|e| (e.action, e.loan.state))
        .collect()
}

#[tokio::test]
async fn test_checkin_of_free_item_at_home_does_nothing() {
    let f = fixture().await;

    for _ in 0..3 {
        let result = f.service.checkin(ITEM, checkin_at(HOME)).await;
        assert!(matches!(result, Err(AppError::NoActionPerformed(_))));
    }

    let item = f.item().await;
    assert_eq!(item.status, ItemStatus::OnShelf);
    assert_eq!(item.version, 0);
    assert!(f.store.loan_history(ITEM).await.is_empty());
    assert!(f.store.reindexed().await.is_empty());
}

#[tokio::test]
async fn test_checkin_away_puts_free_item_in_transit() {
    let f = fixture().await;

    let report = assert_ok!(f.service.checkin(ITEM, checkin_at(BRANCH)).await);
    assert_eq!(report.item.status, ItemStatus::InTransit);
    assert!(report.actions.is_empty());

    // Arriving home closes the informational transit
    let report = assert_ok!(f.service.checkin(ITEM, checkin_at(HOME_DESK)).await);
    assert_eq!(report.item.status, ItemStatus::OnShelf);
    assert_eq!(f.store.reindexed().await, vec![ITEM, ITEM]);
}

#[tokio::test]
async fn test_request_then_checkin_at_pickup_library_puts_item_at_desk() {
    let f = fixture().await;

    let report = assert_ok!(f.service.request(ITEM, request_by(7, HOME_DESK)).await);
    assert_eq!(logged(&report), vec![(CirculationAction::Request, LoanState::Pending)]);
    assert_eq!(report.item.status, ItemStatus::OnShelf);

    let report = assert_ok!(f.service.checkin(ITEM, checkin_at(HOME)).await);
    assert_eq!(
        logged(&report),
        vec![(CirculationAction::Validate, LoanState::ItemAtDesk)]
    );
    assert_eq!(report.item.status, ItemStatus::AtDesk);
    assert!(report.cascade_failures.is_empty());
    f.assert_consistent().await;

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["item"]["status"], "at_desk");
    assert_eq!(json["actions"][0]["action"], "validate");
    assert_eq!(json["actions"][0]["loan"]["state"], "ITEM_AT_DESK");
}

#[tokio::test]
async fn test_transit_home_rerouted_to_other_pickup() {
    let f = fixture().await;
    let returning = f.seed(5, LoanState::ItemInTransitToHouse, HOME_DESK, 120).await;
    let waiting = f.seed(8, LoanState::Pending, BRANCH, 60).await;

    let report = assert_ok!(f.service.checkin(ITEM, checkin_at(HOME)).await);
    assert_eq!(
        logged(&report),
        vec![
            (CirculationAction::Cancel, LoanState::Cancelled),
            (CirculationAction::Validate, LoanState::ItemInTransitForPickup),
        ]
    );
    assert_eq!(f.loan(&returning).await.state, LoanState::Cancelled);
    assert_eq!(
        f.loan(&waiting).await.state,
        LoanState::ItemInTransitForPickup
    );
    assert_eq!(report.item.status, ItemStatus::InTransit);
    f.assert_consistent().await;
}

#[tokio::test]
async fn test_transit_home_received_for_home_pickup() {
    let f = fixture().await;
    let returning = f.seed(5, LoanState::ItemInTransitToHouse, BRANCH, 120).await;
    let waiting = f.seed(8, LoanState::Pending, HOME_DESK, 60).await;

    // Passing through the branch changes nothing
    let result = f.service.checkin(ITEM, checkin_at(BRANCH)).await;
    assert!(matches!(result, Err(AppError::NoActionPerformed(_))));

    let report = assert_ok!(f.service.checkin(ITEM, checkin_at(HOME)).await);
    assert_eq!(
        logged(&report),
        vec![
            (CirculationAction::Receive, LoanState::ItemReturned),
            (CirculationAction::Validate, LoanState::ItemAtDesk),
        ]
    );
    assert_eq!(f.loan(&returning).await.state, LoanState::ItemReturned);
    assert_eq!(f.loan(&waiting).await.state, LoanState::ItemAtDesk);
}

#[tokio::test]
async fn test_at_desk_patron_checks_out() {
    let f = fixture().await;
    let desk = f.seed(7, LoanState::ItemAtDesk, HOME_DESK, 30).await;

    let report = assert_ok!(f.service.checkout(ITEM, checkout_by(7, HOME_DESK)).await);
    assert_eq!(
        logged(&report),
        vec![(CirculationAction::Checkout, LoanState::ItemOnLoan)]
    );
    let loan = f.loan(&desk).await;
    assert_eq!(loan.state, LoanState::ItemOnLoan);
    assert!(loan.end_date.is_some());
    assert_eq!(report.item.status, ItemStatus::OnLoan);
}

#[tokio::test]
async fn test_extend_with_waiting_request_is_denied() {
    let f = fixture().await;
    let on_loan = f.seed(5, LoanState::ItemOnLoan, HOME, 120).await;
    f.seed(8, LoanState::Pending, BRANCH, 60).await;

    for loan_id in [None, Some(on_loan.id)] {
        let result = f.service.extend(ITEM, loan_id).await;
        assert!(matches!(result, Err(AppError::ActionDenied(_))));
    }
    assert_eq!(f.loan(&on_loan).await, on_loan);
    assert_eq!(f.item().await.version, 0);
}

#[tokio::test]
async fn test_checkout_due_at_end_of_calendar_keeps_requested_date() {
    let f = fixture().await;
    let last = DateTime::<Utc>::MAX_UTC;
    let next_weekday = (last.weekday().num_days_from_monday() as i16 + 1) % 7;
    f.store
        .set_schedule(LibrarySchedule::new(1).open_on(
            &[next_weekday],
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        ))
        .await;

    let params = CheckoutParams {
        end_date: Some(last),
        ..checkout_by(5, HOME)
    };
    let report = assert_ok!(f.service.checkout(ITEM, params).await);
    assert_eq!(report.actions[0].loan.end_date, Some(last));
    assert_eq!(report.item.status, ItemStatus::OnLoan);
}

#[tokio::test]
async fn test_extend_up_to_the_limit() {
    let f = fixture().await;
    let checkout = assert_ok!(f.service.checkout(ITEM, checkout_by(5, HOME)).await);
    let loan = checkout.actions[0].loan.clone();

    let first = assert_ok!(f.service.extend(ITEM, None).await);
    let second = assert_ok!(f.service.extend(ITEM, Some(loan.id)).await);
    assert_eq!(second.actions[0].loan.extension_count, 2);
    assert!(second.actions[0].loan.end_date > first.actions[0].loan.end_date);
    assert!(first.actions[0].loan.end_date > loan.end_date);

    let err = assert_err!(f.service.extend(ITEM, None).await);
    assert!(err.to_string().contains("maximum"));
    assert_eq!(f.loan(&loan).await.state, LoanState::ItemOnLoan);
}

#[tokio::test]
async fn test_cancel_of_checked_out_loan_is_denied() {
    let f = fixture().await;
    let on_loan = f.seed(5, LoanState::ItemOnLoan, HOME, 120).await;

    let result = f.service.cancel_request(ITEM, on_loan.id).await;
    assert!(matches!(result, Err(AppError::ActionDenied(_))));

    f.seed(8, LoanState::Pending, BRANCH, 60).await;
    let result = f.service.cancel_request(ITEM, on_loan.id).await;
    assert!(matches!(result, Err(AppError::ActionDenied(_))));
    assert_eq!(f.loan(&on_loan).await.state, LoanState::ItemOnLoan);
}

#[tokio::test]
async fn test_checkin_away_with_queue_hands_item_to_next_patron() {
    let f = fixture().await;
    assert_ok!(f.service.checkout(ITEM, checkout_by(5, HOME)).await);
    assert_ok!(f.service.request(ITEM, request_by(7, BRANCH)).await);

    let report = assert_ok!(f.service.checkin(ITEM, checkin_at(BRANCH)).await);
    assert_eq!(
        logged(&report),
        vec![
            (CirculationAction::Checkin, LoanState::ItemInTransitToHouse),
            (CirculationAction::Cancel, LoanState::Cancelled),
            (CirculationAction::Validate, LoanState::ItemAtDesk),
        ]
    );
    assert_eq!(f.loans_of(5).await[0].state, LoanState::Cancelled);
    assert_eq!(f.loans_of(7).await[0].state, LoanState::ItemAtDesk);
    assert_eq!(report.item.status, ItemStatus::AtDesk);
    f.assert_consistent().await;
}

#[tokio::test]
async fn test_full_journey_keeps_one_holding_loan() {
    let f = fixture().await;

    assert_ok!(f.service.checkout(ITEM, checkout_by(5, HOME)).await);
    f.assert_consistent().await;
    assert_ok!(f.service.request(ITEM, request_by(7, BRANCH)).await);
    f.assert_consistent().await;

    // Returned at home, the request leaves for the branch
    let report = assert_ok!(f.service.checkin(ITEM, checkin_at(HOME)).await);
    assert_eq!(
        logged(&report),
        vec![
            (CirculationAction::Checkin, LoanState::ItemReturned),
            (CirculationAction::Validate, LoanState::ItemInTransitForPickup),
        ]
    );
    f.assert_consistent().await;

    let report = assert_ok!(f.service.checkin(ITEM, checkin_at(BRANCH)).await);
    assert_eq!(
        logged(&report),
        vec![(CirculationAction::Receive, LoanState::ItemAtDesk)]
    );
    f.assert_consistent().await;

    assert_ok!(f.service.checkout(ITEM, checkout_by(7, BRANCH)).await);
    f.assert_consistent().await;

    let report = assert_ok!(f.service.checkin(ITEM, checkin_at(BRANCH)).await);
    assert_eq!(report.item.status, ItemStatus::InTransit);
    f.assert_consistent().await;

    let report = assert_ok!(f.service.checkin(ITEM, checkin_at(HOME)).await);
    assert_eq!(
        logged(&report),
        vec![(CirculationAction::Receive, LoanState::ItemReturned)]
    );
    assert_eq!(report.item.status, ItemStatus::OnShelf);
    assert!(f
        .store
        .loan_history(ITEM)
        .await
        .iter()
        .all(|l| l.state.is_terminal()));
}

#[tokio::test]
async fn test_mixed_actions_never_break_the_holding_invariant() {
    let f = fixture().await;
    let locations = [HOME, HOME_DESK, BRANCH, REMOTE];
    let mut applied = 0;

    for round in 0..24usize {
        let location = locations[round % locations.len()];
        let patron = 100 + (round % 3) as i32;
        let pickup = if round % 2 == 0 { BRANCH } else { REMOTE };
        let result = match round % 5 {
            0 => f.service.request(ITEM, request_by(patron, pickup)).await,
            1 => f.service.checkin(ITEM, checkin_at(location)).await,
            2 => f.service.checkout(ITEM, checkout_by(patron, location)).await,
            3 => {
                let pending = f
                    .store
                    .loan_history(ITEM)
                    .await
                    .into_iter()
                    .find(|l| l.state == LoanState::Pending);
                match pending {
                    Some(loan) => f.service.cancel_request(ITEM, loan.id).await,
                    None => f.service.extend(ITEM, None).await,
                }
            }
            _ => f.service.checkin(ITEM, checkin_at(HOME)).await,
        };
        match result {
            Ok(_) => applied += 1,
            Err(e) => assert!(
                matches!(
                    e,
                    AppError::NoActionPerformed(_)
                        | AppError::ActionDenied(_)
                        | AppError::InvalidTransition(_)
                ),
                "round {}: {}",
                round,
                e
            ),
        }
        f.assert_consistent().await;
    }

    assert!(applied >= 5, "only {} of 24 actions applied", applied);
    assert!(f.item().await.version >= 5);
}

#[tokio::test]
async fn test_checkout_of_item_reserved_for_someone_else_is_denied() {
    let f = fixture().await;
    assert_ok!(f.service.request(ITEM, request_by(7, HOME_DESK)).await);

    let err = assert_err!(f.service.checkout(ITEM, checkout_by(8, HOME)).await);
    assert!(matches!(err, AppError::ActionDenied(_)));

    // The requester fulfils their own request
    let report = assert_ok!(f.service.checkout(ITEM, checkout_by(7, HOME)).await);
    assert_eq!(report.actions.len(), 1);
    assert_eq!(f.loans_of(7).await.len(), 1);
    assert_eq!(f.loans_of(7).await[0].state, LoanState::ItemOnLoan);
}

#[tokio::test]
async fn test_checkout_of_loan_in_transit_home_frees_the_item() {
    let f = fixture().await;
    let returning = f.seed(5, LoanState::ItemInTransitToHouse, BRANCH, 120).await;
    f.seed(8, LoanState::Pending, REMOTE, 60).await;

    let params = CheckoutParams {
        loan_id: Some(returning.id),
        ..checkout_by(7, HOME)
    };
    let report = assert_ok!(f.service.checkout(ITEM, params).await);
    assert_eq!(
        logged(&report),
        vec![
            (CirculationAction::Cancel, LoanState::Cancelled),
            (CirculationAction::Checkout, LoanState::ItemOnLoan),
        ]
    );
    f.assert_consistent().await;
}

#[tokio::test]
async fn test_cancel_at_desk_validates_next_request() {
    let f = fixture().await;
    let desk = f.seed(5, LoanState::ItemAtDesk, BRANCH, 120).await;
    let next = f.seed(8, LoanState::Pending, BRANCH, 60).await;

    let report = assert_ok!(f.service.cancel_request(ITEM, desk.id).await);
    assert_eq!(
        logged(&report),
        vec![
            (CirculationAction::CancelRequest, LoanState::Cancelled),
            (CirculationAction::Validate, LoanState::ItemAtDesk),
        ]
    );
    assert_eq!(f.loan(&next).await.state, LoanState::ItemAtDesk);
    assert_eq!(report.item.status, ItemStatus::AtDesk);
}

#[tokio::test]
async fn test_cancel_at_desk_away_sends_item_home() {
    let f = fixture().await;
    let desk = f.seed(5, LoanState::ItemAtDesk, REMOTE, 120).await;

    let report = assert_ok!(f.service.cancel_request(ITEM, desk.id).await);
    assert_eq!(
        logged(&report),
        vec![(CirculationAction::CancelRequest, LoanState::ItemInTransitToHouse)]
    );
    assert_eq!(report.item.status, ItemStatus::InTransit);

    let report = assert_ok!(f.service.receive(ITEM, desk.id, Some(HOME)).await);
    assert_eq!(report.item.status, ItemStatus::OnShelf);
}

#[tokio::test]
async fn test_request_defaults_to_transaction_library_pickup() {
    let f = fixture().await;
    let params = RequestParams {
        patron_id: 7,
        transaction_location_id: BRANCH,
        pickup_location_id: None,
    };
    let report = assert_ok!(f.service.request(ITEM, params).await);
    assert_eq!(report.actions[0].loan.pickup_location_id, BRANCH);

    // One loan per patron and item
    let err = assert_err!(f.service.request(ITEM, request_by(7, REMOTE)).await);
    assert!(matches!(err, AppError::ActionDenied(_)));
}

#[tokio::test]
async fn test_request_at_non_pickup_location_is_denied() {
    let f = fixture().await;
    let err = assert_err!(f.service.request(ITEM, request_by(7, HOME)).await);
    assert!(matches!(err, AppError::ActionDenied(_)));
}

#[tokio::test]
async fn test_missing_item_cannot_circulate_until_checked_in() {
    let f = fixture().await;
    f.set_status(ItemStatus::Missing).await;

    let err = assert_err!(f.service.request(ITEM, request_by(7, BRANCH)).await);
    assert!(matches!(err, AppError::ActionDenied(_)));
    let err = assert_err!(f.service.checkout(ITEM, checkout_by(7, HOME)).await);
    assert!(matches!(err, AppError::ActionDenied(_)));

    let report = assert_ok!(f.service.checkin(ITEM, checkin_at(HOME)).await);
    assert_eq!(report.item.status, ItemStatus::OnShelf);
    assert_ok!(f.service.request(ITEM, request_by(7, BRANCH)).await);
}

#[tokio::test]
async fn test_standalone_validate_and_receive() {
    let f = fixture().await;
    let report = assert_ok!(f.service.request(ITEM, request_by(7, REMOTE)).await);
    let loan_id = report.actions[0].loan.id;

    // Nothing is in transit yet
    let err = assert_err!(f.service.receive(ITEM, loan_id, None).await);
    assert!(matches!(err, AppError::InvalidTransition(_)));

    let report = assert_ok!(f.service.validate_request(ITEM, loan_id, HOME).await);
    assert_eq!(
        logged(&report),
        vec![(CirculationAction::Validate, LoanState::ItemInTransitForPickup)]
    );

    let err = assert_err!(f.service.validate_request(ITEM, loan_id, HOME).await);
    assert!(matches!(err, AppError::InvalidTransition(_)));

    let report = assert_ok!(f.service.receive(ITEM, loan_id, None).await);
    assert_eq!(report.actions[0].loan.state, LoanState::ItemAtDesk);
    assert_eq!(report.actions[0].loan.transaction_location_id, REMOTE);
}

#[tokio::test]
async fn test_loan_of_another_item_is_rejected() {
    let f = fixture().await;
    let loan = f.seed(5, LoanState::Pending, BRANCH, 10).await;

    let err = assert_err!(f.service.cancel_request(ITEM + 1, loan.id).await);
    assert!(matches!(err, AppError::Validation(_)));

    let err = assert_err!(f.service.cancel_request(ITEM, uuid::Uuid::new_v4()).await);
    assert!(matches!(err, AppError::NotFound(_)));
}
