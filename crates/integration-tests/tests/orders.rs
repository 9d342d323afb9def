//! Order capture against a real `PostgreSQL` database.
//!
//! These tests require a disposable database in `DATABASE_URL`.
//!
//! Run with: cargo test -p oven-order-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;
use tokio::task::JoinSet;

use oven_order_core::{ContactRef, PersonRef};
use oven_order_integration_tests::{TestContext, named, named_with_phone, unique_name};
use oven_order_server::models::PartyInput;
use oven_order_server::db::RepositoryError;
use oven_order_server::error::{AppError, ErrorKind};

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_order_is_stored_with_snapshots() {
    let ctx = TestContext::new().await;
    let item = ctx.create_item(dec!(65000)).await;
    let buyer = unique_name("Budi");
    let recipient = unique_name("Sari");

    let input = ctx.input(
        named_with_phone(&buyer, "08123456789"),
        named(&recipient),
        &[(item, 2)],
    );
    let detail = ctx.orders.create_order(&input).await.unwrap();

    assert_eq!(detail.subtotal_amount, dec!(130000));
    assert_eq!(detail.total_amount, dec!(140000));
    assert_eq!(detail.buyer.phone.as_deref(), Some("08123456789"));
    assert_eq!(detail.delivery_method.name, "Delivery");
    assert_eq!(detail.items.len(), 1);

    let fetched = ctx.orders.get_order(detail.id).await.unwrap();
    assert_eq!(fetched, detail);
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_price_change_does_not_touch_placed_order() {
    let ctx = TestContext::new().await;
    let item = ctx.create_item(dec!(50000)).await;
    let buyer = unique_name("Budi");

    let input = ctx.input(named(&buyer), named(&buyer), &[(item, 1)]);
    let placed = ctx.orders.create_order(&input).await.unwrap();

    ctx.set_price(item, dec!(75000)).await;

    let fetched = ctx.orders.get_order(placed.id).await.unwrap();
    assert_eq!(fetched.items[0].item_price, dec!(50000));
    assert_eq!(fetched.total_amount, dec!(60000));
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_new_phone_replaces_preferred_phone() {
    let ctx = TestContext::new().await;
    let item = ctx.create_item(dec!(10000)).await;
    let buyer = unique_name("Budi");
    let recipient = unique_name("Sari");

    for phone in ["0811", "0822", "0811"] {
        let input = ctx.input(
            named_with_phone(&buyer, phone),
            named(&recipient),
            &[(item, 1)],
        );
        ctx.orders.create_order(&input).await.unwrap();
    }

    let phones = ctx.phones_of(&buyer).await;
    assert_eq!(
        phones,
        vec![("0811".to_owned(), true), ("0822".to_owned(), false)]
    );
    assert_eq!(ctx.persons_named(&buyer).await, 1);
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_duplicate_order_number_reports_constraint() {
    let ctx = TestContext::new().await;
    let item = ctx.create_item(dec!(10000)).await;
    let buyer = unique_name("Budi");

    let input = ctx.input(named(&buyer), named(&buyer), &[(item, 1)]);
    ctx.orders.create_order(&input).await.unwrap();
    let err = ctx.orders.create_order(&input).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BadRequest);
    match err {
        AppError::Database(RepositoryError::Constraint(violation)) => {
            assert_eq!(violation.constraint.as_deref(), Some("orders_order_number_key"));
            assert!(violation.detail.unwrap().contains(&input.order_number));
        }
        other => panic!("expected constraint violation, got {other:?}"),
    }
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_inactive_item_rolls_back_person_writes() {
    let ctx = TestContext::new().await;
    let active = ctx.create_item(dec!(10000)).await;
    let inactive = ctx.create_item(dec!(20000)).await;
    ctx.deactivate(inactive).await;
    let buyer = unique_name("Budi");

    let input = ctx.input(named(&buyer), named(&buyer), &[(active, 1), (inactive, 1)]);
    let err = ctx.orders.create_order(&input).await.unwrap_err();

    assert!(
        matches!(err, AppError::NotFound(ref msg) if msg.contains(&inactive.to_string())),
        "unexpected error: {err:?}"
    );
    assert_eq!(ctx.persons_named(&buyer).await, 0);
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_reversed_roles_concurrently_all_succeed() {
    let ctx = TestContext::new().await;
    let first = ctx.create_item(dec!(10000)).await;
    let second = ctx.create_item(dec!(20000)).await;
    let alice = unique_name("Alice");
    let bob = unique_name("Bob");

    let mut tasks = JoinSet::new();
    for round in 0..8 {
        let (buyer, recipient) = if round % 2 == 0 {
            (&alice, &bob)
        } else {
            (&bob, &alice)
        };
        let input = ctx.input(
            named_with_phone(buyer, &format!("08{round}")),
            named_with_phone(recipient, &format!("09{round}")),
            &[(second, 1), (first, 2)],
        );
        let orders = ctx.orders.clone();
        tasks.spawn(async move { orders.create_order(&input).await });
    }

    while let Some(result) = tasks.join_next().await {
        let detail = result.unwrap().unwrap();
        assert_eq!(detail.total_amount, dec!(50000));
    }

    assert_eq!(ctx.persons_named(&alice).await, 1);
    assert_eq!(ctx.persons_named(&bob).await, 1);
    for name in [&alice, &bob] {
        let preferred = ctx
            .phones_of(name)
            .await
            .into_iter()
            .filter(|(_, preferred)| *preferred)
            .count();
        assert_eq!(preferred, 1, "{name} must have exactly one preferred phone");
    }
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_same_new_buyer_concurrently_creates_one_person() {
    let ctx = TestContext::new().await;
    let item = ctx.create_item(dec!(15000)).await;
    let buyer = unique_name("Budi");
    let recipient = unique_name("Sari");

    let mut tasks = JoinSet::new();
    for _ in 0..6 {
        let input = ctx.input(named(&buyer), named(&recipient), &[(item, 1)]);
        let orders = ctx.orders.clone();
        tasks.spawn(async move { orders.create_order(&input).await });
    }

    let mut buyer_ids = Vec::new();
    while let Some(result) = tasks.join_next().await {
        buyer_ids.push(result.unwrap().unwrap().buyer.id);
    }
    buyer_ids.dedup();

    assert_eq!(buyer_ids.len(), 1);
    assert_eq!(ctx.persons_named(&buyer).await, 1);
}

#[tokio::test]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_id_buyer_with_new_phones_concurrently_keeps_one_preferred() {
    let ctx = TestContext::new().await;
    let item = ctx.create_item(dec!(15000)).await;
    let buyer = unique_name("Budi");
    let buyer_id = ctx.create_person(&buyer).await;
    let recipient = unique_name("Sari");

    let mut tasks = JoinSet::new();
    for n in 0..8 {
        let by_id = PartyInput {
            person: PersonRef::Existing { id: buyer_id },
            phone: Some(ContactRef::New {
                value: format!("08{n}"),
            }),
            address: None,
        };
        let input = ctx.input(by_id, named(&recipient), &[(item, 1)]);
        let orders = ctx.orders.clone();
        tasks.spawn(async move { orders.create_order(&input).await });
    }

    while let Some(result) = tasks.join_next().await {
        let detail = result.unwrap().unwrap();
        assert_eq!(detail.buyer.id, buyer_id);
    }

    let phones = ctx.phones_of(&buyer).await;
    assert_eq!(phones.len(), 8);
    assert_eq!(phones.iter().filter(|(_, preferred)| *preferred).count(), 1);
}
