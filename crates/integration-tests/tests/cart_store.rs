//! Cart store behavior through the public library API.

#![allow(clippy::unwrap_used)]

use redthread_core::{Quantity, Size};
use redthread_integration_tests::{FakeCatalog, product};
use redthread_storefront::cart::{CartError, CartStore, MemoryCartStorage};
use rust_decimal::Decimal;
use serde_json::json;

#[tokio::test]
async fn test_add_merge_remove_walkthrough() {
    let tee = product("Tee", 2000, &["S", "M", "L"]);
    let beanie = product("Beanie", 1500, &[]);
    let catalog = FakeCatalog::new([tee.clone(), beanie.clone()]);
    let mut store = CartStore::load(MemoryCartStorage::new(), catalog).await;

    store
        .add_to_cart(tee.id, Size::new("M"), Quantity::ONE)
        .await
        .unwrap();
    store
        .add_to_cart(tee.id, Size::new("M"), Quantity::new(2))
        .await
        .unwrap();
    assert_eq!(store.cart().lines().len(), 1);
    assert_eq!(store.cart_total_display(), "60.00");
    assert_eq!(store.cart_count(), 3);

    store
        .add_to_cart(beanie.id, beanie.default_size(), Quantity::ONE)
        .await
        .unwrap();
    assert_eq!(store.cart().lines().len(), 2);
    assert_eq!(store.cart_total_display(), "75.00");
    assert_eq!(store.cart_count(), 4);

    assert!(store.remove_from_cart(tee.id, Size::new("M")).await);
    assert_eq!(store.cart_total_display(), "15.00");
    assert_eq!(store.cart_count(), 1);
    assert_eq!(store.cart().lines()[0].size.as_str(), "One Size");
}

#[tokio::test]
async fn test_cart_survives_reload() {
    let hoodie = product("Hoodie", 4599, &["M"]);
    let catalog = FakeCatalog::new([hoodie.clone()]);
    let storage = MemoryCartStorage::new();

    let mut store = CartStore::load(storage.clone(), catalog.clone()).await;
    store
        .add_to_cart(hoodie.id, Size::new("M"), Quantity::new(2))
        .await
        .unwrap();
    drop(store);

    let reloaded = CartStore::load(storage, catalog.clone()).await;
    assert_eq!(reloaded.cart_count(), 2);
    assert_eq!(reloaded.cart_total(), Decimal::new(9198, 2));
    assert_eq!(catalog.lookups(), 1);
}

#[tokio::test]
async fn test_unknown_product_leaves_cart_and_storage_alone() {
    let storage = MemoryCartStorage::new();
    let mut store = CartStore::load(storage.clone(), FakeCatalog::default()).await;

    let err = store
        .add_to_cart(redthread_core::ProductId::generate(), Size::one_size(), Quantity::ONE)
        .await
        .unwrap_err();

    assert!(matches!(err, CartError::Lookup(ref e) if e.is_not_found()));
    assert!(store.cart().is_empty());
    assert!(storage.snapshot().await.is_none());
}

#[tokio::test]
async fn test_quantities_stay_in_range() {
    let sock = product("Sock", 500, &[]);
    let mut store = CartStore::load(MemoryCartStorage::new(), FakeCatalog::new([sock.clone()])).await;

    store
        .add_to_cart(sock.id, Size::one_size(), Quantity::new(3))
        .await
        .unwrap();
    store
        .update_cart_item(sock.id, Size::one_size(), 0)
        .await
        .unwrap();
    assert_eq!(store.cart_count(), 1);

    store
        .update_cart_item(sock.id, Size::one_size(), 1_000_000)
        .await
        .unwrap();
    assert_eq!(store.cart_count(), redthread_core::MAX_LINE_QUANTITY);

    let err = store
        .update_cart_item(sock.id, Size::new("XL"), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::LineNotFound { .. }));
}

#[tokio::test]
async fn test_corrupt_storage_is_repaired_on_load() {
    let storage = MemoryCartStorage::with_value(json!([
        {"product_id": "0f8fad5b-d9cb-469f-a165-70867728950e", "size": "M", "name": "Tee", "price": "20.00", "quantity": 1},
        {"product_id": "0f8fad5b-d9cb-469f-a165-70867728950e", "size": "M", "name": "Tee", "price": "20.00", "quantity": 1},
        {"product_id": "0f8fad5b-d9cb-469f-a165-70867728950e", "size": "L", "price": 20},
        {"name": "No id", "price": 5}
    ]));

    let store = CartStore::load(storage, FakeCatalog::default()).await;
    assert_eq!(store.cart().lines().len(), 1);
    assert_eq!(store.cart_count(), 2);
    assert_eq!(store.cart_total_display(), "40.00");
}

#[tokio::test]
async fn test_non_array_storage_starts_empty() {
    let storage = MemoryCartStorage::with_value(json!("not a cart"));
    let store = CartStore::load(storage, FakeCatalog::default()).await;
    assert!(store.cart().is_empty());
    assert_eq!(store.cart_total_display(), "0.00");
}

#[tokio::test]
async fn test_subscribers_track_every_change() {
    let tee = product("Tee", 2000, &["M"]);
    let mut store = CartStore::load(MemoryCartStorage::new(), FakeCatalog::new([tee.clone()])).await;
    let rx = store.subscribe();

    store
        .add_to_cart(tee.id, Size::new("M"), Quantity::new(2))
        .await
        .unwrap();
    assert_eq!(rx.borrow().count, 2);

    store.clear_cart().await;
    assert_eq!(rx.borrow().count, 0);
    assert_eq!(rx.borrow().total, Decimal::ZERO);
}
