//! Catalog, settings and admin-grant integration tests.

use tempfile::TempDir;

use vidshop_core::{ItemId, ItemInput, ScopeId, UserId, DEFAULT_FILENAME};
use vidshop_store::{keys, AdminStore, CatalogStore, SettingsStore, SqliteStore, StoreError};

async fn create_test_store() -> (SqliteStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = SqliteStore::open(dir.path().join("vidshop.db")).await.unwrap();
    (store, dir)
}

fn input(name: &str, price: i64) -> ItemInput {
    ItemInput {
        name: name.to_string(),
        price,
        reference: format!("https://drive.google.com/file/d/{name}/view"),
        filename: String::new(),
    }
}

#[tokio::test]
async fn new_items_are_active_with_default_filename() {
    let (store, _dir) = create_test_store().await;

    let id = store.upsert_item(None, &input("intro", 500)).await.unwrap();
    let item = store.get_item(id).await.unwrap().unwrap();

    assert!(item.active);
    assert_eq!(item.name, "intro");
    assert_eq!(item.price, 500);
    assert_eq!(item.filename, DEFAULT_FILENAME);
}

#[tokio::test]
async fn listing_filters_inactive_items() {
    let (store, _dir) = create_test_store().await;

    let a = store.upsert_item(None, &input("a", 100)).await.unwrap();
    let b = store.upsert_item(None, &input("b", 200)).await.unwrap();
    assert!(store.set_item_active(a, false).await.unwrap());

    let active = store.list_items(true).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, b);

    let all = store.list_items(false).await.unwrap();
    assert_eq!(all.iter().map(|i| i.id).collect::<Vec<_>>(), vec![a, b]);
}

#[tokio::test]
async fn updating_missing_item_is_a_noop() {
    let (store, _dir) = create_test_store().await;

    let returned = store
        .upsert_item(Some(ItemId::new(404)), &input("ghost", 1))
        .await
        .unwrap();
    assert_eq!(returned, ItemId::new(404));
    assert!(store.get_item(returned).await.unwrap().is_none());
    assert!(store.list_items(false).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_keeps_active_flag() {
    let (store, _dir) = create_test_store().await;

    let id = store.upsert_item(None, &input("clip", 100)).await.unwrap();
    store.set_item_active(id, false).await.unwrap();

    let mut changed = input("clip", 250);
    changed.filename = "clip.mov".into();
    store.upsert_item(Some(id), &changed).await.unwrap();

    let item = store.get_item(id).await.unwrap().unwrap();
    assert_eq!(item.price, 250);
    assert_eq!(item.filename, "clip.mov");
    assert!(!item.active);
}

#[tokio::test]
async fn negative_price_is_rejected() {
    let (store, _dir) = create_test_store().await;

    let result = store.upsert_item(None, &input("bad", -1)).await;
    assert!(matches!(result, Err(StoreError::InvalidAmount(_))));
}

#[tokio::test]
async fn delete_reports_whether_row_existed() {
    let (store, _dir) = create_test_store().await;

    let id = store.upsert_item(None, &input("clip", 100)).await.unwrap();
    assert!(store.delete_item(id).await.unwrap());
    assert!(!store.delete_item(id).await.unwrap());
    assert!(!store.set_item_active(id, true).await.unwrap());
}

#[tokio::test]
async fn settings_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vidshop.db");
    let scope = ScopeId::new(77);

    {
        let store = SqliteStore::open(&path).await.unwrap();
        assert!(store.is_shop_open().await.unwrap());
        store.set_shop_open(false).await.unwrap();
        store
            .set_scoped(scope, keys::DELIVERY_CHANNEL, "555")
            .await
            .unwrap();
        store.close().await;
    }

    let store = SqliteStore::open(&path).await.unwrap();
    assert!(!store.is_shop_open().await.unwrap());
    assert_eq!(
        store.get_scoped(scope, keys::DELIVERY_CHANNEL).await.unwrap(),
        Some("555".to_string())
    );
    assert_eq!(store.get_scoped(scope, keys::LOG_CHANNEL).await.unwrap(), None);

    assert!(store.clear_scoped(scope, keys::DELIVERY_CHANNEL).await.unwrap());
    assert_eq!(
        store.get_scoped(scope, keys::DELIVERY_CHANNEL).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn admin_grants_are_idempotent() {
    let (store, _dir) = create_test_store().await;
    let user = UserId::new(9);

    assert!(!store.is_granted(user).await.unwrap());
    assert!(store.grant_admin(user).await.unwrap());
    assert!(!store.grant_admin(user).await.unwrap());
    assert!(store.is_granted(user).await.unwrap());
    assert_eq!(store.list_admins().await.unwrap(), vec![user]);

    assert!(store.revoke_admin(user).await.unwrap());
    assert!(!store.revoke_admin(user).await.unwrap());
    assert!(store.list_admins().await.unwrap().is_empty());
}
