use std::sync::Arc;

use bridge_server::routes::admin::{
    CorrelationEntry, StoreStatusResponse, list_correlations, store_status,
};
use bridge_server::store::CorrelationStore;
use bridge_server::test_support::TestRocketBuilder;
use rocket::http::Status;
use rocket::routes;

#[test]
fn store_status_reports_entry_count_and_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CorrelationStore::open(&dir.path().join("store.bin")).unwrap());
    store.put("m-1", 1).unwrap();
    store.put("m-2", 2).unwrap();

    let client = TestRocketBuilder::new()
        .mount_routes(routes![store_status])
        .manage_store(Arc::clone(&store))
        .blocking_client();

    let response = client.get("/admin/store/status").dispatch();
    assert_eq!(response.status(), Status::Ok);

    let payload: StoreStatusResponse = response.into_json().expect("valid JSON payload");
    assert_eq!(payload.total_correlations, 2);
    assert!(payload.store_path.ends_with("store.bin"));
}

#[test]
fn correlation_listing_is_sorted_by_message_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(CorrelationStore::open(&dir.path().join("store.bin")).unwrap());
    store.put("m-b", 2).unwrap();
    store.put("m-a", 1).unwrap();

    let client = TestRocketBuilder::new()
        .mount_routes(routes![list_correlations])
        .manage_store(store)
        .blocking_client();

    let response = client.get("/admin/store/correlations").dispatch();
    assert_eq!(response.status(), Status::Ok);

    let payload: Vec<CorrelationEntry> = response.into_json().expect("valid JSON payload");
    assert_eq!(payload.len(), 2);
    assert_eq!(payload[0].message_id, "m-a");
    assert_eq!(payload[0].issue_number, 1);
    assert_eq!(payload[1].message_id, "m-b");
    assert_eq!(payload[1].issue_number, 2);
}
