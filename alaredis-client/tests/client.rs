use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use alaredis_client::KVClient;
use alaredis_engine::Storage;
use alaredis_server::http::{router, AppState};
use alaredis_server::Metrics;

/// Spawns the HTTP front door on its own thread and runtime, since
/// `reqwest::blocking` cannot be driven from inside an existing Tokio
/// runtime. Returns the base URL once the listener is bound.
fn spawn_server() -> String {
    let (addr_tx, addr_rx) = mpsc::channel();

    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("build runtime");
        runtime.block_on(async move {
            let storage = Storage::new(2);
            storage.run();
            let state = AppState {
                dispatcher: storage.dispatcher().clone(),
                metrics: Arc::new(Metrics::new()),
            };
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
            let addr = listener.local_addr().expect("addr");
            addr_tx.send(addr).expect("send addr");
            axum::serve(listener, router(state)).await.ok();
        });
    });

    let addr = addr_rx.recv().expect("server never bound");
    format!("http://{addr}")
}

#[test]
fn client_set_get_delete_roundtrip() {
    let client = KVClient::connect(spawn_server()).unwrap();

    client.set("key", "value").unwrap();
    assert_eq!(client.get("key").unwrap(), Some("value".to_string()));

    client.delete("key").unwrap();
    assert_eq!(client.get("key").unwrap(), None);
}

#[test]
fn client_lists_and_dicts() {
    let client = KVClient::connect(spawn_server()).unwrap();

    client
        .lset("mylist", vec!["v1".into(), "v2".into(), "v3".into()])
        .unwrap();
    assert_eq!(client.lgeti("mylist", 1).unwrap(), Some("v2".to_string()));
    client.lseti("mylist", 1, "updated").unwrap();
    assert_eq!(
        client.lget("mylist").unwrap(),
        Some(vec!["v1".to_string(), "updated".to_string(), "v3".to_string()])
    );

    let mut dict = HashMap::new();
    dict.insert("k1".to_string(), "v1".to_string());
    client.dset("mydict", dict).unwrap();
    client.dseti("mydict", "k2", "v2").unwrap();
    assert_eq!(client.dgeti("mydict", "k2").unwrap(), Some("v2".to_string()));
    let mut keys = client.dkeys("mydict").unwrap().unwrap();
    keys.sort();
    assert_eq!(keys, vec!["k1".to_string(), "k2".to_string()]);
}

#[test]
fn client_set_with_ttl_then_expires() {
    let client = KVClient::connect(spawn_server()).unwrap();

    client.set_with_ttl("ephemeral", "soon-gone", 1).unwrap();
    assert_eq!(client.get("ephemeral").unwrap(), Some("soon-gone".to_string()));

    thread::sleep(Duration::from_millis(1200));
    assert_eq!(client.get("ephemeral").unwrap(), None);
}
