//! End-to-end scenarios run through `Storage`/`Dispatcher`, matching the
//! concrete scenarios enumerated in the specification's testable-properties
//! section (scenarios A-D, F). Each scenario uses a single-shard engine,
//! as the scenarios themselves specify (`N=1`).

use std::collections::HashMap;

use alaredis_common::{EngineError, Op, Value};
use alaredis_engine::Storage;

fn single_shard() -> std::sync::Arc<Storage> {
    let storage = Storage::new(1);
    storage.run();
    storage
}

#[tokio::test]
async fn scenario_a_strings() {
    let storage = single_shard();
    let d = storage.dispatcher();

    let res = d
        .call(
            Op::Set,
            "test key",
            None,
            Some(Value::Str("test value".into())),
            0,
        )
        .await;
    assert_eq!(res, Ok(None));

    let res = d.call(Op::Get, "test key", None, None, 0).await;
    assert_eq!(res, Ok(Some(Value::Str("test value".into()))));

    let res = d.call(Op::Delete, "test key", None, None, 0).await;
    assert_eq!(res, Ok(None));

    let res = d.call(Op::Get, "test key", None, None, 0).await;
    assert_eq!(
        res,
        Err(EngineError::not_found("test key".to_string()))
    );
    assert_eq!(
        res.unwrap_err().to_string(),
        "Object not found for key 'test key'"
    );
}

#[tokio::test(start_paused = true)]
async fn scenario_b_ttl() {
    let storage = single_shard();
    let d = storage.dispatcher();

    d.call(
        Op::Set,
        "test key",
        None,
        Some(Value::Str("test value".into())),
        2,
    )
    .await
    .unwrap();

    assert_eq!(
        d.call(Op::Get, "test key", None, None, 0).await,
        Ok(Some(Value::Str("test value".into())))
    );

    tokio::time::advance(std::time::Duration::from_secs(1)).await;
    tokio::task::yield_now().await;
    assert_eq!(
        d.call(Op::Get, "test key", None, None, 0).await,
        Ok(Some(Value::Str("test value".into())))
    );

    tokio::time::advance(std::time::Duration::from_secs(2)).await;
    tokio::task::yield_now().await;
    assert!(d.call(Op::Get, "test key", None, None, 0).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn scenario_c_lists() {
    let storage = single_shard();
    let d = storage.dispatcher();

    d.call(
        Op::LSet,
        "k",
        None,
        Some(Value::List(vec!["v1".into(), "v2".into(), "v3".into()])),
        0,
    )
    .await
    .unwrap();

    assert_eq!(
        d.call(Op::LGet, "k", None, None, 0).await,
        Ok(Some(Value::List(vec!["v1".into(), "v2".into(), "v3".into()])))
    );

    d.call(
        Op::LSetI,
        "k",
        Some("1".into()),
        Some(Value::Str("vx".into())),
        0,
    )
    .await
    .unwrap();

    assert_eq!(
        d.call(Op::LGet, "k", None, None, 0).await,
        Ok(Some(Value::List(vec!["v1".into(), "vx".into(), "v3".into()])))
    );

    let err = d
        .call(
            Op::LSetI,
            "k",
            Some("5".into()),
            Some(Value::Str("x".into())),
            0,
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "List index out of range");

    assert_eq!(
        d.call(Op::LGetI, "k", Some("0".into()), None, 0).await,
        Ok(Some(Value::Str("v1".into())))
    );

    d.call(Op::Delete, "k", None, None, 0).await.unwrap();
    assert!(d.call(Op::LGet, "k", None, None, 0).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn scenario_d_dicts() {
    let storage = single_shard();
    let d = storage.dispatcher();

    let mut dict = HashMap::new();
    dict.insert("k1".to_string(), "v1".to_string());
    dict.insert("k2".to_string(), "v2".to_string());
    dict.insert("k3".to_string(), "v3".to_string());

    d.call(Op::DSet, "k", None, Some(Value::Dict(dict.clone())), 0)
        .await
        .unwrap();

    assert_eq!(
        d.call(Op::DGet, "k", None, None, 0).await,
        Ok(Some(Value::Dict(dict)))
    );

    d.call(
        Op::DSetI,
        "k",
        Some("k2".into()),
        Some(Value::Str("other".into())),
        0,
    )
    .await
    .unwrap();

    let got = d.call(Op::DGet, "k", None, None, 0).await.unwrap().unwrap();
    assert_eq!(got.as_dict().unwrap()["k2"], "other");

    d.call(
        Op::DSetI,
        "k",
        Some("k5".into()),
        Some(Value::Str("new".into())),
        0,
    )
    .await
    .unwrap();

    let keys = d.call(Op::DKeys, "k", None, None, 0).await.unwrap().unwrap();
    let mut keys = match keys {
        Value::List(l) => l,
        other => panic!("expected a list of keys, got {other:?}"),
    };
    keys.sort();
    assert_eq!(keys, vec!["k1", "k2", "k3", "k5"]);
}

#[tokio::test(start_paused = true)]
async fn scenario_f_expiration_fires_exactly_once_per_key() {
    let storage = single_shard();
    let d = storage.dispatcher();

    d.call(Op::Set, "k1", None, Some(Value::Str("a".into())), 4)
        .await
        .unwrap();
    d.call(Op::Set, "k2", None, Some(Value::Str("b".into())), 2)
        .await
        .unwrap();

    tokio::time::advance(std::time::Duration::from_secs(5)).await;
    tokio::task::yield_now().await;
    tokio::time::advance(std::time::Duration::from_millis(1)).await;
    tokio::task::yield_now().await;

    assert!(d.call(Op::Get, "k1", None, None, 0).await.unwrap_err().is_not_found());
    assert!(d.call(Op::Get, "k2", None, None, 0).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn shape_mismatch_yields_bad_request() {
    let storage = single_shard();
    let d = storage.dispatcher();

    d.call(Op::Set, "k", None, Some(Value::Str("s".into())), 0)
        .await
        .unwrap();

    assert!(d.call(Op::LGet, "k", None, None, 0).await.unwrap_err().is_bad_request());
    assert!(d.call(Op::DGet, "k", None, None, 0).await.unwrap_err().is_bad_request());
}
