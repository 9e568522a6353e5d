//! # Operation Handlers
//!
//! One function per entry in the operation semantics table (specification
//! §4.1). Each handler owns the request it is given, mutates the bucket
//! in-place where applicable, updates the registry/TTL monitor as required,
//! and always responds exactly once — on the result channel for success, on
//! the error channel otherwise.
//!
//! Grounded on `storage.go`'s `opHandlers` table and its twelve `op*`
//! functions.

use std::collections::HashMap;

use alaredis_common::{EngineError, Op, Tag, Value};

use crate::registry::KeyRegistry;
use crate::shard::ShardRequest;
use crate::ttl::TtlMonitor;

/// Dispatches `req` to the handler for its operation.
pub async fn handle(
    req: ShardRequest,
    bucket: &mut HashMap<String, Value>,
    registry: &KeyRegistry,
    ttl: &TtlMonitor,
) {
    match req.op {
        Op::Delete => delete(req, bucket, registry, ttl).await,
        Op::Set => set(req, bucket, registry, ttl).await,
        Op::Get => get(req, bucket),
        Op::LSet => lset(req, bucket, registry, ttl).await,
        Op::LSetI => lseti(req, bucket),
        Op::LGet => lget(req, bucket),
        Op::LGetI => lgeti(req, bucket),
        Op::DSet => dset(req, bucket, registry, ttl).await,
        Op::DSetI => dseti(req, bucket, registry).await,
        Op::DGet => dget(req, bucket),
        Op::DGetI => dgeti(req, bucket),
        Op::DKeys => dkeys(req, bucket),
    }
}

async fn delete(req: ShardRequest, bucket: &mut HashMap<String, Value>, registry: &KeyRegistry, ttl: &TtlMonitor) {
    bucket.remove(&req.key);
    registry.remove(&req.key).await;
    ttl.unmonitor(req.meta.clone()).await;
    req.meta.set_tag(Tag::None);
    req.respond_ok(None);
}

async fn set(req: ShardRequest, bucket: &mut HashMap<String, Value>, registry: &KeyRegistry, ttl: &TtlMonitor) {
    let Some(val) = req.val.clone() else {
        return req.respond_err(EngineError::bad_request("Incoming object is not string"));
    };
    if val.as_str().is_none() {
        return req.respond_err(EngineError::bad_request("Incoming object is not string"));
    }
    bucket.insert(req.key.clone(), val);
    req.meta.set_tag(Tag::String);
    registry.insert(req.meta.clone()).await;
    ttl.monitor(req.meta.clone(), req.ttl).await;
    req.respond_ok(None);
}

fn get(req: ShardRequest, bucket: &HashMap<String, Value>) {
    match req.meta.tag() {
        Tag::None => req.respond_err(EngineError::not_found(req.key.clone())),
        Tag::String => match bucket.get(&req.key).cloned() {
            Some(val) => req.respond_ok(Some(val)),
            None => req.respond_err(EngineError::not_found(req.key.clone())),
        },
        _ => req.respond_err(EngineError::bad_request("Stored object is not string")),
    }
}

async fn lset(req: ShardRequest, bucket: &mut HashMap<String, Value>, registry: &KeyRegistry, ttl: &TtlMonitor) {
    let Some(val) = req.val.clone() else {
        return req.respond_err(EngineError::bad_request("Incoming object is not list"));
    };
    if val.as_list().is_none() {
        return req.respond_err(EngineError::bad_request("Incoming object is not list"));
    }
    bucket.insert(req.key.clone(), val);
    req.meta.set_tag(Tag::List);
    registry.insert(req.meta.clone()).await;
    ttl.monitor(req.meta.clone(), req.ttl).await;
    req.respond_ok(None);
}

fn lseti(req: ShardRequest, bucket: &mut HashMap<String, Value>) {
    match req.meta.tag() {
        Tag::None => return req.respond_err(EngineError::not_found(req.key.clone())),
        Tag::List => {}
        _ => return req.respond_err(EngineError::bad_request("Stored object is not list")),
    }
    let Some(idx_str) = req.idx.clone() else {
        return req.respond_err(EngineError::bad_request("Missing index"));
    };
    let Ok(idx) = idx_str.parse::<usize>() else {
        return req.respond_err(EngineError::bad_request(format!(
            "Non integer index: '{idx_str}'"
        )));
    };
    let Some(new_val) = req.val.as_ref().and_then(Value::as_str).map(str::to_owned) else {
        return req.respond_err(EngineError::bad_request("Incoming object is not string"));
    };
    let Some(list) = bucket.get_mut(&req.key).and_then(Value::as_list_mut) else {
        return req.respond_err(EngineError::internal("Stored object vanished mid-request"));
    };
    if idx >= list.len() {
        return req.respond_err(EngineError::bad_request("List index out of range"));
    }
    list[idx] = new_val;
    req.respond_ok(None);
}

fn lget(req: ShardRequest, bucket: &HashMap<String, Value>) {
    match req.meta.tag() {
        Tag::None => req.respond_err(EngineError::not_found(req.key.clone())),
        Tag::List => match bucket.get(&req.key).cloned() {
            Some(val) => req.respond_ok(Some(val)),
            None => req.respond_err(EngineError::not_found(req.key.clone())),
        },
        _ => req.respond_err(EngineError::bad_request("Stored object is not list")),
    }
}

fn lgeti(req: ShardRequest, bucket: &HashMap<String, Value>) {
    match req.meta.tag() {
        Tag::None => return req.respond_err(EngineError::not_found(req.key.clone())),
        Tag::List => {}
        _ => return req.respond_err(EngineError::bad_request("Stored object is not list")),
    }
    let Some(idx_str) = req.idx.clone() else {
        return req.respond_err(EngineError::bad_request("Missing index"));
    };
    let Ok(idx) = idx_str.parse::<usize>() else {
        return req.respond_err(EngineError::bad_request(format!(
            "Non integer index: '{idx_str}'"
        )));
    };
    let Some(list) = bucket.get(&req.key).and_then(Value::as_list) else {
        return req.respond_err(EngineError::internal("Stored object vanished mid-request"));
    };
    match list.get(idx) {
        Some(v) => req.respond_ok(Some(Value::Str(v.clone()))),
        None => req.respond_err(EngineError::bad_request("List index out of range")),
    }
}

async fn dset(req: ShardRequest, bucket: &mut HashMap<String, Value>, registry: &KeyRegistry, ttl: &TtlMonitor) {
    let Some(val) = req.val.clone() else {
        return req.respond_err(EngineError::bad_request("Incoming object is not dict"));
    };
    if val.as_dict().is_none() {
        return req.respond_err(EngineError::bad_request("Incoming object is not dict"));
    }
    bucket.insert(req.key.clone(), val);
    req.meta.set_tag(Tag::Dict);
    registry.insert(req.meta.clone()).await;
    ttl.monitor(req.meta.clone(), req.ttl).await;
    req.respond_ok(None);
}

/// `DSETI` is underspecified for the case where the key already holds a
/// non-dict value (the table only names "key absent" vs. "else"). Rather
/// than mutate through a type assertion that would not exist in Rust, an
/// existing non-dict value is rejected as `BAD_REQUEST` instead of silently
/// clobbered — consistent with every other handler's tag-checked-before-write
/// discipline.
async fn dseti(req: ShardRequest, bucket: &mut HashMap<String, Value>, registry: &KeyRegistry) {
    let Some(idx) = req.idx.clone() else {
        return req.respond_err(EngineError::bad_request("Missing index"));
    };
    let Some(new_val) = req.val.as_ref().and_then(Value::as_str).map(str::to_owned) else {
        return req.respond_err(EngineError::bad_request("Incoming object is not string"));
    };

    match req.meta.tag() {
        Tag::None => {
            let mut dict = HashMap::new();
            dict.insert(idx, new_val);
            bucket.insert(req.key.clone(), Value::Dict(dict));
            req.meta.set_tag(Tag::Dict);
            registry.insert(req.meta.clone()).await;
        }
        Tag::Dict => {
            let Some(dict) = bucket.get_mut(&req.key).and_then(Value::as_dict_mut) else {
                return req.respond_err(EngineError::internal("Stored object vanished mid-request"));
            };
            dict.insert(idx, new_val);
        }
        _ => return req.respond_err(EngineError::bad_request("Stored object is not dict")),
    }
    req.respond_ok(None);
}

fn dget(req: ShardRequest, bucket: &HashMap<String, Value>) {
    match req.meta.tag() {
        Tag::None => req.respond_err(EngineError::not_found(req.key.clone())),
        Tag::Dict => match bucket.get(&req.key).cloned() {
            Some(val) => req.respond_ok(Some(val)),
            None => req.respond_err(EngineError::not_found(req.key.clone())),
        },
        _ => req.respond_err(EngineError::bad_request("Stored object is not dict")),
    }
}

fn dgeti(req: ShardRequest, bucket: &HashMap<String, Value>) {
    match req.meta.tag() {
        Tag::None => return req.respond_err(EngineError::not_found(req.key.clone())),
        Tag::Dict => {}
        _ => return req.respond_err(EngineError::bad_request("Stored object is not dict")),
    }
    let Some(idx) = req.idx.clone() else {
        return req.respond_err(EngineError::bad_request("Missing index"));
    };
    let Some(dict) = bucket.get(&req.key).and_then(Value::as_dict) else {
        return req.respond_err(EngineError::internal("Stored object vanished mid-request"));
    };
    match dict.get(&idx) {
        Some(v) => req.respond_ok(Some(Value::Str(v.clone()))),
        None => req.respond_err(EngineError::bad_request(format!(
            "Dict does not contain index '{idx}'"
        ))),
    }
}

fn dkeys(req: ShardRequest, bucket: &HashMap<String, Value>) {
    match req.meta.tag() {
        Tag::None => return req.respond_err(EngineError::not_found(req.key.clone())),
        Tag::Dict => {}
        _ => return req.respond_err(EngineError::bad_request("Stored object is not dict")),
    }
    let Some(dict) = bucket.get(&req.key).and_then(Value::as_dict) else {
        return req.respond_err(EngineError::internal("Stored object vanished mid-request"));
    };
    let keys = dict.keys().cloned().collect();
    req.respond_ok(Some(Value::List(keys)));
}
