//! In-memory `ManagementClient`
//!
//! Stores resource payloads by ID so handlers can run without Azure:
//! integration tests use it directly and the CLI uses it for `--offline`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{ArmError, ArmResponse, ManagementClient};

#[derive(Default)]
pub struct InMemoryManagementClient {
    /// Keyed by lower-cased ID; ARM IDs compare case-insensitively
    objects: Mutex<BTreeMap<String, Value>>,
    calls: Mutex<Vec<String>>,
    etag_counter: Mutex<u64>,
}

impl InMemoryManagementClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from objects previously returned by `objects`
    pub fn from_objects(objects: impl IntoIterator<Item = Value>) -> Self {
        let client = Self::new();
        {
            let mut stored = lock(&client.objects);
            let mut counter = lock(&client.etag_counter);
            for object in objects {
                if let Some(id) = object.get("id").and_then(Value::as_str) {
                    stored.insert(id.to_lowercase(), object.clone());
                }
                // New writes must not reuse an etag already handed out
                if let Some(n) = object
                    .get("etag")
                    .and_then(Value::as_str)
                    .and_then(etag_number)
                {
                    *counter = (*counter).max(n);
                }
            }
        }
        client
    }

    /// Every stored object, ordered by ID
    pub fn objects(&self) -> Vec<Value> {
        lock(&self.objects).values().cloned().collect()
    }

    /// Seed an object as if it had been created out of band
    pub fn insert(&self, id: &str, body: Value) {
        let stamped = self.stamp(id, body);
        lock(&self.objects).insert(id.to_lowercase(), stamped);
    }

    pub fn contains(&self, id: &str) -> bool {
        lock(&self.objects).contains_key(&id.to_lowercase())
    }

    pub fn object(&self, id: &str) -> Option<Value> {
        lock(&self.objects).get(&id.to_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every call made so far, e.g. `PUT /subscriptions/...`
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn record(&self, method: &str, id: &str) {
        log::debug!("{} {} (in memory)", method, id);
        lock(&self.calls).push(format!("{} {}", method, id));
    }

    fn next_etag(&self) -> String {
        let mut counter = lock(&self.etag_counter);
        *counter += 1;
        format!("W/\"{}\"", counter)
    }

    /// Fill in the envelope fields ARM adds to every resource
    fn stamp(&self, id: &str, body: Value) -> Value {
        let mut object = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        object.insert("id".to_string(), Value::String(id.to_string()));
        if let Some(name) = id.rsplit('/').next() {
            object.insert("name".to_string(), Value::String(name.to_string()));
        }
        if let Some(resource_type) = resource_type_of(id) {
            object.insert("type".to_string(), Value::String(resource_type));
        }
        object.insert("etag".to_string(), Value::String(self.next_etag()));
        Value::Object(object)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // A panic while holding the lock leaves plain data behind, still usable
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// `7` for `W/"7"`, the etags this client issues
fn etag_number(etag: &str) -> Option<u64> {
    etag.strip_prefix("W/\"")?.strip_suffix('"')?.parse().ok()
}

/// `Microsoft.Network/dnsZones/A` for `.../providers/Microsoft.Network/dnsZones/z/A/www`
fn resource_type_of(id: &str) -> Option<String> {
    let parts: Vec<&str> = id.trim_matches('/').split('/').collect();
    let providers = parts
        .iter()
        .rposition(|p| p.eq_ignore_ascii_case("providers"))?;
    let namespace = parts.get(providers + 1)?;
    let types: Vec<&str> = parts[providers + 2..].iter().step_by(2).copied().collect();
    if types.is_empty() {
        return None;
    }
    Some(format!("{}/{}", namespace, types.join("/")))
}

/// JSON merge-patch (RFC 7386)
fn merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                if value.is_null() {
                    target.remove(key);
                } else {
                    merge(target.entry(key.clone()).or_insert(Value::Null), value);
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[async_trait]
impl ManagementClient for InMemoryManagementClient {
    async fn get(&self, id: &str, _api_version: &str) -> Result<ArmResponse, ArmError> {
        self.record("GET", id);
        self.object(id)
            .map(|body| ArmResponse::new(200, Some(body)))
            .ok_or_else(|| ArmError::not_found(id))
    }

    async fn put(
        &self,
        id: &str,
        _api_version: &str,
        body: &Value,
    ) -> Result<ArmResponse, ArmError> {
        self.record("PUT", id);
        let existed = self.contains(id);
        let stamped = self.stamp(id, body.clone());
        lock(&self.objects).insert(id.to_lowercase(), stamped.clone());
        Ok(ArmResponse::new(if existed { 200 } else { 201 }, Some(stamped)))
    }

    async fn patch(
        &self,
        id: &str,
        _api_version: &str,
        body: &Value,
    ) -> Result<ArmResponse, ArmError> {
        self.record("PATCH", id);
        let mut current = self.object(id).ok_or_else(|| ArmError::not_found(id))?;
        // ARM replaces `tags` as a whole rather than merging it
        if let (Value::Object(object), Some(tags)) = (&mut current, body.get("tags")) {
            object.insert("tags".to_string(), tags.clone());
        }
        merge(&mut current, body);
        let stamped = self.stamp(id, current);
        lock(&self.objects).insert(id.to_lowercase(), stamped.clone());
        Ok(ArmResponse::new(200, Some(stamped)))
    }

    async fn delete(&self, id: &str, _api_version: &str) -> Result<ArmResponse, ArmError> {
        self.record("DELETE", id);
        let removed = lock(&self.objects).remove(&id.to_lowercase());
        Ok(ArmResponse::new(if removed.is_some() { 200 } else { 204 }, None))
    }
}
