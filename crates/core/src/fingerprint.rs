use serde_json::Value;

/// Content hash of a tool-output delta plus its metadata. Object keys are
/// visited in sorted order so the hash does not depend on map iteration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeltaFingerprint(blake3::Hash);

impl DeltaFingerprint {
    pub fn of(tool_output: &Value, metadata: Option<&Value>) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"output:");
        feed_value(&mut hasher, tool_output);
        hasher.update(b"meta:");
        match metadata {
            Some(metadata) => feed_value(&mut hasher, metadata),
            None => {
                hasher.update(b"none;");
            }
        }
        Self(hasher.finalize())
    }

    pub fn to_hex(&self) -> String {
        self.0.to_hex().to_string()
    }
}

fn feed_value(hasher: &mut blake3::Hasher, value: &Value) {
    match value {
        Value::Null => {
            hasher.update(b"n;");
        }
        Value::Bool(v) => {
            hasher.update(if *v { b"t;" } else { b"f;" });
        }
        Value::Number(v) => {
            hasher.update(format!("d{v};").as_bytes());
        }
        Value::String(v) => {
            feed_str(hasher, b's', v);
        }
        Value::Array(values) => {
            hasher.update(format!("a{};", values.len()).as_bytes());
            for item in values {
                feed_value(hasher, item);
            }
        }
        Value::Object(values) => {
            let mut keys: Vec<&str> = values.keys().map(String::as_str).collect();
            keys.sort_unstable();
            hasher.update(format!("o{};", keys.len()).as_bytes());
            for key in keys {
                feed_str(hasher, b'k', key);
                if let Some(item) = values.get(key) {
                    feed_value(hasher, item);
                }
            }
        }
    }
}

fn feed_str(hasher: &mut blake3::Hasher, tag: u8, value: &str) {
    hasher.update(&[tag]);
    hasher.update(format!("{}:", value.len()).as_bytes());
    hasher.update(value.as_bytes());
}
