use proptest::prelude::*;
use serde_json::{Map, Value};

/// Text that exercises escaping: slashes, quotes, backslashes and
/// multi-byte characters.
pub fn tricky_text_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 /\\\\\"']{0,40}",
        "[ء-ي ]{1,20}",
        "[😀-🙏✓é/]{1,10}",
        Just("https://example.org/a/b?c=d".to_string()),
    ]
}

/// A JSON leaf or shallow structure.
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        tricky_text_strategy().prop_map(Value::String),
    ];
    leaf.prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// An update-shaped object: a message kind plus arbitrary extra fields.
pub fn update_object_strategy() -> impl Strategy<Value = Value> {
    (
        1i64..1_000_000,
        tricky_text_strategy(),
        prop::collection::btree_map("[a-z_]{1,8}", json_value_strategy(), 0..4),
    )
        .prop_map(|(update_id, text, extra)| {
            let mut message = Map::new();
            message.insert("text".into(), Value::String(text));
            message.insert("from".into(), serde_json::json!({"id": 1}));
            for (key, value) in extra {
                message.insert(key, value);
            }
            serde_json::json!({"update_id": update_id, "message": Value::Object(message)})
        })
}
