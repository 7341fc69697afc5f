/// Builds a [`Value`](crate::Value) from JSON-like syntax.
///
/// Leaves are any expression convertible with `Value::from`; wrap negative
/// numbers and other multi-token expressions in parentheses.
///
/// ```rust
/// use jsonbind::{json, Value};
///
/// let user = json!({
///     "name": "Alice",
///     "age": 30,
///     "balance": (-12.5),
///     "tags": ["admin", null, true]
/// });
/// assert_eq!(user["tags"][0].as_str(), Some("admin"));
/// assert_eq!(user.to_string(), r#"{"name":"Alice","age":30,"balance":-12.5,"tags":["admin",null,true]}"#);
/// ```
#[macro_export]
macro_rules! json {
    (null) => {
        $crate::Value::Null
    };

    (true) => {
        $crate::Value::Bool(true)
    };

    (false) => {
        $crate::Value::Bool(false)
    };

    ([]) => {
        $crate::Value::Array(::std::vec::Vec::new())
    };

    ([ $($elem:tt),+ $(,)? ]) => {
        $crate::Value::Array(::std::vec![$($crate::json!($elem)),+])
    };

    ({}) => {
        $crate::Value::Object($crate::JsonMap::new())
    };

    ({ $($key:literal : $value:tt),+ $(,)? }) => {{
        let mut object = $crate::JsonMap::new();
        $(
            object.insert(::std::string::String::from($key), $crate::json!($value));
        )+
        $crate::Value::Object(object)
    }};

    ($other:expr) => {
        $crate::Value::from($other)
    };
}
