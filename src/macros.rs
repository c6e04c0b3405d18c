#[macro_export]
macro_rules! glyph {
    // Handle null
    (null) => {
        $crate::Value::Null
    };

    // Handle true
    (true) => {
        $crate::Value::Bool(true)
    };

    // Handle false
    (false) => {
        $crate::Value::Bool(false)
    };

    // Handle empty list
    ([]) => {
        $crate::Value::List(vec![])
    };

    // Handle non-empty list
    ([ $($elem:tt),* $(,)? ]) => {
        $crate::Value::List(vec![$($crate::glyph!($elem)),*])
    };

    // Handle empty map
    ({}) => {
        $crate::Value::Map($crate::GlyphMap::new())
    };

    // Handle non-empty map
    ({ $($key:literal : $value:tt),* $(,)? }) => {{
        let mut map = $crate::GlyphMap::new();
        $(
            map.insert($key.to_string(), $crate::glyph!($value));
        )*
        $crate::Value::Map(map)
    }};

    // Fallback for any expression
    ($other:expr) => {{
        $crate::to_value(&$other).unwrap_or($crate::Value::Null)
    }};
}

#[cfg(test)]
mod tests {
    use crate::{GlyphMap, Value};

    #[test]
    fn test_glyph_macro_primitives() {
        assert_eq!(glyph!(null), Value::Null);
        assert_eq!(glyph!(true), Value::Bool(true));
        assert_eq!(glyph!(false), Value::Bool(false));
        assert_eq!(glyph!(42), Value::Int(42));
        assert_eq!(glyph!(3.5), Value::Float(3.5));
        assert_eq!(glyph!("hello"), Value::Str("hello".to_string()));
    }

    #[test]
    fn test_glyph_macro_lists() {
        assert_eq!(glyph!([]), Value::List(vec![]));

        let list = glyph!([1, 2, 3]);
        match list {
            Value::List(items) => {
                assert_eq!(items, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
            }
            _ => panic!("Expected list"),
        }
    }

    #[test]
    fn test_glyph_macro_maps() {
        assert_eq!(glyph!({}), Value::Map(GlyphMap::new()));

        let map = glyph!({
            "name": "Alice",
            "age": 30
        });

        match map {
            Value::Map(map) => {
                assert_eq!(map.len(), 2);
                assert_eq!(map.get("name"), Some(&Value::Str("Alice".to_string())));
                assert_eq!(map.get("age"), Some(&Value::Int(30)));
            }
            _ => panic!("Expected map"),
        }
    }

    #[test]
    fn test_glyph_macro_nested() {
        let value = glyph!({
            "user": { "name": "Ada", "tags": ["admin", "math"] },
            "active": true
        });
        let map = value.as_map().unwrap();
        let user = map.get("user").unwrap().as_map().unwrap();
        assert_eq!(user.get("tags").unwrap().as_list().unwrap().len(), 2);
    }
}
