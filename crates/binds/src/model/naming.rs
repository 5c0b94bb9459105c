//! Table naming.

/// Converts a CamelCase model name into a snake_case table name.
///
/// An underscore is inserted before an uppercase letter that follows a
/// lowercase letter or digit, or that starts a new word after an acronym.
///
/// ```
/// use bindery_binds::model::table_name_for;
///
/// assert_eq!(table_name_for("FooBoundModel"), "foo_bound_model");
/// assert_eq!(table_name_for("HTTPLog"), "http_log");
/// assert_eq!(table_name_for("Child1"), "child1");
/// ```
pub fn table_name_for(model: &str) -> String {
    let chars: Vec<char> = model.chars().collect();
    let mut out = String::with_capacity(model.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
