use toml::{Table, Value};

/// Layers `{prefix}{sep}SECTION{sep}FIELD=value` environment variables onto `table`.
///
/// Path segments are lowercased. Values are kept as strings; every scope
/// setting is a string or a lowercase enum name.
pub fn load_env_vars(table: &mut Table, prefix: &str, separator: &str) {
    load_vars(table, prefix, separator, std::env::vars());
}

fn load_vars(
    table: &mut Table,
    prefix: &str,
    separator: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) {
    if separator.is_empty() {
        return;
    }
    let prefix_with_sep = format!("{prefix}{separator}");

    for (key, value) in vars {
        let Some(path) = key.strip_prefix(&prefix_with_sep) else {
            continue;
        };
        let segments: Vec<String> = path.split(separator).map(str::to_lowercase).collect();
        if segments.iter().any(String::is_empty) {
            continue;
        }
        insert_at_path(table, &segments, Value::String(value));
    }
}

fn insert_at_path(table: &mut Table, path: &[String], value: Value) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };

    if rest.is_empty() {
        table.insert(first.clone(), value);
        return;
    }

    if !matches!(table.get(first), Some(Value::Table(_))) {
        table.insert(first.clone(), Value::Table(Table::new()));
    }
    if let Some(Value::Table(nested)) = table.get_mut(first) {
        insert_at_path(nested, rest, value);
    }
}
