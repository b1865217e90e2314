// Mon Jan 19 2026 - Alex

use itertools::Itertools;
use serde_json::Value as Json;

/// Compact JSON with a stable key order: scalar-valued keys, then array-valued keys, then
/// object-valued keys, each group sorted by name.
pub fn render(value: &Json) -> String {
    let mut out = String::new();
    render_into(value, &mut out);
    out
}

fn group(value: &Json) -> u8 {
    match value {
        Json::Array(_) => 1,
        Json::Object(_) => 2,
        _ => 0,
    }
}

fn render_into(value: &Json, out: &mut String) {
    match value {
        Json::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render_into(item, out);
            }
            out.push(']');
        }
        Json::Object(map) => {
            out.push('{');
            let entries = map
                .iter()
                .sorted_by(|(a_key, a), (b_key, b)| group(a).cmp(&group(b)).then_with(|| a_key.cmp(b_key)));
            for (i, (key, item)) in entries.enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Json::String(key.clone()).to_string());
                out.push(':');
                render_into(item, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
