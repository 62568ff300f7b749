use std::collections::HashSet;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;
use tracing::warn;

/// Entity-set names declared in a `$metadata` CSDL document, in document order.
///
/// Comments are skipped and attribute entities are unescaped. A malformed
/// document yields the names read before the error.
pub fn entity_sets_from_metadata(xml: &str) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut names = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"EntitySet" => {
                if let Some(name) = entity_set_name(&e) {
                    names.push(name);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(position = reader.buffer_position(), error = %e, "metadata XML parse error");
                break;
            }
            _ => {}
        }
    }
    names
}

fn entity_set_name(element: &BytesStart) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == b"Name")
        .and_then(|attr| attr.unescape_value().ok())
        .map(|name| name.into_owned())
        .filter(|name| !name.is_empty())
}

/// Entity-set names listed in a JSON service document.
///
/// Understands the OData v4 shape (`{"value":[{"name":..,"url":..}]}`) and the
/// v2 shape (`{"d":{"EntitySets":[..]}}`). Anything else yields nothing.
pub fn entity_sets_from_service_document(body: &str) -> Vec<String> {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };

    let mut names = Vec::new();
    if let Some(entries) = json.get("value").and_then(Value::as_array) {
        for entry in entries {
            for key in ["url", "name"] {
                if let Some(name) = entry.get(key).and_then(Value::as_str) {
                    names.push(name.to_owned());
                }
            }
        }
    }
    if let Some(entries) = json.pointer("/d/EntitySets").and_then(Value::as_array) {
        names.extend(entries.iter().filter_map(Value::as_str).map(str::to_owned));
    }
    names
}

/// Names containing any keyword (case-insensitive), exact duplicates dropped.
pub fn matching_names<'a, I>(names: I, keywords: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    let mut seen = HashSet::new();

    names
        .into_iter()
        .filter(|name| {
            let lowered = name.to_lowercase();
            keywords.iter().any(|k| lowered.contains(k.as_str()))
        })
        .cloned()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
