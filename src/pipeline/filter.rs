//! Structural filter matching.
//!
//! A filter specification is shaped like a partial listing and is matched
//! against listing records key by key:
//!
//! | record | filter             | verdict                                      |
//! |--------|--------------------|----------------------------------------------|
//! | object | object             | every filter key matches (absent keys pass)  |
//! | array  | array              | each sub-filter matches at least one element |
//! | string | string             | regex matches at the start of the string     |
//! | number | number             | equal as `f64`                               |
//! | number | `[x]`              | equal to `x`                                 |
//! | number | `[lo, hi]`         | `lo <= value <= hi`                          |
//!
//! Any other combination is settled by [`TypeMismatch`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Verdict for a filter key whose record and filter shapes match no rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeMismatch {
    /// The key fails and the record is rejected
    #[default]
    Reject,
    /// The key imposes no constraint
    Accept,
}

impl TypeMismatch {
    fn verdict(self) -> bool {
        self == TypeMismatch::Accept
    }
}

/// A string filter value that is not a valid regular expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedPattern {
    /// Dotted location inside the filter, e.g. `details.properties[0].key`
    pub path: String,
    pub pattern: String,
    pub error: String,
}

/// Compiled form of a filter specification node.
#[derive(Debug, Clone)]
enum Pattern {
    Object(Vec<(String, Pattern)>),
    List(Vec<Pattern>),
    Text(TextPattern),
    Number(f64),
    /// Booleans and nulls: no rule compares against them
    Inert,
}

#[derive(Debug, Clone)]
struct TextPattern {
    /// `None` when the source was not a valid regex; never matches
    regex: Option<Regex>,
    /// Numeric reading of the source, used when it serves as a range bound
    number: Option<f64>,
}

impl TextPattern {
    fn compile(source: &str, path: &str, malformed: &mut Vec<MalformedPattern>) -> Self {
        // Validate the raw pattern first so a stray `)` cannot escape the anchor group.
        let regex = Regex::new(source)
            .and_then(|_| Regex::new(&format!(r"\A(?:{})", source)));
        let number = source.trim().parse::<f64>().ok();
        match regex {
            Ok(regex) => Self {
                regex: Some(regex),
                number,
            },
            Err(e) => {
                log::warn!("Filter pattern {:?} at {} is not a valid regex: {}", source, path, e);
                malformed.push(MalformedPattern {
                    path: path.to_string(),
                    pattern: source.to_string(),
                    error: e.to_string(),
                });
                Self {
                    regex: None,
                    number,
                }
            }
        }
    }

    fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(text))
    }
}

impl Pattern {
    /// Range bound value: numbers, and strings that read as numbers.
    fn bound(&self) -> Option<f64> {
        match self {
            Pattern::Number(x) => Some(*x),
            Pattern::Text(text) => text.number,
            _ => None,
        }
    }

    fn compile(spec: &Value, path: &str, malformed: &mut Vec<MalformedPattern>) -> Self {
        match spec {
            Value::Object(map) => Pattern::Object(
                map.iter()
                    .map(|(key, value)| {
                        let child = if path.is_empty() {
                            key.clone()
                        } else {
                            format!("{}.{}", path, key)
                        };
                        (key.clone(), Pattern::compile(value, &child, malformed))
                    })
                    .collect(),
            ),
            Value::Array(items) => Pattern::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| Pattern::compile(item, &format!("{}[{}]", path, i), malformed))
                    .collect(),
            ),
            Value::String(s) => Pattern::Text(TextPattern::compile(s, path, malformed)),
            Value::Number(n) => match n.as_f64() {
                Some(x) => Pattern::Number(x),
                None => Pattern::Inert,
            },
            Value::Bool(_) | Value::Null => Pattern::Inert,
        }
    }
}

/// A compiled filter specification.
#[derive(Debug, Clone)]
pub struct Filter {
    root: Pattern,
    on_mismatch: TypeMismatch,
    malformed: Vec<MalformedPattern>,
}

impl Filter {
    /// Compile a filter specification.
    ///
    /// Invalid regexes do not fail compilation; the affected keys never match.
    pub fn compile(spec: &Value, on_mismatch: TypeMismatch) -> Self {
        let mut malformed = Vec::new();
        let root = Pattern::compile(spec, "", &mut malformed);
        Self {
            root,
            on_mismatch,
            malformed,
        }
    }

    /// String filter values that failed to compile as regexes.
    pub fn malformed_patterns(&self) -> &[MalformedPattern] {
        &self.malformed
    }

    /// Whether `record` satisfies the filter.
    pub fn matches(&self, record: &Value) -> bool {
        self.match_value(record, &self.root)
    }

    /// Keep the records that satisfy the filter, in order.
    ///
    /// Records that cannot be represented as JSON are dropped.
    pub fn select<T: Serialize>(&self, records: Vec<T>) -> Vec<T> {
        records
            .into_iter()
            .filter(|record| match serde_json::to_value(record) {
                Ok(value) => self.matches(&value),
                Err(e) => {
                    log::warn!("Dropping record that does not serialize: {}", e);
                    false
                }
            })
            .collect()
    }

    fn match_value(&self, record: &Value, pattern: &Pattern) -> bool {
        match (record, pattern) {
            (Value::Object(fields), Pattern::Object(keys)) => {
                keys.iter().all(|(key, sub)| match fields.get(key) {
                    Some(value) => self.match_value(value, sub),
                    None => true,
                })
            }
            (Value::Array(items), Pattern::List(subs)) => subs
                .iter()
                .all(|sub| items.iter().any(|item| self.match_value(item, sub))),
            (Value::String(text), Pattern::Text(text_pattern)) => text_pattern.is_match(text),
            (Value::Number(n), Pattern::Number(expected)) => {
                n.as_f64().is_some_and(|x| x == *expected)
            }
            (Value::Number(n), Pattern::List(bounds)) => {
                let bounds: Option<Vec<f64>> = bounds.iter().map(Pattern::bound).collect();
                match (n.as_f64(), bounds.as_deref()) {
                    (Some(x), Some([only])) => x == *only,
                    (Some(x), Some([lo, hi])) => *lo <= x && x <= *hi,
                    _ => self.on_mismatch.verdict(),
                }
            }
            _ => self.on_mismatch.verdict(),
        }
    }
}

/// Match one record against a filter specification with the default policy.
pub fn matches(record: &Value, spec: &Value) -> bool {
    Filter::compile(spec, TypeMismatch::default()).matches(record)
}

/// Keep the records matching `spec`; without a spec every record is kept.
pub fn select(records: Vec<Value>, spec: Option<&Value>) -> Vec<Value> {
    match spec {
        Some(spec) => Filter::compile(spec, TypeMismatch::default()).select(records),
        None => records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rooms(n: f64) -> Value {
        json!({ "rooms": n })
    }

    #[test]
    fn test_empty_spec_keeps_everything() {
        let records = vec![json!({"id": "b"}), json!({}), json!({"id": "a", "rooms": 3})];
        assert_eq!(select(records.clone(), Some(&json!({}))), records);
    }

    #[test]
    fn test_no_spec_keeps_everything() {
        let records = vec![json!({"id": "b"}), json!({"id": "a"})];
        assert_eq!(select(records.clone(), None), records);
    }

    #[test]
    fn test_missing_key_is_vacuous() {
        assert!(matches(&json!({}), &json!({"color": "red"})));
        assert!(matches(&json!({"details": {}}), &json!({"details": {"rooms": [2, 3]}})));
    }

    #[test]
    fn test_numeric_range() {
        let spec = json!({"rooms": [2, 3]});
        for kept in [2.0, 2.5, 3.0] {
            assert!(matches(&rooms(kept), &spec), "{} should match", kept);
        }
        for rejected in [1.9, 3.1] {
            assert!(!matches(&rooms(rejected), &spec), "{} should not match", rejected);
        }
    }

    #[test]
    fn test_numeric_equality_and_singleton_range() {
        assert!(matches(&json!({"floor": 2}), &json!({"floor": 2.0})));
        assert!(!matches(&json!({"floor": 3}), &json!({"floor": 2})));
        assert!(matches(&json!({"floor": 2}), &json!({"floor": [2]})));
        assert!(!matches(&json!({"floor": 1}), &json!({"floor": [2]})));
    }

    #[test]
    fn test_regex_anchored_at_start_only() {
        let spec = json!({"title": "Wohnung"});
        assert!(matches(&json!({"title": "Wohnung in Altona"}), &spec));
        assert!(!matches(&json!({"title": "Schöne Wohnung"}), &spec));

        let alternation = json!({"title": "Altona|Eimsbüttel"});
        assert!(matches(&json!({"title": "Eimsbüttel, 2 Zimmer"}), &alternation));
        assert!(!matches(&json!({"title": "2 Zimmer in Eimsbüttel"}), &alternation));
    }

    #[test]
    fn test_sequence_existential_match() {
        let spec = json!({"properties": [{"key": "Zimmer", "value": [2, 3]}]});
        let kept = json!({"properties": [
            {"key": "Etage", "value": 4},
            {"key": "Zimmer", "value": 2},
            {"key": "Balkon", "value": true}
        ]});
        let rejected = json!({"properties": [
            {"key": "Etage", "value": 2},
            {"key": "Zimmer", "value": 4}
        ]});

        assert!(matches(&kept, &spec));
        assert!(!matches(&rejected, &spec));
    }

    #[test]
    fn test_sequence_witnesses_may_differ() {
        let spec = json!({"properties": [
            {"key": "Zimmer", "value": [2, 3]},
            {"key": "Gesamtmiete", "value": [0, 900]}
        ]});
        let record = json!({"properties": [
            {"key": "Zimmer", "value": 3},
            {"key": "Gesamtmiete", "value": 812.5}
        ]});
        let too_expensive = json!({"properties": [
            {"key": "Zimmer", "value": 3},
            {"key": "Gesamtmiete", "value": 1200}
        ]});

        assert!(matches(&record, &spec));
        assert!(!matches(&too_expensive, &spec));
    }

    #[test]
    fn test_sequence_of_scalars() {
        let spec = json!({"tags": ["^Balkon"]});
        assert!(matches(&json!({"tags": ["Aufzug", "Balkon"]}), &spec));
        assert!(!matches(&json!({"tags": ["Aufzug"]}), &spec));
    }

    #[test]
    fn test_nested_objects_are_conjunctive() {
        let spec = json!({"details": {"address": {"zipcode": "^22", "district": "Altona"}}});
        let kept = json!({"details": {"address": {"zipcode": "22767", "district": "Altona-Nord"}}});
        let wrong_district =
            json!({"details": {"address": {"zipcode": "22767", "district": "Ottensen"}}});

        assert!(matches(&kept, &spec));
        assert!(!matches(&wrong_district, &spec));
    }

    #[test]
    fn test_malformed_regex_fails_only_that_key() {
        let filter = Filter::compile(&json!({"title": "(unclosed"}), TypeMismatch::Reject);
        assert_eq!(filter.malformed_patterns().len(), 1);
        assert_eq!(filter.malformed_patterns()[0].path, "title");

        assert!(!filter.matches(&json!({"title": "(unclosed"})));
        assert!(filter.matches(&json!({"rooms": 2})));
    }

    #[test]
    fn test_stray_paren_cannot_escape_anchor() {
        let filter = Filter::compile(&json!({"title": "a)|(b"}), TypeMismatch::Reject);
        assert_eq!(filter.malformed_patterns().len(), 1);
        assert!(!filter.matches(&json!({"title": "xb"})));
    }

    #[test]
    fn test_type_mismatch_policy() {
        let spec = json!({"balcony": 1, "details": [2, 3]});
        let record = json!({"balcony": true, "details": {"rooms": 2}});

        assert!(!Filter::compile(&spec, TypeMismatch::Reject).matches(&record));
        assert!(Filter::compile(&spec, TypeMismatch::Accept).matches(&record));
    }

    #[test]
    fn test_mismatch_does_not_depend_on_other_keys() {
        let failing_first = json!({"title": "^Haus", "balcony": 1});
        let mismatch_first = json!({"balcony": 1, "title": "^Haus"});
        let record = json!({"title": "Wohnung", "balcony": true});

        for spec in [failing_first, mismatch_first] {
            assert!(!Filter::compile(&spec, TypeMismatch::Accept).matches(&record));
        }
    }

    #[test]
    fn test_range_with_wrong_arity_is_mismatch() {
        let spec = json!({"rooms": [1, 2, 3]});
        assert!(!Filter::compile(&spec, TypeMismatch::Reject).matches(&rooms(2.0)));
        assert!(Filter::compile(&spec, TypeMismatch::Accept).matches(&rooms(2.0)));
    }

    #[test]
    fn test_range_bounds_accept_numeric_strings() {
        let spec = json!({"rooms": ["2", " 3.5 "]});
        assert!(matches(&rooms(2.0), &spec));
        assert!(matches(&rooms(3.5), &spec));
        assert!(!matches(&rooms(4.0), &spec));
        assert!(matches(&rooms(3.0), &json!({"rooms": ["3"]})));
        assert!(!matches(&rooms(3.0), &json!({"rooms": ["drei", 4]})));
        // A bare string is a regex, never a number.
        assert!(!matches(&rooms(3.0), &json!({"rooms": "3"})));
    }

    #[test]
    fn test_select_preserves_order() {
        let records = vec![rooms(3.0), rooms(1.0), rooms(2.0), rooms(4.0)];
        let kept = select(records, Some(&json!({"rooms": [2, 3]})));
        assert_eq!(kept, vec![rooms(3.0), rooms(2.0)]);
    }

    #[test]
    fn test_select_typed_records() {
        use crate::models::Listing;

        let listings = vec![
            Listing::new("A1").with_field("title", "Wohnung Altona"),
            Listing::new("B2").with_field("title", "Haus Blankenese"),
        ];
        let filter = Filter::compile(&json!({"title": "Wohnung"}), TypeMismatch::Reject);

        let kept = filter.select(listings);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "A1");
    }
}
