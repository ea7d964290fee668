use serde_json::{json, Map, Value};

/// A text value paired with a free-form category label ("Home", "Mobile", ...).
/// The label may be empty; the text of a retained pair never is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labeled {
    pub text: String,
    pub label: String,
}

impl Labeled {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// One contact record. Every field is absent by default, and absence is the
/// canonical form of "empty": `comments` is never `Some("")` and the list
/// fields treat an empty vec as absent. The record does not carry a name;
/// the name is the file the record lives in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub address: Option<Labeled>,
    pub phones: Vec<Labeled>,
    pub mails: Vec<Labeled>,
    pub comments: Option<String>,
}

impl Contact {
    /// True iff no recognized field is present.
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.phones.is_empty()
            && self.mails.is_empty()
            && self.comments.is_none()
    }

    /// Extract a record from a parsed JSON document, field by field.
    /// A key that is missing or wrongly shaped is skipped; a partially
    /// malformed document still yields whatever fields it does carry.
    pub fn from_value(value: &Value) -> Self {
        let mut contact = Contact::default();
        let Some(map) = value.as_object() else {
            return contact;
        };

        if let Some(pair) = map.get("address").and_then(labeled_from_value) {
            contact.address = Some(pair);
        }
        if let Some(entries) = map.get("phones").and_then(Value::as_array) {
            contact.phones = entries.iter().filter_map(labeled_from_value).collect();
        }
        if let Some(entries) = map.get("mails").and_then(Value::as_array) {
            contact.mails = entries.iter().filter_map(labeled_from_value).collect();
        }
        if let Some(text) = map.get("comments").and_then(Value::as_str) {
            if !text.is_empty() {
                contact.comments = Some(text.to_string());
            }
        }

        contact
    }

    /// Serialize to a JSON map in field insertion order, omitting absent
    /// fields entirely.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(address) = &self.address {
            map.insert("address".to_string(), labeled_to_value(address));
        }
        if !self.phones.is_empty() {
            map.insert(
                "phones".to_string(),
                Value::Array(self.phones.iter().map(labeled_to_value).collect()),
            );
        }
        if !self.mails.is_empty() {
            map.insert(
                "mails".to_string(),
                Value::Array(self.mails.iter().map(labeled_to_value).collect()),
            );
        }
        if let Some(comments) = &self.comments {
            map.insert("comments".to_string(), json!(comments));
        }
        Value::Object(map)
    }
}

/// On-disk pair shape: `["text", "label"]`. A pair with empty or missing
/// text is not retained; a missing or non-string label reads as empty.
fn labeled_from_value(value: &Value) -> Option<Labeled> {
    let items = value.as_array()?;
    let text = items.first()?.as_str()?;
    if text.is_empty() {
        return None;
    }
    let label = items.get(1).and_then(Value::as_str).unwrap_or("");
    Some(Labeled::new(text, label))
}

fn labeled_to_value(pair: &Labeled) -> Value {
    json!([pair.text, pair.label])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_record() {
        let contact = Contact::default();
        assert!(contact.is_empty());
        assert_eq!(contact.to_value(), json!({}));
    }

    #[test]
    fn test_is_empty_per_field() {
        let mut contact = Contact::default();
        contact.comments = Some("note".to_string());
        assert!(!contact.is_empty());

        let mut contact = Contact::default();
        contact.phones.push(Labeled::new("555-1234", "Mobile"));
        assert!(!contact.is_empty());

        let mut contact = Contact::default();
        contact.address = Some(Labeled::new("123 Main St", ""));
        assert!(!contact.is_empty());
    }

    #[test]
    fn test_from_value_full_record() {
        let value = json!({
            "address": ["123 Main St", "Home"],
            "phones": [["555-1234", "Mobile"], ["555-9876", "Work"]],
            "mails": [["alice@example.com", "Home"]],
            "comments": "met at the conference"
        });

        let contact = Contact::from_value(&value);
        assert_eq!(contact.address, Some(Labeled::new("123 Main St", "Home")));
        assert_eq!(contact.phones.len(), 2);
        assert_eq!(contact.phones[1], Labeled::new("555-9876", "Work"));
        assert_eq!(contact.mails, vec![Labeled::new("alice@example.com", "Home")]);
        assert_eq!(contact.comments.as_deref(), Some("met at the conference"));
    }

    #[test]
    fn test_from_value_skips_malformed_fields() {
        // address is the wrong shape, one phone entry is junk; the rest of
        // the document still loads.
        let value = json!({
            "address": "not a pair",
            "phones": [["555-1234", "Mobile"], 42, ["", "Work"]],
            "comments": "still here"
        });

        let contact = Contact::from_value(&value);
        assert_eq!(contact.address, None);
        assert_eq!(contact.phones, vec![Labeled::new("555-1234", "Mobile")]);
        assert_eq!(contact.comments.as_deref(), Some("still here"));
    }

    #[test]
    fn test_from_value_non_object() {
        assert!(Contact::from_value(&json!([1, 2, 3])).is_empty());
        assert!(Contact::from_value(&json!(null)).is_empty());
    }

    #[test]
    fn test_empty_comments_collapse_to_absent() {
        let with_empty = Contact::from_value(&json!({ "comments": "" }));
        let without = Contact::from_value(&json!({}));
        assert_eq!(with_empty, without);
        assert!(with_empty.is_empty());
    }

    #[test]
    fn test_pair_without_label() {
        let contact = Contact::from_value(&json!({ "phones": [["555-1234"]] }));
        assert_eq!(contact.phones, vec![Labeled::new("555-1234", "")]);
    }

    #[test]
    fn test_to_value_round_trip() {
        let contact = Contact {
            address: Some(Labeled::new("123 Main St", "Home")),
            phones: vec![Labeled::new("555-1234", "Mobile")],
            mails: Vec::new(),
            comments: Some("Привет".to_string()),
        };

        let reloaded = Contact::from_value(&contact.to_value());
        assert_eq!(reloaded, contact);
    }

    #[test]
    fn test_to_value_field_order() {
        let contact = Contact {
            address: Some(Labeled::new("a", "")),
            phones: vec![Labeled::new("p", "")],
            mails: vec![Labeled::new("m", "")],
            comments: Some("c".to_string()),
        };

        let value = contact.to_value();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["address", "phones", "mails", "comments"]);
    }
}
