//! Partial document updates.
//!
//! A patch sets fields (`set`), removes them (`unset`) and appends to array
//! fields (`push`). Set and unset fields may be dotted paths such as
//! `premium.reset.attempts`, which touch only that leaf of a sub-document.
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    pub set: Map<String, Value>,
    pub unset: Vec<String>,
    pub push: Vec<(String, Value)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_set(set: Map<String, Value>) -> Self {
        Self {
            set,
            ..Self::default()
        }
    }

    pub fn set(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.set.insert(field.to_string(), value.into());
        self
    }

    pub fn unset(mut self, field: &str) -> Self {
        self.unset.push(field.to_string());
        self
    }

    pub fn push(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.push.push((field.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.unset.is_empty() && self.push.is_empty()
    }

    /// Apply to document content in place. Missing or non-object parents of
    /// a dotted set path become empty objects. A push onto a missing or
    /// non-array field starts a fresh array.
    pub fn apply(&self, content: &mut Map<String, Value>) {
        for (field, value) in &self.set {
            let (parent, leaf) = parent_of(content, field, true);
            if let Some(parent) = parent {
                parent.insert(leaf.to_string(), value.clone());
            }
        }
        for field in &self.unset {
            let (parent, leaf) = parent_of(content, field, false);
            if let Some(parent) = parent {
                parent.remove(leaf);
            }
        }
        for (field, value) in &self.push {
            match content.get_mut(field) {
                Some(Value::Array(items)) => items.push(value.clone()),
                _ => {
                    content.insert(field.clone(), Value::Array(vec![value.clone()]));
                }
            }
        }
    }
}

/// Walk to the object holding the last segment of `path`.
fn parent_of<'a, 'p>(
    content: &'a mut Map<String, Value>,
    path: &'p str,
    create: bool,
) -> (Option<&'a mut Map<String, Value>>, &'p str) {
    let (head, leaf) = match path.rsplit_once('.') {
        Some((head, leaf)) => (Some(head), leaf),
        None => (None, path),
    };
    let Some(head) = head else {
        return (Some(content), leaf);
    };
    let mut current = content;
    for segment in head.split('.') {
        if create {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
        }
        match current.get_mut(segment) {
            Some(Value::Object(next)) => current = next,
            _ => return (None, leaf),
        }
    }
    (Some(current), leaf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn set_replaces_and_push_appends() {
        let mut content = obj(json!({"name": "old", "comments": [{"text": "a"}]}));
        Patch::new()
            .set("name", "new")
            .push("comments", json!({"text": "b"}))
            .push("sharedPending", json!({"url": "u", "description": ""}))
            .apply(&mut content);
        assert_eq!(
            Value::Object(content),
            json!({
                "name": "new",
                "comments": [{"text": "a"}, {"text": "b"}],
                "sharedPending": [{"url": "u", "description": ""}]
            })
        );
    }

    #[test]
    fn dotted_paths_touch_only_their_leaf() {
        let mut content = obj(json!({
            "premium": {"login": "ivan", "sessionToken": "t", "reset": {"attempts": 1}}
        }));
        Patch::new()
            .set("premium.reset.attempts", 2)
            .unset("premium.sessionToken")
            .unset("premium.missing.leaf")
            .set("stats.views", 1)
            .apply(&mut content);
        assert_eq!(
            Value::Object(content),
            json!({
                "premium": {"login": "ivan", "reset": {"attempts": 2}},
                "stats": {"views": 1}
            })
        );
    }

    #[test]
    fn empty_patch_reports_empty() {
        assert!(Patch::new().is_empty());
        assert!(!Patch::new().set("a", 1).is_empty());
        assert!(!Patch::new().unset("a").is_empty());
    }
}
