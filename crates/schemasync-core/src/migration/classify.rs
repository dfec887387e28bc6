//! Safety classification of field updates.
//!
//! A field present in both schemas is compared attribute by attribute. Each
//! difference is described; differences that may reject or destroy existing
//! values mark the whole update as unsafe.

use super::operation::OperationKind;
use crate::schema::{
    DateOptions, DomainOptions, Field, FieldKind, FileOptions, JsonOptions, NumberOptions,
    RelationOptions, SelectOptions, TextOptions,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fmt::Display;

/// Outcome of comparing two versions of a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldClassification {
    /// Human-readable changes, in comparison order.
    pub changes: Vec<String>,
    /// Whether any change may violate existing data.
    pub is_unsafe: bool,
    /// Whether the field type itself changed.
    pub type_changed: bool,
}

impl FieldClassification {
    /// Check if the two versions are equivalent.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Operation kind this classification maps to, if any change exists.
    pub fn operation_kind(&self) -> Option<OperationKind> {
        if self.is_empty() {
            None
        } else if self.type_changed {
            Some(OperationKind::TypeChange)
        } else if self.is_unsafe {
            Some(OperationKind::UnsafeFieldUpdate)
        } else {
            Some(OperationKind::UpdateField)
        }
    }
}

/// Compare the current (`old`) and desired (`new`) version of a field.
pub fn classify_field(old: &Field, new: &Field) -> FieldClassification {
    let mut changes = Changes::default();

    if old.type_name() != new.type_name() {
        changes.flag(format!("type {} -> {}", old.type_name(), new.type_name()));
        let mut result = changes.finish();
        result.type_changed = true;
        compare_flags(old, new, &mut result);
        return result;
    }

    compare_kinds(&old.kind, &new.kind, &mut changes);
    let mut result = changes.finish();
    compare_flags(old, new, &mut result);
    result
}

fn compare_flags(old: &Field, new: &Field, result: &mut FieldClassification) {
    let mut changes = Changes::default();

    match (old.required, new.required) {
        (false, true) => changes.flag("now required"),
        (true, false) => changes.note("no longer required"),
        _ => {}
    }
    match (old.unique, new.unique) {
        (false, true) => changes.flag("now unique"),
        (true, false) => changes.note("no longer unique"),
        _ => {}
    }

    let flags = changes.finish();
    result.is_unsafe |= flags.is_unsafe;
    result.changes.extend(flags.changes);
}

fn compare_kinds(old: &FieldKind, new: &FieldKind, changes: &mut Changes) {
    match (old, new) {
        (FieldKind::Text(a), FieldKind::Text(b)) => a.compare(b, changes),
        (FieldKind::Number(a), FieldKind::Number(b)) => a.compare(b, changes),
        (FieldKind::Email(a), FieldKind::Email(b)) | (FieldKind::Url(a), FieldKind::Url(b)) => {
            a.compare(b, changes)
        }
        (FieldKind::Date(a), FieldKind::Date(b)) => a.compare(b, changes),
        (FieldKind::Select(a), FieldKind::Select(b)) => a.compare(b, changes),
        (FieldKind::Json(a), FieldKind::Json(b)) => a.compare(b, changes),
        (FieldKind::File(a), FieldKind::File(b)) => a.compare(b, changes),
        (FieldKind::Relation(a), FieldKind::Relation(b)) => a.compare(b, changes),
        _ => {}
    }
}

#[derive(Default)]
struct Changes {
    descriptions: Vec<String>,
    is_unsafe: bool,
}

impl Changes {
    /// Record a descriptive change.
    fn note(&mut self, description: impl Into<String>) {
        self.descriptions.push(description.into());
    }

    /// Record a change that may violate existing data.
    fn flag(&mut self, description: impl Into<String>) {
        self.is_unsafe = true;
        self.descriptions.push(description.into());
    }

    fn value<T: PartialEq + Display>(&mut self, label: &str, old: &Option<T>, new: &Option<T>) {
        if old != new {
            self.note(format!("{} {} -> {}", label, show(old), show(new)));
        }
    }

    fn toggle<T: PartialEq + std::fmt::Debug>(&mut self, label: &str, old: &T, new: &T) {
        if old != new {
            self.note(format!("{} {:?} -> {:?}", label, old, new));
        }
    }

    fn lower_bound<T: PartialOrd + Display>(&mut self, label: &str, old: &Option<T>, new: &Option<T>) {
        match Bound::lower(old.as_ref(), new.as_ref()) {
            Bound::Unchanged => {}
            Bound::Widened => self.note(format!("{} {} -> {}", label, show(old), show(new))),
            Bound::Tightened => self.flag(format!("{} {} -> {}", label, show(old), show(new))),
        }
    }

    fn upper_bound<T: PartialOrd + Display>(&mut self, label: &str, old: &Option<T>, new: &Option<T>) {
        match Bound::upper(old.as_ref(), new.as_ref()) {
            Bound::Unchanged => {}
            Bound::Widened => self.note(format!("{} {} -> {}", label, show(old), show(new))),
            Bound::Tightened => self.flag(format!("{} {} -> {}", label, show(old), show(new))),
        }
    }

    fn finish(self) -> FieldClassification {
        FieldClassification {
            changes: self.descriptions,
            is_unsafe: self.is_unsafe,
            type_changed: false,
        }
    }
}

fn show<T: Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "unset".to_string(),
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Bound {
    Unchanged,
    Widened,
    Tightened,
}

impl Bound {
    fn lower<T: PartialOrd>(old: Option<&T>, new: Option<&T>) -> Self {
        match (old, new) {
            (None, None) => Bound::Unchanged,
            (None, Some(_)) => Bound::Tightened,
            (Some(_), None) => Bound::Widened,
            (Some(a), Some(b)) if b > a => Bound::Tightened,
            (Some(a), Some(b)) if b < a => Bound::Widened,
            _ => Bound::Unchanged,
        }
    }

    fn upper<T: PartialOrd>(old: Option<&T>, new: Option<&T>) -> Self {
        match (old, new) {
            (None, None) => Bound::Unchanged,
            (None, Some(_)) => Bound::Tightened,
            (Some(_), None) => Bound::Widened,
            (Some(a), Some(b)) if b < a => Bound::Tightened,
            (Some(a), Some(b)) if b > a => Bound::Widened,
            _ => Bound::Unchanged,
        }
    }
}

/// Per-type option comparison.
trait CompareOptions {
    fn compare(&self, new: &Self, changes: &mut Changes);
}

impl CompareOptions for TextOptions {
    fn compare(&self, new: &Self, changes: &mut Changes) {
        changes.lower_bound("min length", &self.min, &new.min);
        changes.upper_bound("max length", &self.max, &new.max);
        if self.pattern != new.pattern {
            changes.note("pattern changed");
        }
    }
}

impl CompareOptions for NumberOptions {
    fn compare(&self, new: &Self, changes: &mut Changes) {
        changes.lower_bound("min", &self.min, &new.min);
        changes.upper_bound("max", &self.max, &new.max);
        changes.toggle("noDecimal", &self.no_decimal, &new.no_decimal);
    }
}

impl CompareOptions for DomainOptions {
    fn compare(&self, new: &Self, changes: &mut Changes) {
        if self.except_domains != new.except_domains {
            changes.note("exceptDomains changed");
        }
        if self.only_domains != new.only_domains {
            changes.note("onlyDomains changed");
        }
    }
}

impl CompareOptions for DateOptions {
    fn compare(&self, new: &Self, changes: &mut Changes) {
        date_bound(changes, "min date", &self.min, &new.min, true);
        date_bound(changes, "max date", &self.max, &new.max, false);
    }
}

impl CompareOptions for SelectOptions {
    fn compare(&self, new: &Self, changes: &mut Changes) {
        let removed: Vec<&str> = self
            .values
            .iter()
            .filter(|v| !new.values.contains(v))
            .map(String::as_str)
            .collect();
        let added: Vec<&str> = new
            .values
            .iter()
            .filter(|v| !self.values.contains(v))
            .map(String::as_str)
            .collect();

        if !removed.is_empty() {
            changes.flag(format!("values removed: {}", removed.join(", ")));
        }
        if !added.is_empty() {
            changes.note(format!("values added: {}", added.join(", ")));
        }
        changes.value("maxSelect", &self.max_select, &new.max_select);
    }
}

impl CompareOptions for JsonOptions {
    fn compare(&self, new: &Self, changes: &mut Changes) {
        changes.value("maxSize", &self.max_size, &new.max_size);
    }
}

impl CompareOptions for FileOptions {
    fn compare(&self, new: &Self, changes: &mut Changes) {
        changes.value("maxSelect", &self.max_select, &new.max_select);
        changes.value("maxSize", &self.max_size, &new.max_size);
        if self.mime_types != new.mime_types {
            changes.note("mimeTypes changed");
        }
        if self.thumbs != new.thumbs {
            changes.note("thumbs changed");
        }
        changes.toggle("protected", &self.protected, &new.protected);
    }
}

impl CompareOptions for RelationOptions {
    fn compare(&self, new: &Self, changes: &mut Changes) {
        if self.collection_id != new.collection_id {
            changes.note(format!(
                "collectionId {} -> {}",
                self.collection_id, new.collection_id
            ));
        }
        changes.toggle("cascadeDelete", &self.cascade_delete, &new.cascade_delete);
        changes.value("minSelect", &self.min_select, &new.min_select);
        changes.value("maxSelect", &self.max_select, &new.max_select);
    }
}

/// Compare date bounds. Bounds that cannot be parsed are only described.
fn date_bound(
    changes: &mut Changes,
    label: &str,
    old: &Option<String>,
    new: &Option<String>,
    lower: bool,
) {
    if old == new {
        return;
    }

    let parsed_old = old.as_deref().map(parse_date);
    let parsed_new = new.as_deref().map(parse_date);

    let comparable = !matches!(parsed_old, Some(None)) && !matches!(parsed_new, Some(None));
    if !comparable {
        changes.note(format!("{} {} -> {}", label, show(old), show(new)));
        return;
    }

    let old_ts = parsed_old.flatten();
    let new_ts = parsed_new.flatten();
    let bound = if lower {
        Bound::lower(old_ts.as_ref(), new_ts.as_ref())
    } else {
        Bound::upper(old_ts.as_ref(), new_ts.as_ref())
    };

    let description = format!("{} {} -> {}", label, show(old), show(new));
    match bound {
        Bound::Tightened => changes.flag(description),
        _ => changes.note(description),
    }
}

fn parse_date(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.fZ") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
