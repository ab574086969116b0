mod layout;
mod memory;

pub use journal_types::{FieldValue, Snapshot};
pub use layout::{DATE_FIELD, journal_layout};
pub use memory::MemoryForm;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Boolean,
    /// File pickers; only the selection count is ever recorded.
    FileMarker,
}

impl FieldKind {
    pub fn capture<S: FormSurface + ?Sized>(self, surface: &S, id: &str) -> FieldValue {
        match self {
            FieldKind::Text => FieldValue::Text(surface.text(id).unwrap_or_default()),
            FieldKind::Boolean => FieldValue::Flag(surface.checked(id)),
            FieldKind::FileMarker => FieldValue::Files {
                file_count: surface.file_count(id),
            },
        }
    }

    /// Writes `value` back onto the field. Returns `false` when the kind cannot
    /// be restored (file selections).
    pub fn restore<S: FormSurface + ?Sized>(
        self,
        surface: &mut S,
        id: &str,
        value: &FieldValue,
    ) -> bool {
        match self {
            FieldKind::Text => {
                surface.set_text(id, value.to_text());
                true
            }
            FieldKind::Boolean => {
                surface.set_checked(id, value.is_truthy());
                true
            }
            FieldKind::FileMarker => false,
        }
    }

    pub fn clear<S: FormSurface + ?Sized>(self, surface: &mut S, id: &str) {
        match self {
            FieldKind::Text => surface.set_text(id, String::new()),
            FieldKind::Boolean => surface.set_checked(id, false),
            FieldKind::FileMarker => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub id: String,
    pub label: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            kind,
        }
    }
}

pub trait FormSurface {
    fn descriptors(&self) -> Vec<FieldDescriptor>;

    fn kind_of(&self, id: &str) -> Option<FieldKind> {
        self.descriptors()
            .into_iter()
            .find(|descriptor| descriptor.id == id)
            .map(|descriptor| descriptor.kind)
    }

    fn text(&self, id: &str) -> Option<String>;
    fn set_text(&mut self, id: &str, value: String);
    fn checked(&self, id: &str) -> bool;
    fn set_checked(&mut self, id: &str, checked: bool);
    fn file_count(&self, id: &str) -> u32;
}

pub fn capture<S: FormSurface + ?Sized>(surface: &S) -> Snapshot {
    surface
        .descriptors()
        .into_iter()
        .map(|descriptor| {
            let value = descriptor.kind.capture(surface, &descriptor.id);
            (descriptor.id, value)
        })
        .collect()
}

/// Returns how many fields changed. Unknown ids and file fields are skipped.
pub fn apply<S: FormSurface + ?Sized>(surface: &mut S, snapshot: &Snapshot) -> usize {
    let mut applied = 0;
    for (id, value) in snapshot {
        let Some(kind) = surface.kind_of(id) else {
            trace!(field = %id, "skipping unknown field");
            continue;
        };
        if kind.restore(surface, id, value) {
            applied += 1;
        }
    }
    applied
}

/// Empties every restorable field except `keep`.
pub fn clear_fields<S: FormSurface + ?Sized>(surface: &mut S, keep: &str) {
    for descriptor in surface.descriptors() {
        if descriptor.id != keep {
            descriptor.kind.clear(surface, &descriptor.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> MemoryForm {
        let mut form = MemoryForm::journal();
        form.set_text(DATE_FIELD, "2024-03-01".to_string());
        form.set_text("title", "Leg day".to_string());
        form.set_text("mood", "Still Standing".to_string());
        form.set_checked("gymDay", true);
        form.select_files("progressPhotos", 3);
        form
    }

    #[test]
    fn captures_by_field_kind() {
        let snapshot = capture(&filled_form());
        assert_eq!(snapshot["title"], FieldValue::text("Leg day"));
        assert_eq!(snapshot["gymDay"], FieldValue::Flag(true));
        assert_eq!(snapshot["restDay"], FieldValue::Flag(false));
        assert_eq!(snapshot["era"], FieldValue::text(""));
        assert_eq!(snapshot["progressPhotos"], FieldValue::Files { file_count: 3 });
    }

    #[test]
    fn apply_of_capture_preserves_non_file_fields() {
        let source = filled_form();
        let snapshot = capture(&source);

        let mut target = MemoryForm::journal();
        apply(&mut target, &snapshot);

        let mut restored = capture(&target);
        let mut expected = snapshot.clone();
        restored.shift_remove("progressPhotos");
        expected.shift_remove("progressPhotos");
        assert_eq!(restored, expected);
        assert_eq!(target.file_count("progressPhotos"), 0);
    }

    #[test]
    fn apply_skips_unknown_and_file_fields() {
        let mut form = MemoryForm::journal();
        let mut snapshot = Snapshot::new();
        snapshot.insert("noSuchField".into(), FieldValue::text("x"));
        snapshot.insert("progressPhotos".into(), FieldValue::Files { file_count: 9 });
        snapshot.insert("weight".into(), serde_number(181));
        snapshot.insert("restDay".into(), FieldValue::text("yes"));

        assert_eq!(apply(&mut form, &snapshot), 2);
        assert_eq!(form.text("weight").as_deref(), Some("181"));
        assert!(form.checked("restDay"));
        assert_eq!(form.file_count("progressPhotos"), 0);
        assert_eq!(form.text("noSuchField"), None);
    }

    #[test]
    fn applying_empty_snapshot_is_noop() {
        let mut form = filled_form();
        let before = capture(&form);
        assert_eq!(apply(&mut form, &Snapshot::new()), 0);
        assert_eq!(capture(&form), before);
    }

    #[test]
    fn clear_keeps_date_and_files() {
        let mut form = filled_form();
        clear_fields(&mut form, DATE_FIELD);
        assert_eq!(form.text(DATE_FIELD).as_deref(), Some("2024-03-01"));
        assert_eq!(form.text("title").as_deref(), Some(""));
        assert!(!form.checked("gymDay"));
        assert_eq!(form.file_count("progressPhotos"), 3);
    }

    fn serde_number(n: u64) -> FieldValue {
        FieldValue::Number(n.into())
    }
}
