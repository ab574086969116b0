use crate::{FieldDescriptor, FieldKind};

pub const DATE_FIELD: &str = "date";

/// Fields of the journal page, in on-screen order.
pub fn journal_layout() -> Vec<FieldDescriptor> {
    use FieldKind::{Boolean, FileMarker, Text};

    [
        (DATE_FIELD, "Date", Text),
        ("title", "Title", Text),
        ("day", "Day", Text),
        ("mood", "Mood", Text),
        ("era", "Era", Text),
        ("relationshipStatus", "Singleness level", Text),
        ("entry", "Brain dump", Text),
        ("wins", "Wins", Text),
        ("triggers", "Triggers", Text),
        ("gymDay", "Gym day", Boolean),
        ("restDay", "Rest day", Boolean),
        ("arriveTime", "Arrived at gym", Text),
        ("timeSpent", "Time spent", Text),
        ("workout", "Workout", Text),
        ("weight", "Weight", Text),
        ("bodyfat", "Body fat", Text),
        ("progressPhotos", "Progress photos", FileMarker),
    ]
    .into_iter()
    .map(|(id, label, kind)| FieldDescriptor::new(id, label, kind))
    .collect()
}
