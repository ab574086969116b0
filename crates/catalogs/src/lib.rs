mod tables;

pub use tables::{
    ERAS, MOODS, OPTIONAL_PLACEHOLDER, RELATIONSHIP_STATUSES, SELECT_PLACEHOLDER, WEEKDAYS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    fn same(value: &str) -> Self {
        Self::new(value, value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Catalog {
    Mood,
    Era,
    RelationshipStatus,
    Weekday,
    TimeOfDay,
    Weight,
    BodyFat,
}

impl Catalog {
    pub const ALL: [Catalog; 7] = [
        Catalog::Mood,
        Catalog::Era,
        Catalog::RelationshipStatus,
        Catalog::Weekday,
        Catalog::TimeOfDay,
        Catalog::Weight,
        Catalog::BodyFat,
    ];

    /// Catalog backing a select field, keyed by the field's id.
    pub fn for_field(field_id: &str) -> Option<Self> {
        let catalog = match field_id {
            "mood" => Catalog::Mood,
            "era" => Catalog::Era,
            "relationshipStatus" => Catalog::RelationshipStatus,
            "day" => Catalog::Weekday,
            "arriveTime" | "timeSpent" | "timeAtGym" | "gymArrive" | "gymDuration" => {
                Catalog::TimeOfDay
            }
            "weight" | "gymWeight" => Catalog::Weight,
            "bodyfat" | "bodyFat" | "bfPercent" | "gymBodyfat" => Catalog::BodyFat,
            _ => return None,
        };
        Some(catalog)
    }

    pub fn name(self) -> &'static str {
        match self {
            Catalog::Mood => "mood",
            Catalog::Era => "era",
            Catalog::RelationshipStatus => "singleness level",
            Catalog::Weekday => "day",
            Catalog::TimeOfDay => "time",
            Catalog::Weight => "weight",
            Catalog::BodyFat => "body fat",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            Catalog::Era => OPTIONAL_PLACEHOLDER,
            _ => SELECT_PLACEHOLDER,
        }
    }

    /// Full option list, placeholder first.
    pub fn options(self) -> Vec<SelectOption> {
        let mut out = vec![SelectOption::new("", self.placeholder())];
        match self {
            Catalog::Mood => out.extend(MOODS.iter().copied().map(SelectOption::same)),
            Catalog::Era => out.extend(ERAS.iter().copied().map(SelectOption::same)),
            Catalog::RelationshipStatus => {
                out.extend(RELATIONSHIP_STATUSES.iter().copied().map(SelectOption::same))
            }
            Catalog::Weekday => out.extend(WEEKDAYS.iter().copied().map(SelectOption::same)),
            Catalog::TimeOfDay => out.extend(time_of_day_options()),
            Catalog::Weight => out.extend(
                (80..=350).map(|lb: u32| SelectOption::new(lb.to_string(), format!("{lb} lb"))),
            ),
            Catalog::BodyFat => out.extend((6..=80).map(|half: u32| {
                let percent = f64::from(half) / 2.0;
                SelectOption::new(percent.to_string(), format!("{percent}%"))
            })),
        }
        out
    }

    /// Whether `value` is one of the catalog's values (the placeholder counts).
    pub fn contains(self, value: &str) -> bool {
        self.options().iter().any(|option| option.value == value)
    }
}

// 5-minute steps across the day, valued `HH:MM`, labelled on a 12-hour clock.
fn time_of_day_options() -> impl Iterator<Item = SelectOption> {
    (0..24u32).flat_map(|hour| {
        (0..60u32).step_by(5).map(move |minute| {
            let twelve = if hour % 12 == 0 { 12 } else { hour % 12 };
            let meridiem = if hour < 12 { "AM" } else { "PM" };
            SelectOption::new(
                format!("{hour:02}:{minute:02}"),
                format!("{twelve}:{minute:02} {meridiem}"),
            )
        })
    })
}
