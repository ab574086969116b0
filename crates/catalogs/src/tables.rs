//! Option tables for the journal's select fields.

pub const SELECT_PLACEHOLDER: &str = "Select…";
pub const OPTIONAL_PLACEHOLDER: &str = "(optional)";

pub const MOODS: &[&str] = &[
    "Horny for Peace",
    "Feral & Focused",
    "Violently Calm",
    "Sexually Frustrated but Contained",
    "Plotting With a Semi",
    "Muscle Memory and Trauma",
    "Built Like a Threat",
    "Calm Like a Loaded Weapon",
    "Hard Body, Closed Heart",
    "Wanting Touch, Refusing Attachment",
    "Desire Without Permission",
    "Attracted but Unavailable",
    "Crushing Quietly",
    "Sexually Awake, Emotionally Armed",
    "Detached for My Own Safety",
    "Heart Locked, Body Open",
    "Missing Someone I Shouldn’t",
    "Grief With Good Posture",
    "Sad, Not Weak",
    "Petty but Correct",
    "Annoyed by Everyone",
    "Do Not Test Me",
    "Observing Before Engaging",
    "Silence Is Strategic",
    "Hyperfocused and Unreachable",
    "Overstimulated but Managing",
    "Brain on Fire",
    "Mask On, Emotions Offline",
    "Unmasked and Exposed",
    "Indifferent and Relieved",
    "Regulated Enough",
    "Resting in My Body",
    "Safe for Now",
    "Still Standing",
];

pub const ERAS: &[&str] = &[
    "Villain Era",
    "Whore4More",
    "Horny for Peace",
    "Muscle Memory and Trauma",
    "Plotting Season",
    "Built, Not Broken",
    "Hard Body, Harder Boundaries",
    "Flesh and Willpower",
    "Dangerous Crush Season",
    "Attachment Without Illusions",
    "Wanting Without Chasing",
    "Letting Someone Matter (Carefully)",
    "Post-Heartbreak Control Phase",
    "Emotional Scar Tissue",
    "Grief Without Collapse",
    "Detachment Training",
    "Gym God Ascension",
    "Strength Without Apology",
    "Discipline Over Desire",
    "Power Stabilization",
    "Hyperfocus Arc",
    "Manic Clarity Window",
    "Burnout Containment",
    "Re-Regulation Protocol",
    "Silence as Strategy",
    "No Negotiation Period",
    "Energy Preservation Mode",
    "Nothing to Prove",
    "Knowing Exactly Who I Am",
];

pub const RELATIONSHIP_STATUSES: &[&str] = &[
    "Single and Self-Controlled",
    "Single, Not Looking",
    "Single but Curious",
    "Crushing Quietly",
    "Mutual Tension, No Labels",
    "Attracted but Guarded",
    "Emotionally Involved",
    "Physically Attached, Emotionally Cautious",
    "Letting Someone In (Slowly)",
    "Complicated on Purpose",
    "Unavailable by Design",
    "Attached Against My Will",
    "Heart Closed for Maintenance",
    "Recovering From Someone",
    "Detaching With Intent",
    "Indifferent and Relieved",
    "Choosing Myself",
];

pub const WEEKDAYS: &[&str] = &[
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];
