use std::fmt;

use serde::Serialize;

/// Fixed category a task's free-text activity label maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Closure,
    Incident,
    Implementation,
    Pos,
    ChangeOrder,
    Visit,
    Other,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Category::Closure => "CLOSURE",
            Category::Incident => "INCIDENT",
            Category::Implementation => "IMPLEMENTATION",
            Category::Pos => "POS",
            Category::ChangeOrder => "CHANGE_ORDER",
            Category::Visit => "VISIT",
            Category::Other => "OTHER",
        };
        f.write_str(tag)
    }
}

/// Classify an activity label by case-insensitive substring match.
///
/// Labels routinely match several keyword groups ("Cierre de soporte"),
/// so group order is load-bearing: first match wins. Empty or
/// unrecognized labels degrade to `Other`.
pub fn classify(activity: &str) -> Category {
    let label = activity.trim().to_lowercase();
    if label.is_empty() {
        return Category::Other;
    }

    if label.contains("cierre") {
        return Category::Closure;
    }
    if ["incidente", "soporte", "correctivo"]
        .iter()
        .any(|kw| label.contains(kw))
    {
        return Category::Incident;
    }
    if ["implementacion", "instalacion", "apertura", "migracion"]
        .iter()
        .any(|kw| label.contains(kw))
    {
        return Category::Implementation;
    }
    if ["pos", "datafono", "envio", "retiro"]
        .iter()
        .any(|kw| label.contains(kw))
    {
        return Category::Pos;
    }
    if ["oc", "orden de cambio", "orden"]
        .iter()
        .any(|kw| label.contains(kw))
    {
        return Category::ChangeOrder;
    }
    if ["rollo", "visita"].iter().any(|kw| label.contains(kw)) {
        return Category::Visit;
    }

    Category::Other
}
