use serde::{Deserialize, Serialize};

/// Label substring marking the HTTP response-code family
pub const HTTP_FAMILY: &str = "HTTPResponseCodeError";
pub const VALUE_ERROR_FAMILY: &str = "ValueError";
pub const TIMEOUT_FAMILY: &str = "TimeoutError";
pub const DATABASE_FAMILY: &str = "DatabaseError";

/// Placeholder label for records that carry no type label
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Integrations whose name shows up verbatim as a type label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Integration {
    N8n,
}

impl Integration {
    pub const ALL: [Integration; 1] = [Integration::N8n];

    /// Canonical identifier, also used as the display label
    pub fn identifier(&self) -> &'static str {
        match self {
            Integration::N8n => "n8n",
        }
    }

    /// Case-insensitive exact match against the known integrations
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|integration| label.eq_ignore_ascii_case(integration.identifier()))
    }
}

/// Coarse classification bucket for a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Unknown,
    HttpResponseCode,
    Integration(Integration),
    ValueError,
    TimeoutError,
    DatabaseError,
    /// Anything else - one bucket per distinct raw label
    Other(String),
}

impl Category {
    /// Stable name of the category
    pub fn name(&self) -> &str {
        match self {
            Category::Unknown => UNKNOWN_LABEL,
            Category::HttpResponseCode => HTTP_FAMILY,
            Category::Integration(integration) => integration.identifier(),
            Category::ValueError => VALUE_ERROR_FAMILY,
            Category::TimeoutError => TIMEOUT_FAMILY,
            Category::DatabaseError => DATABASE_FAMILY,
            Category::Other(raw) => raw,
        }
    }

    pub fn color(&self) -> ColorToken {
        match self {
            Category::HttpResponseCode => ColorToken::Red,
            Category::Integration(Integration::N8n) => ColorToken::Purple,
            Category::ValueError => ColorToken::Orange,
            Category::TimeoutError => ColorToken::Yellow,
            Category::DatabaseError => ColorToken::Blue,
            Category::Unknown | Category::Other(_) => ColorToken::Slate,
        }
    }
}

/// Fixed palette used to tell categories apart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorToken {
    Red,
    Purple,
    Orange,
    Yellow,
    Blue,
    Slate,
}

impl ColorToken {
    pub fn hex(&self) -> &'static str {
        match self {
            ColorToken::Red => "#ef4444",
            ColorToken::Purple => "#a855f7",
            ColorToken::Orange => "#f97316",
            ColorToken::Yellow => "#f59e0b",
            ColorToken::Blue => "#3b82f6",
            ColorToken::Slate => "#64748b",
        }
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            ColorToken::Red => (0xef, 0x44, 0x44),
            ColorToken::Purple => (0xa8, 0x55, 0xf7),
            ColorToken::Orange => (0xf9, 0x73, 0x16),
            ColorToken::Yellow => (0xf5, 0x9e, 0x0b),
            ColorToken::Blue => (0x3b, 0x82, 0xf6),
            ColorToken::Slate => (0x64, 0x74, 0x8b),
        }
    }
}

/// What the classifier says about one type label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryAssignment {
    pub category: Category,
    pub display_label: String,
    pub color: ColorToken,
}

impl CategoryAssignment {
    fn new(category: Category, display_label: impl Into<String>) -> Self {
        let color = category.color();
        Self {
            category,
            display_label: display_label.into(),
            color,
        }
    }
}

/// Map a raw type label to its category
///
/// Rules run in a fixed order and the first match wins, since a label can
/// satisfy more than one substring rule. Total: anything unmatched becomes
/// `Category::Other` carrying the raw label.
pub fn classify(type_label: Option<&str>) -> CategoryAssignment {
    let label = match type_label {
        Some(label) if !label.is_empty() => label,
        _ => return CategoryAssignment::new(Category::Unknown, UNKNOWN_LABEL),
    };

    if label.contains(HTTP_FAMILY) {
        return CategoryAssignment::new(Category::HttpResponseCode, "HTTP Error");
    }

    if let Some(integration) = Integration::from_label(label) {
        return CategoryAssignment::new(
            Category::Integration(integration),
            integration.identifier(),
        );
    }

    let category = if label.contains(VALUE_ERROR_FAMILY) {
        Category::ValueError
    } else if label.contains(TIMEOUT_FAMILY) {
        Category::TimeoutError
    } else if label.contains(DATABASE_FAMILY) {
        Category::DatabaseError
    } else {
        Category::Other(label.to_string())
    };

    CategoryAssignment::new(category, label)
}
