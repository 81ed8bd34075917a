//! Review domains
//!
//! The four built-in analysis dimensions plus an escape hatch for
//! deployment-specific domains. Names are stable snake_case strings used as
//! guideline file names, store key components and report section anchors.

use serde::{Deserialize, Serialize};

/// A review dimension analyzed by its own pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Domain {
    /// Vulnerabilities, secrets, unsafe calls
    Security,
    /// Complexity, duplication, maintainability
    CodeQuality,
    /// SOLID adherence, testing, documentation workflows
    EngineeringPractices,
    /// Energy/carbon efficiency of the code under review
    Sustainability,
    /// Deployment-defined domain with its own guideline document
    Custom(String),
}

impl Domain {
    /// The four built-in domains, in canonical report order
    pub const BUILTIN: [Domain; 4] = [
        Domain::Security,
        Domain::CodeQuality,
        Domain::EngineeringPractices,
        Domain::Sustainability,
    ];

    /// Stable snake_case name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Domain::Security => "security",
            Domain::CodeQuality => "code_quality",
            Domain::EngineeringPractices => "engineering_practices",
            Domain::Sustainability => "sustainability",
            Domain::Custom(name) => name,
        }
    }

    /// Human-readable title for report sections
    #[must_use]
    pub fn title(&self) -> String {
        match self {
            Domain::Security => "Security".to_string(),
            Domain::CodeQuality => "Code Quality".to_string(),
            Domain::EngineeringPractices => "Engineering Practices".to_string(),
            Domain::Sustainability => "Sustainability".to_string(),
            Domain::Custom(name) => {
                let mut title = String::with_capacity(name.len());
                for (i, part) in name.split('_').enumerate() {
                    if i > 0 {
                        title.push(' ');
                    }
                    let mut chars = part.chars();
                    if let Some(first) = chars.next() {
                        title.extend(first.to_uppercase());
                        title.push_str(chars.as_str());
                    }
                }
                title
            }
        }
    }
}

impl From<String> for Domain {
    fn from(value: String) -> Self {
        match value.as_str() {
            "security" => Domain::Security,
            "code_quality" => Domain::CodeQuality,
            "engineering_practices" => Domain::EngineeringPractices,
            "sustainability" => Domain::Sustainability,
            _ => Domain::Custom(value),
        }
    }
}

impl From<Domain> for String {
    fn from(value: Domain) -> Self {
        value.name().to_string()
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
