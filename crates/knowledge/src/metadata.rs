//! Filename-based metadata inference.
//!
//! Source PDFs carry no structured metadata, so year, topics and category
//! are derived from the filename at index-build time.

use std::collections::BTreeSet;

/// Filename substring to topic tag. Matched against the lowercased name
/// with `.pdf` removed and `-` folded to `_`.
const TOPIC_RULES: &[(&str, &str)] = &[
    ("telemedicine", "telemedicine"),
    ("telehealth", "telemedicine"),
    ("tele_med", "telemedicine"),
    ("tele_health", "telemedicine"),
    ("virtual_care", "telemedicine"),
    ("telecare", "telemedicine"),
    ("priorauthorization", "prior-authorization"),
    ("prior_authorization", "prior-authorization"),
    ("utilizationmanagement", "utilization-management"),
    ("utilization_management", "utilization-management"),
    ("interoperability", "interoperability"),
    ("informatics", "medical-informatics"),
    ("healthinformationsystems", "health-information-systems"),
    ("health_information_systems", "health-information-systems"),
    ("healthis", "health-information-systems"),
    ("ehr", "ehr"),
    ("electronic_health_record", "ehr"),
    ("public_health", "public-health"),
    ("surveillance", "public-health-surveillance"),
    ("robotics", "robotics"),
    ("robot", "robotics"),
    ("aging", "aging-in-place"),
    ("patient_journey", "patient-journey"),
    ("journey_mapping", "patient-journey"),
    ("person_centered", "person-centered-care"),
    ("patient_experience", "patient-experience"),
    ("service_design", "service-design"),
    ("dataquality", "data-quality"),
    ("data_quality", "data-quality"),
    ("quality", "quality"),
    ("ebm", "evidence-based-medicine"),
    ("sweden", "sweden"),
];

/// Category rules in ascending precedence; the last matching rule wins.
const CATEGORY_RULES: &[(&str, &[&str])] = &[
    ("technology", &["telemedicine", "robotics", "aging-in-place"]),
    (
        "health-informatics",
        &[
            "health-information-systems",
            "medical-informatics",
            "interoperability",
            "data-quality",
            "ehr",
        ],
    ),
    (
        "policy",
        &[
            "prior-authorization",
            "utilization-management",
            "public-health-surveillance",
            "public-health",
        ],
    ),
    (
        "service-design",
        &[
            "person-centered-care",
            "patient-experience",
            "patient-journey",
            "service-design",
        ],
    ),
];

/// Metadata derived from a document filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredMetadata {
    pub year: Option<i32>,
    pub topics: BTreeSet<String>,
    pub category: String,
}

/// Infer year, topics and category from a document filename.
pub fn infer_metadata(doc_name: &str) -> InferredMetadata {
    let base = doc_name.to_lowercase().replace(".pdf", "").replace('-', "_");

    let topics: BTreeSet<String> = TOPIC_RULES
        .iter()
        .filter(|(key, _)| base.contains(key))
        .map(|(_, tag)| tag.to_string())
        .collect();

    let category = CATEGORY_RULES
        .iter()
        .filter(|(_, tags)| tags.iter().any(|t| topics.contains(*t)))
        .last()
        .map(|(name, _)| name.to_string())
        .unwrap_or_else(|| "general".to_string());

    InferredMetadata {
        year: year_prefix(doc_name),
        topics,
        category,
    }
}

/// A leading four-digit year, e.g. `2021` in `2021_telehealth.pdf`.
pub fn year_prefix(doc_name: &str) -> Option<i32> {
    let prefix = doc_name.get(..4)?;
    if prefix.chars().all(|c| c.is_ascii_digit()) {
        prefix.parse().ok()
    } else {
        None
    }
}
