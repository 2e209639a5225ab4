//! Case-insensitive lookup primitives shared by the filters.
use std::collections::HashSet;

use crate::model::Applicability;

/// Lowercased label lookup built once per request.
#[derive(Debug, Clone, Default)]
pub struct LabelSet {
    labels: HashSet<String>,
}

impl LabelSet {
    /// Build a lookup from caller labels. Blank labels are dropped.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = labels
            .into_iter()
            .map(|l| l.as_ref().trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        Self { labels }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(&label.to_lowercase())
    }

    pub fn contains_any<'a, I>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        candidates.into_iter().any(|c| self.contains(c))
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }
}

/// Exact, case-insensitive membership test.
pub fn contains_ignore_case(values: &[String], wanted: &str) -> bool {
    let wanted = wanted.to_lowercase();
    values.iter().any(|v| v.to_lowercase() == wanted)
}

/// Technology / sector / jurisdiction criteria for guidance documents.
///
/// Blank values count as not supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicabilityCriteria {
    pub technology: Option<String>,
    pub sector: Option<String>,
    pub jurisdiction: Option<String>,
}

impl ApplicabilityCriteria {
    pub fn new(
        technology: Option<String>,
        sector: Option<String>,
        jurisdiction: Option<String>,
    ) -> Self {
        Self {
            technology: non_blank(technology),
            sector: non_blank(sector),
            jurisdiction: non_blank(jurisdiction),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.technology.is_none() && self.sector.is_none() && self.jurisdiction.is_none()
    }

    /// Whether an artifact with the given applicability satisfies every supplied criterion.
    ///
    /// With no criteria everything matches. With criteria but no applicability nothing does.
    pub fn matches(&self, applicability: Option<&Applicability>) -> bool {
        if self.is_empty() {
            return true;
        }
        let Some(applicability) = applicability else {
            return false;
        };

        let satisfied = |criterion: &Option<String>, values: &[String]| match criterion {
            Some(wanted) => contains_ignore_case(values, wanted),
            None => true,
        };

        satisfied(&self.technology, &applicability.technology_domains)
            && satisfied(&self.sector, &applicability.industry_sectors)
            && satisfied(&self.jurisdiction, &applicability.jurisdictions)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
