//! Verification report types
//!
//! `CategoryGroups` keeps categories in first-seen order and serializes as a
//! JSON object whose keys follow that order (serde_json's `Map` would sort
//! them).

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;

/// One indicator's result inside a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorFinding {
    #[serde(rename = "indicatorId")]
    pub indicator_id: String,
    #[serde(rename = "commentValue")]
    pub comment: String,
    #[serde(rename = "isValid")]
    pub is_valid: bool,
}

/// Insertion-ordered mapping from category to its findings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryGroups {
    groups: Vec<(String, Vec<IndicatorFinding>)>,
    index: HashMap<String, usize>,
}

impl CategoryGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finding, creating the category group on first use
    pub fn push(&mut self, category: &str, finding: IndicatorFinding) {
        let slot = match self.index.get(category) {
            Some(&slot) => slot,
            None => {
                self.groups.push((category.to_string(), Vec::new()));
                self.index.insert(category.to_string(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        self.groups[slot].1.push(finding);
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of categories
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Total number of findings across all categories
    pub fn finding_count(&self) -> usize {
        self.groups.iter().map(|(_, findings)| findings.len()).sum()
    }

    /// Categories in first-seen order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(category, _)| category.as_str())
    }

    pub fn get(&self, category: &str) -> Option<&[IndicatorFinding]> {
        self.index
            .get(category)
            .map(|&slot| self.groups[slot].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[IndicatorFinding])> {
        self.groups
            .iter()
            .map(|(category, findings)| (category.as_str(), findings.as_slice()))
    }
}

impl Serialize for CategoryGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (category, findings) in &self.groups {
            map.serialize_entry(category, findings)?;
        }
        map.end()
    }
}

/// Outbound report for one request
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    /// Echo of the inbound instance identifier; `None` is sent as `null`
    pub instance_id: Option<Value>,
    pub result: CategoryGroups,
}

impl VerificationReport {
    /// Serialize the envelope, naming the instance field `instance_field`
    pub fn to_payload(&self, instance_field: &str) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(&ReportEnvelope {
            instance_field,
            report: self,
        })
    }
}

struct ReportEnvelope<'a> {
    instance_field: &'a str,
    report: &'a VerificationReport,
}

impl Serialize for ReportEnvelope<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.instance_field, &self.report.instance_id)?;
        map.serialize_entry("result", &self.report.result)?;
        map.end()
    }
}
