//! `subjects.json`: publishers → standards → subjects.

use crate::ids::IdGenerator;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectRegistry {
    #[serde(default)]
    pub publishers: Vec<Publisher>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publisher {
    pub publisher_name: String,
    #[serde(default)]
    pub standards: Vec<Standard>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standard {
    pub id: String,
    pub standard_name: String,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub subject_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Result of a lookup; `created` is true when the registry was changed and
/// has to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSubject {
    pub subject_id: String,
    pub created: bool,
}

impl SubjectRegistry {
    /// Id of the subject under (publisher, standard), adding the publisher,
    /// standard or subject when absent. Subject names compare
    /// case-insensitively and new ones are stored capitalised.
    pub fn resolve(
        &mut self,
        publisher: &str,
        standard: &str,
        subject: &str,
        ids: &IdGenerator,
    ) -> ResolvedSubject {
        let mut created = false;

        let publisher_index = match self
            .publishers
            .iter()
            .position(|p| p.publisher_name == publisher)
        {
            Some(index) => index,
            None => {
                info!("📚 Adding publisher '{publisher}' to subject registry");
                self.publishers.push(Publisher {
                    publisher_name: publisher.to_string(),
                    standards: Vec::new(),
                    extra: Map::new(),
                });
                created = true;
                self.publishers.len() - 1
            }
        };
        let standards = &mut self.publishers[publisher_index].standards;

        let standard_index = match standards.iter().position(|s| s.standard_name == standard) {
            Some(index) => index,
            None => {
                info!("📚 Adding standard '{standard}' under '{publisher}'");
                standards.push(Standard {
                    id: ids.keyed_id(&["standard", publisher, standard]),
                    standard_name: standard.to_string(),
                    subjects: Vec::new(),
                    extra: Map::new(),
                });
                standards.sort_by_key(|s| standard_sort_key(&s.standard_name));
                created = true;
                standards
                    .iter()
                    .position(|s| s.standard_name == standard)
                    .unwrap_or(standards.len() - 1)
            }
        };
        let subjects = &mut standards[standard_index].subjects;

        let subject_name = capitalize(subject);
        if let Some(existing) = subjects
            .iter()
            .find(|s| s.subject_name.to_lowercase() == subject_name.to_lowercase())
        {
            return ResolvedSubject {
                subject_id: existing.id.clone(),
                created,
            };
        }

        let subject_id = ids.keyed_id(&["subject", publisher, standard, &subject_name]);
        info!("📚 Adding subject '{subject_name}' to standard '{standard}' ({subject_id})");
        subjects.push(Subject {
            id: subject_id.clone(),
            subject_name,
            extra: Map::new(),
        });
        ResolvedSubject {
            subject_id,
            created: true,
        }
    }
}

/// Numeric standards first in numeric order, anything else after by name.
fn standard_sort_key(name: &str) -> (u8, u64, String) {
    match name.trim().parse::<u64>() {
        Ok(n) => (0, n, String::new()),
        Err(_) => (1, 0, name.to_string()),
    }
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(name: &str) -> String {
    let mut chars = name.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
