//! Chapter upsert into a loaded store.
//!
//! An existing entry keeps its position, id, title and any unknown fields;
//! only its node or question sequence is replaced. A new entry is inserted and
//! the collection re-sorted by numeric chapter order. Records of the other
//! chapters stay raw JSON and are never re-typed.

use crate::types::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Identity and defaults for a chapter entry that may not exist yet.
#[derive(Debug, Clone)]
pub struct ChapterIdentity {
    pub chapter_no: ChapterNo,
    pub subject_id: String,
    /// Id given to a newly inserted entry; existing entries keep theirs.
    pub id: String,
}

impl ChapterIdentity {
    pub fn default_title(&self) -> String {
        format!("Chapter {}", self.chapter_no)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upserted {
    Replaced { position: usize },
    Inserted { position: usize },
}

/// A per-chapter entry in one of the stores.
pub trait ChapterEntry: Sized {
    type Record: Serialize;

    fn chapter_no(&self) -> &ChapterNo;
    fn replace_records(&mut self, records: Vec<Value>);
    fn create(identity: &ChapterIdentity, records: Vec<Value>) -> Self;
}

fn to_raw<T: Serialize>(records: Vec<T>) -> serde_json::Result<Vec<Value>> {
    records.into_iter().map(serde_json::to_value).collect()
}

impl ChapterEntry for Chapter {
    type Record = Node;

    fn chapter_no(&self) -> &ChapterNo {
        &self.chapter_no
    }

    fn replace_records(&mut self, records: Vec<Value>) {
        self.nodes = records;
    }

    fn create(identity: &ChapterIdentity, records: Vec<Value>) -> Self {
        Chapter {
            id: Some(identity.id.clone()),
            subject_id: Some(identity.subject_id.clone()),
            chapter_no: identity.chapter_no.clone(),
            chapter_title: identity.default_title(),
            nodes: records,
            extra: Default::default(),
        }
    }
}

impl ChapterEntry for QaChapter {
    type Record = Qa;

    fn chapter_no(&self) -> &ChapterNo {
        &self.chapter_no
    }

    fn replace_records(&mut self, records: Vec<Value>) {
        self.questions = records;
    }

    fn create(identity: &ChapterIdentity, records: Vec<Value>) -> Self {
        QaChapter {
            id: identity.id.clone(),
            subject_id: identity.subject_id.clone(),
            chapter_no: identity.chapter_no.clone(),
            chapter_name: identity.default_title(),
            questions: records,
            extra: Default::default(),
        }
    }
}

/// A persisted store holding one entry per chapter.
pub trait ChapterStore: Default + Serialize + DeserializeOwned {
    type Entry: ChapterEntry;

    fn chapters_mut(&mut self) -> &mut Vec<Self::Entry>;
}

impl ChapterStore for ConceptStore {
    type Entry = Chapter;

    fn chapters_mut(&mut self) -> &mut Vec<Chapter> {
        &mut self.chapters
    }
}

impl ChapterStore for QaStore {
    type Entry = QaChapter;

    fn chapters_mut(&mut self) -> &mut Vec<QaChapter> {
        &mut self.chapters
    }
}

pub fn upsert<E: ChapterEntry>(
    chapters: &mut Vec<E>,
    identity: &ChapterIdentity,
    records: Vec<E::Record>,
) -> serde_json::Result<Upserted> {
    let records = to_raw(records)?;
    if let Some(position) = chapters
        .iter()
        .position(|entry| entry.chapter_no() == &identity.chapter_no)
    {
        chapters[position].replace_records(records);
        info!("🔁 Replaced chapter {} in place", identity.chapter_no);
        return Ok(Upserted::Replaced { position });
    }

    chapters.push(E::create(identity, records));
    chapters.sort_by(|a, b| a.chapter_no().sort_cmp(b.chapter_no()));
    let position = chapters
        .iter()
        .position(|entry| entry.chapter_no() == &identity.chapter_no)
        .unwrap_or(chapters.len() - 1);
    info!("➕ Inserted chapter {} at position {position}", identity.chapter_no);
    Ok(Upserted::Inserted { position })
}
