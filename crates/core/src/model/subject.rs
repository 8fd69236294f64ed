use thiserror::Error;

use crate::model::ids::{SubjectId, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SubjectError {
    #[error("subject name cannot be empty")]
    EmptyName,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic title cannot be empty")]
    EmptyTitle,
}

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

/// A subject groups topics. Read-only to this core; created by teachers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    id: SubjectId,
    name: String,
}

impl Subject {
    /// # Errors
    ///
    /// Returns `SubjectError::EmptyName` if the trimmed name is empty.
    pub fn new(id: SubjectId, name: impl Into<String>) -> Result<Self, SubjectError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(SubjectError::EmptyName);
        }
        Ok(Self { id, name })
    }

    #[must_use]
    pub fn id(&self) -> SubjectId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// An ordered unit of content inside a subject.
///
/// `order_index` is unique within a subject and zero-based by convention, but
/// gaps are tolerated by the unlock resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    id: TopicId,
    subject_id: SubjectId,
    title: String,
    order_index: u32,
    estimated_duration_minutes: Option<u32>,
    content: Option<String>,
}

impl Topic {
    /// # Errors
    ///
    /// Returns `TopicError::EmptyTitle` if the trimmed title is empty.
    pub fn new(
        id: TopicId,
        subject_id: SubjectId,
        title: impl Into<String>,
        order_index: u32,
    ) -> Result<Self, TopicError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(TopicError::EmptyTitle);
        }
        Ok(Self {
            id,
            subject_id,
            title,
            order_index,
            estimated_duration_minutes: None,
            content: None,
        })
    }

    #[must_use]
    pub fn with_estimated_duration(mut self, minutes: u32) -> Self {
        self.estimated_duration_minutes = Some(minutes);
        self
    }

    /// Attach lesson content; blank content is treated as absent.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        let content = content.into();
        self.content = if content.trim().is_empty() {
            None
        } else {
            Some(content)
        };
        self
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn order_index(&self) -> u32 {
        self.order_index
    }

    #[must_use]
    pub fn estimated_duration_minutes(&self) -> Option<u32> {
        self.estimated_duration_minutes
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Text handed to the question generator: the lesson content, or the title
    /// when no content has been written yet.
    #[must_use]
    pub fn source_text(&self) -> &str {
        self.content.as_deref().unwrap_or(&self.title)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_rejects_blank_name() {
        let err = Subject::new(SubjectId::new(1), "   ").unwrap_err();
        assert_eq!(err, SubjectError::EmptyName);
    }

    #[test]
    fn topic_trims_title_and_falls_back_to_it() {
        let topic = Topic::new(TopicId::new(1), SubjectId::new(1), "  Fractions ", 0).unwrap();
        assert_eq!(topic.title(), "Fractions");
        assert_eq!(topic.source_text(), "Fractions");
    }

    #[test]
    fn topic_prefers_content_for_generation() {
        let topic = Topic::new(TopicId::new(1), SubjectId::new(1), "Cells", 0)
            .unwrap()
            .with_content("Cells are the basic unit of life.")
            .with_estimated_duration(20);
        assert_eq!(topic.source_text(), "Cells are the basic unit of life.");
        assert_eq!(topic.estimated_duration_minutes(), Some(20));
    }

    #[test]
    fn blank_content_is_dropped() {
        let topic = Topic::new(TopicId::new(1), SubjectId::new(1), "Cells", 0)
            .unwrap()
            .with_content("  \n");
        assert_eq!(topic.content(), None);
    }
}
