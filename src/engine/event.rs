use crate::core::{EntityKind, RecordId};
use crate::model::{Comment, Post, Record};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Removed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Created => write!(f, "CREATED"),
            EventKind::Removed => write!(f, "REMOVED"),
        }
    }
}

/// The record an event is about. For `Removed` events this is the row as
/// it was removed, so its foreign keys are still available.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    Post(&'a Post),
    Comment(&'a Comment),
}

impl Subject<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Subject::Post(_) => EntityKind::Post,
            Subject::Comment(_) => EntityKind::Comment,
        }
    }

    pub fn id(&self) -> RecordId {
        match self {
            Subject::Post(post) => post.id(),
            Subject::Comment(comment) => comment.id(),
        }
    }
}

/// A create or remove of a post or comment, raised inside the transaction
/// that performed the write.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleEvent<'a> {
    pub kind: EventKind,
    pub subject: Subject<'a>,
}

impl<'a> LifecycleEvent<'a> {
    pub fn created(subject: Subject<'a>) -> Self {
        Self {
            kind: EventKind::Created,
            subject,
        }
    }

    pub fn removed(subject: Subject<'a>) -> Self {
        Self {
            kind: EventKind::Removed,
            subject,
        }
    }
}

impl fmt::Display for LifecycleEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject.kind(), self.kind, self.subject.id())
    }
}
