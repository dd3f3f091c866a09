//! Manuscripts, their versions, and the lifecycle state machine

mod manuscript;
mod state;

pub use manuscript::{
    CoAuthor, FileRef, Manuscript, ManuscriptVersion, NewManuscript, PublicationDetails,
    StatusChange,
};
pub use state::{ManuscriptEvent, ManuscriptStatus, RevisionSeverity};
