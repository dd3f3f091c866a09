//! Journals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, Validator};
use crate::id::JournalId;

/// A journal that receives manuscripts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    pub id: JournalId,
    pub name: String,
    /// Short form used in labels, e.g. "JCAP"
    pub abbreviation: String,
    pub created_at: DateTime<Utc>,
}

impl Journal {
    pub fn new(name: &str, abbreviation: &str, now: DateTime<Utc>) -> Result<Self> {
        Validator::new()
            .require_text(name, "name")
            .require_text(abbreviation, "abbreviation")
            .finish()?;
        Ok(Self {
            id: JournalId::new(),
            name: name.trim().to_string(),
            abbreviation: abbreviation.trim().to_uppercase(),
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_journal() {
        let journal = Journal::new("Open Astrophysics", "oja", Utc::now()).unwrap();
        assert_eq!(journal.abbreviation, "OJA");
        assert!(Journal::new(" ", "X", Utc::now()).is_err());
    }
}
