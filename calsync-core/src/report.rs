//! What a cycle did, class by class.

use std::fmt;

use crate::day_class::DayClass;

/// Several recurring series fell in the same class; only `selected` was used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesConflict {
    pub selected: String,
    pub passed_over: Vec<String>,
}

/// Several feed events start at the same instant as one calendar instance.
/// The instance is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConflict {
    pub instance_id: String,
    pub source_uids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassReport {
    pub class: DayClass,
    /// Series the class was reconciled against, `None` if skipped.
    pub series_id: Option<String>,
    pub examined: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub unmatched: usize,
    pub series_conflict: Option<SeriesConflict>,
    pub instance_conflicts: Vec<InstanceConflict>,
}

impl ClassReport {
    pub fn new(class: DayClass) -> Self {
        ClassReport {
            class,
            series_id: None,
            examined: 0,
            updated: 0,
            unchanged: 0,
            unmatched: 0,
            series_conflict: None,
            instance_conflicts: Vec::new(),
        }
    }

    pub fn skipped(&self) -> bool {
        self.series_id.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub classes: Vec<ClassReport>,
}

impl CycleReport {
    pub fn updated(&self) -> usize {
        self.classes.iter().map(|c| c.updated).sum()
    }

    pub fn conflicts(&self) -> usize {
        self.classes
            .iter()
            .map(|c| c.instance_conflicts.len() + usize::from(c.series_conflict.is_some()))
            .sum()
    }

    pub fn class(&self, class: DayClass) -> Option<&ClassReport> {
        self.classes.iter().find(|c| c.class == class)
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .classes
            .iter()
            .map(|c| match &c.series_id {
                None => format!("{}: skipped", c.class),
                Some(_) => format!(
                    "{}: {} updated, {} unchanged, {} unmatched",
                    c.class, c.updated, c.unchanged, c.unmatched
                ),
            })
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}
