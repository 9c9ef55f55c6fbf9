//! Update decisions: which instances get a new description.

use crate::event::{DestinationEvent, SourceEvent};
use crate::matcher::{Compensation, InstanceMatch, match_instance};
use crate::report::InstanceConflict;

/// The instance to write back, or `None` if its description is already right.
pub fn plan_update(instance: &DestinationEvent, source: &SourceEvent) -> Option<DestinationEvent> {
    let candidate = instance.with_description(&source.description);
    (candidate != *instance).then_some(candidate)
}

/// Decisions for every instance of one series.
#[derive(Debug, Default)]
pub struct ClassPlan {
    /// Full bodies to write, in instance order.
    pub updates: Vec<DestinationEvent>,
    pub unchanged: usize,
    pub unmatched: usize,
    pub conflicts: Vec<InstanceConflict>,
}

pub fn plan_class(
    instances: &[DestinationEvent],
    sources: &[&SourceEvent],
    compensation: &Compensation,
) -> ClassPlan {
    let mut plan = ClassPlan::default();

    for instance in instances {
        match match_instance(instance, sources, compensation) {
            InstanceMatch::Matched(source) => match plan_update(instance, source) {
                Some(candidate) => plan.updates.push(candidate),
                None => plan.unchanged += 1,
            },
            InstanceMatch::Unmatched => plan.unmatched += 1,
            InstanceMatch::Ambiguous(hits) => plan.conflicts.push(InstanceConflict {
                instance_id: instance.id().to_string(),
                source_uids: hits.iter().map(|e| e.uid.clone()).collect(),
            }),
        }
    }

    plan
}
