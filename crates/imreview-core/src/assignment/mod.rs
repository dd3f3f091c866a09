//! Review assignments, review content, and readiness aggregation

mod tracker;
mod types;

pub use tracker::{AssignmentTracker, NewAssignment};
pub use types::{
    AssignmentStatus, Ratings, Recommendation, ReviewAssignment, ReviewDraft, ReviewTally,
};
