//! Admission Module
//!
//! Frequency-aware cold/hot segmentation deciding which keys a
//! size-bounded cache keeps.

mod frequency;
mod policy;


pub use frequency::{FrequencyRecord, Segment};
pub use policy::{AccessOutcome, AdmissionPolicy, AdmissionSnapshot, SharedAdmissionPolicy};
