//! Seams to the external collaborators: where records come from and who
//! answers severity predictions.

pub mod prediction;
pub mod record_source;
