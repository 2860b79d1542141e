//! Model module - Core scheduling types
//!
//! Implements the study progress model with:
//! - Module progress records with a cached next study date
//! - Repetitions ordered within a fixed five-step cycle
//! - Open-ended cycle stages (first time, first review, ...)

mod progress;
mod repetition;

pub use progress::{CyclesStudied, ModuleProgress, ModuleRef, NewModuleProgress};
pub use repetition::{
    CompletionUpdate, CreateRepetitionInput, Repetition, RepetitionOrder, RepetitionStatus,
};
