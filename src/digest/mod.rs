mod dispatcher;
mod synthesis;

pub use dispatcher::{CycleOutcome, DigestDispatcher, DispatchTrigger};
pub use synthesis::SynthesisEngine;
