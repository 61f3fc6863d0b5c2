pub mod engine;

pub use engine::{CreateOutcome, LoadOutcome, LoadTicket, TaskEngine};
