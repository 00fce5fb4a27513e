//! Event dispatch: channel lookup and in-order fan-out.

pub mod router;

pub use router::{DispatchLimits, DispatchReport, PushOutcome, Router};
