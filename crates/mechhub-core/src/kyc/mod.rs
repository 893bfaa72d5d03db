//! Mechanic identity verification: document capture and the review queue.

mod capture;
mod queue;

pub use capture::{KYC_STEPS, KycCapture};
pub use queue::{KycCounts, KycQueue, KycRow};
