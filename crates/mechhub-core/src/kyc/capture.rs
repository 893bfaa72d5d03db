//! Three-step document capture: CNIC front, CNIC back, selfie.

use crate::error::{Error, Result};

/// Number of images a KYC submission needs.
pub const KYC_STEPS: usize = 3;

const STEP_NAMES: [&str; KYC_STEPS] = ["CNIC front", "CNIC back", "selfie"];

/// Images gathered so far for one submission.
///
/// Steps are numbered from 1. Any step may be retaken; a successful capture
/// moves [`current_step`](Self::current_step) to the following step, and it
/// stays on the selfie once there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KycCapture {
    images: [Option<String>; KYC_STEPS],
    current_step: usize,
}

impl Default for KycCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl KycCapture {
    pub const fn new() -> Self {
        Self {
            images: [None, None, None],
            current_step: 1,
        }
    }

    /// Human name of a 1-based step.
    pub fn step_name(step: usize) -> Option<&'static str> {
        step.checked_sub(1).and_then(|i| STEP_NAMES.get(i)).copied()
    }

    pub const fn current_step(&self) -> usize {
        self.current_step
    }

    /// Store `image_ref` for `step`.
    pub fn capture_step(&mut self, step: usize, image_ref: &str) -> Result<()> {
        let Some(name) = Self::step_name(step) else {
            return Err(Error::Validation(format!(
                "KYC step must be between 1 and {KYC_STEPS}, got {step}"
            )));
        };
        let image_ref = image_ref.trim();
        if image_ref.is_empty() {
            return Err(Error::Validation(format!("No image provided for {name}")));
        }

        self.images[step - 1] = Some(image_ref.to_string());
        self.current_step = (step + 1).min(KYC_STEPS);
        Ok(())
    }

    pub const fn images(&self) -> &[Option<String>; KYC_STEPS] {
        &self.images
    }

    pub fn is_complete(&self) -> bool {
        self.images.iter().all(Option::is_some)
    }

    /// Steps still missing an image.
    pub fn missing_steps(&self) -> Vec<usize> {
        self.images
            .iter()
            .enumerate()
            .filter(|(_, img)| img.is_none())
            .map(|(i, _)| i + 1)
            .collect()
    }

    pub fn into_images(self) -> [Option<String>; KYC_STEPS] {
        self.images
    }
}
