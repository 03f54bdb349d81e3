//! Block transform pipeline.
//!
//! An ordered list of steps applied to every block between the watchers and the sinks. The
//! first failing step stops the block; it is then reported and never dispatched. An empty
//! pipeline passes blocks through untouched.

use std::collections::HashMap;

mod error;

use crate::models::CanonicalBlock;

pub use error::PipelineError;

/// A single transform
pub type Step =
	Box<dyn Fn(CanonicalBlock) -> Result<CanonicalBlock, PipelineError> + Send + Sync>;

/// Ordered block transforms
#[derive(Default)]
pub struct Pipeline {
	steps: Vec<(String, Step)>,
}

impl Pipeline {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends a named step
	pub fn with_step<F>(mut self, name: impl Into<String>, step: F) -> Self
	where
		F: Fn(CanonicalBlock) -> Result<CanonicalBlock, PipelineError> + Send + Sync + 'static,
	{
		self.steps.push((name.into(), Box::new(step)));
		self
	}

	pub fn len(&self) -> usize {
		self.steps.len()
	}

	pub fn is_empty(&self) -> bool {
		self.steps.is_empty()
	}

	/// Runs `block` through every step in order, stopping at the first error.
	pub fn run(&self, block: CanonicalBlock) -> Result<CanonicalBlock, PipelineError> {
		self.steps.iter().try_fold(block, |block, (name, step)| {
			let number = block.number;
			let slug = block.network_slug.clone();
			step(block).map_err(|e| {
				PipelineError::step_error(
					format!("Step {} failed", name),
					Some(Box::new(e)),
					Some(HashMap::from([
						("step".to_string(), name.clone()),
						("network".to_string(), slug),
						("block".to_string(), number.to_string()),
					])),
				)
			})
		})
	}
}
