use serde::{Deserialize, Serialize};

/// Width/height pair in logical units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
	pub width: i32,
	pub height: i32,
}

impl Size {
	pub const fn new(width: i32, height: i32) -> Self {
		Self { width, height }
	}

	/// Sizes below the minimum occur transiently during panel re-layout and
	/// must not be propagated to an embedded window.
	pub fn is_usable(self, min: i32) -> bool {
		self.width >= min && self.height >= min
	}
}

impl std::fmt::Display for Size {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}x{}", self.width, self.height)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn usable_requires_both_dimensions() {
		assert!(Size::new(100, 100).is_usable(100));
		assert!(!Size::new(99, 500).is_usable(100));
		assert!(!Size::new(500, 99).is_usable(100));
	}
}
