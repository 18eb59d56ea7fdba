use super::{DesignSet, Template};

/// Slide value for "no image".
pub const EMPTY_SLIDE: i64 = -1;

/// Maps each pattern value to an image index from `set`.
///
/// A value `v` below the template's arity selects slot `v` of the set, or
/// [`EMPTY_SLIDE`] when that slot is unset. The sentinel and any other value
/// become [`EMPTY_SLIDE`]. Output length always equals input length.
pub fn encode(template: Template, pattern: &[i64], set: &DesignSet) -> Vec<i64> {
	pattern
		.iter()
		.map(|&value| {
			usize::try_from(value)
				.ok()
				.filter(|slot| *slot < template.arity())
				.and_then(|slot| set.slot(slot))
				.and_then(|image| i64::try_from(image).ok())
				.unwrap_or(EMPTY_SLIDE)
		})
		.collect()
}
