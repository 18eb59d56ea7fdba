//! Abstract patterns and their expansion into generation jobs.
//!
//! An [`AbstractPattern`] says, slide by slide, which image slot of a design
//! set to show, with the template's sentinel meaning "no image". Encoding a
//! pattern against a [`DesignSet`] yields the concrete per-slide image
//! indices a job submits.

mod encode;
mod inference;
mod plan;
mod template;

pub use encode::{EMPTY_SLIDE, encode};
pub use inference::{GeminiInference, InferenceError, PatternInference, extract_pattern};
pub use plan::{BatchPlan, ImageRef, ImageSource, Job};
pub use template::Template;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of slides a pattern describes.
pub const PATTERN_LENGTH: usize = 35;

/// Image slots of one design, as indices into the batch's image list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignSet {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub img1: Option<usize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub img2: Option<usize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub img3: Option<usize>,
}

impl DesignSet {
	pub fn new(img1: Option<usize>, img2: Option<usize>, img3: Option<usize>) -> Self {
		Self { img1, img2, img3 }
	}

	/// Image index held by zero-based `slot`.
	pub fn slot(&self, slot: usize) -> Option<usize> {
		match slot {
			0 => self.img1,
			1 => self.img2,
			2 => self.img3,
			_ => None,
		}
	}

	/// Parses `5,7` or `5,7,9`; `-` or an empty field leaves a slot unset.
	pub fn parse(input: &str) -> Result<Self, ValidationError> {
		let fields: Vec<&str> = input.split(',').map(str::trim).collect();
		if fields.len() > 3 {
			return Err(ValidationError::MalformedDesignSet(input.to_string()));
		}
		let mut slots = [None; 3];
		for (slot, field) in fields.iter().enumerate() {
			if field.is_empty() || *field == "-" {
				continue;
			}
			slots[slot] = Some(field.parse::<usize>().map_err(|_| ValidationError::MalformedDesignSet(input.to_string()))?);
		}
		Ok(Self::new(slots[0], slots[1], slots[2]))
	}
}

/// Per-slide slot selectors. Values are a slot below the template's arity,
/// or its sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbstractPattern(Vec<i64>);

impl AbstractPattern {
	pub fn new(values: Vec<i64>) -> Self {
		Self(values)
	}

	/// A pattern of `len` slides that shows nothing.
	pub fn blank(template: Template, len: usize) -> Self {
		Self(vec![template.sentinel(); len])
	}

	/// Parses `0,1,2` or `[0, 1, 2]`, padding with the sentinel up to
	/// [`PATTERN_LENGTH`].
	pub fn parse(input: &str, template: Template) -> Result<Self, ValidationError> {
		let trimmed = input.trim();
		let inner = trimmed.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')).unwrap_or(trimmed);
		let mut values = Vec::new();
		for field in inner.split(|c: char| c == ',' || c.is_whitespace()).filter(|field| !field.is_empty()) {
			let value = field.parse::<i64>().map_err(|_| ValidationError::MalformedPattern(field.to_string()))?;
			values.push(value);
		}
		Self::fitted(values, template)
	}

	/// Pads a short pattern with the sentinel and checks length and range.
	pub fn fitted(mut values: Vec<i64>, template: Template) -> Result<Self, ValidationError> {
		if values.len() > PATTERN_LENGTH {
			return Err(ValidationError::PatternLength {
				expected: PATTERN_LENGTH,
				actual: values.len(),
			});
		}
		values.resize(PATTERN_LENGTH, template.sentinel());
		let pattern = Self(values);
		pattern.check_values(template)?;
		Ok(pattern)
	}

	pub fn values(&self) -> &[i64] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// `true` when no slide shows an image, which blocks submission.
	pub fn is_empty(&self, sentinel: i64) -> bool {
		self.0.iter().all(|value| *value == sentinel)
	}

	pub fn check_values(&self, template: Template) -> Result<(), ValidationError> {
		match self.0.iter().enumerate().find(|(_, value)| !template.accepts(**value)) {
			Some((position, value)) => Err(ValidationError::PatternValue {
				position,
				value: *value,
				template,
			}),
			None => Ok(()),
		}
	}
}

/// Rejection of a batch before anything is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("no {0} credential; log in first")]
	MissingCredential(slidebatch_protocol::Provider),

	#[error("template needs at least {required} images, {available} selected")]
	InsufficientImages { required: usize, available: usize },

	#[error("pattern shows no images")]
	EmptyPattern,

	#[error("pattern must have {expected} slides, got {actual}")]
	PatternLength { expected: usize, actual: usize },

	#[error("pattern value {value} at slide {position} is not a {template} slot or its sentinel")]
	PatternValue { position: usize, value: i64, template: Template },

	#[error("malformed pattern value: {0}")]
	MalformedPattern(String),

	#[error("malformed design set: {0}")]
	MalformedDesignSet(String),

	#[error("no design sets given")]
	NoDesignSets,

	#[error("design set {set} has no image in slot {slot}")]
	IncompleteDesignSet { set: usize, slot: usize },

	#[error("design set {set} refers to image {image}, only {available} selected")]
	ImageOutOfRange { set: usize, image: usize, available: usize },

	#[error("no results to export")]
	NothingToExport,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_pads_with_sentinel() {
		let pattern = AbstractPattern::parse("[0, 1, 2]", Template::Triple).unwrap();
		assert_eq!(pattern.len(), PATTERN_LENGTH);
		assert_eq!(&pattern.values()[..4], &[0, 1, 2, 3]);
	}

	#[test]
	fn parse_accepts_bare_comma_list() {
		let pattern = AbstractPattern::parse("0,1,0", Template::Double).unwrap();
		assert_eq!(&pattern.values()[..4], &[0, 1, 0, 2]);
	}

	#[test]
	fn parse_rejects_out_of_range_and_garbage() {
		assert_eq!(
			AbstractPattern::parse("0,3", Template::Double),
			Err(ValidationError::PatternValue {
				position: 1,
				value: 3,
				template: Template::Double
			})
		);
		assert!(matches!(AbstractPattern::parse("0,x", Template::Double), Err(ValidationError::MalformedPattern(_))));
		assert!(matches!(AbstractPattern::parse("-1", Template::Double), Err(ValidationError::PatternValue { .. })));
	}

	#[test]
	fn single_rejects_the_second_slot() {
		assert_eq!(AbstractPattern::parse("0,2,0", Template::Single).unwrap().values()[..3], [0, 2, 0]);
		assert_eq!(
			AbstractPattern::parse("0,1", Template::Single),
			Err(ValidationError::PatternValue {
				position: 1,
				value: 1,
				template: Template::Single
			})
		);
	}

	#[test]
	fn too_long_pattern_is_rejected() {
		let long = vec!["0"; PATTERN_LENGTH + 1].join(",");
		assert_eq!(
			AbstractPattern::parse(&long, Template::Single),
			Err(ValidationError::PatternLength {
				expected: PATTERN_LENGTH,
				actual: PATTERN_LENGTH + 1
			})
		);
	}

	#[test]
	fn all_sentinel_pattern_is_empty() {
		let blank = AbstractPattern::blank(Template::Double, PATTERN_LENGTH);
		assert!(blank.is_empty(2));
		assert!(!AbstractPattern::parse("1", Template::Double).unwrap().is_empty(2));
	}

	#[test]
	fn design_set_parse_allows_gaps() {
		assert_eq!(DesignSet::parse("5,7").unwrap(), DesignSet::new(Some(5), Some(7), None));
		assert_eq!(DesignSet::parse("5,-,9").unwrap(), DesignSet::new(Some(5), None, Some(9)));
		assert!(DesignSet::parse("1,2,3,4").is_err());
		assert!(DesignSet::parse("a").is_err());
	}
}
