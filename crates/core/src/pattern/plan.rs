use serde::{Deserialize, Serialize};
use slidebatch_protocol::{DriveFile, GenerateRequest, Provider};

use super::{AbstractPattern, DesignSet, PATTERN_LENGTH, Template, ValidationError, encode};

/// Where a selected image came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
	#[default]
	Drive,
	Local,
}

/// An image selected for the batch. Design sets refer to images by their
/// position in the selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
	pub id: String,
	pub url: String,
	pub name: String,
	#[serde(default)]
	pub source: ImageSource,
}

impl ImageRef {
	/// An image given directly by URL.
	pub fn from_url(url: impl Into<String>) -> Self {
		let url = url.into();
		let name = url.rsplit('/').next().filter(|name| !name.is_empty()).unwrap_or(&url).to_string();
		Self {
			id: url.clone(),
			url,
			name,
			source: ImageSource::Local,
		}
	}
}

impl From<DriveFile> for ImageRef {
	fn from(file: DriveFile) -> Self {
		let url = file
			.web_content_link
			.clone()
			.or_else(|| file.thumbnail_link.clone())
			.or_else(|| file.web_view_link.clone())
			.unwrap_or_else(|| format!("https://drive.google.com/uc?id={}", file.id));
		Self {
			id: file.id,
			url,
			name: file.name,
			source: ImageSource::Drive,
		}
	}
}

/// One fully resolved design, ready to submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
	pub name: String,
	pub slides: Vec<i64>,
}

/// A validated batch: the jobs in submission order and the image URLs every
/// job is submitted with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPlan {
	pub template: Template,
	pub jobs: Vec<Job>,
	pub image_urls: Vec<String>,
}

impl BatchPlan {
	/// Checks every precondition and expands one job per design set.
	///
	/// Nothing is submitted when this fails.
	pub fn prepare(
		template: Template,
		pattern: &AbstractPattern,
		sets: &[DesignSet],
		images: &[ImageRef],
		canva_token: Option<&str>,
	) -> Result<Self, ValidationError> {
		if canva_token.is_none_or(str::is_empty) {
			return Err(ValidationError::MissingCredential(Provider::Canva));
		}

		let required = template.arity();
		if images.len() < required {
			return Err(ValidationError::InsufficientImages {
				required,
				available: images.len(),
			});
		}

		if pattern.len() != PATTERN_LENGTH {
			return Err(ValidationError::PatternLength {
				expected: PATTERN_LENGTH,
				actual: pattern.len(),
			});
		}
		pattern.check_values(template)?;
		if pattern.is_empty(template.sentinel()) {
			return Err(ValidationError::EmptyPattern);
		}

		if sets.is_empty() {
			return Err(ValidationError::NoDesignSets);
		}
		for (index, set) in sets.iter().enumerate() {
			let number = index + 1;
			for slot in 0..required {
				let Some(image) = set.slot(slot) else {
					return Err(ValidationError::IncompleteDesignSet { set: number, slot: slot + 1 });
				};
				if image >= images.len() {
					return Err(ValidationError::ImageOutOfRange {
						set: number,
						image,
						available: images.len(),
					});
				}
			}
		}

		let jobs = sets
			.iter()
			.enumerate()
			.map(|(index, set)| Job {
				name: format!("Design {}", index + 1),
				slides: encode(template, pattern.values(), set),
			})
			.collect();

		Ok(Self {
			template,
			jobs,
			image_urls: images.iter().map(|image| image.url.clone()).collect(),
		})
	}

	pub fn len(&self) -> usize {
		self.jobs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.jobs.is_empty()
	}

	/// Gateway request for `job`.
	pub fn request(&self, job: &Job) -> GenerateRequest {
		GenerateRequest {
			image_urls: self.image_urls.clone(),
			patron: job.slides.clone(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn images(n: usize) -> Vec<ImageRef> {
		(0..n).map(|i| ImageRef::from_url(format!("https://img.test/{i}.png"))).collect()
	}

	fn pattern(template: Template, head: &[i64]) -> AbstractPattern {
		AbstractPattern::fitted(head.to_vec(), template).unwrap()
	}

	#[test]
	fn prepares_named_jobs_in_set_order() {
		let sets = [DesignSet::new(Some(5), Some(7), None), DesignSet::new(Some(1), Some(0), None)];
		let plan = BatchPlan::prepare(Template::Double, &pattern(Template::Double, &[0, 1]), &sets, &images(8), Some("c")).unwrap();

		assert_eq!(plan.len(), 2);
		assert_eq!(plan.jobs[0].name, "Design 1");
		assert_eq!(&plan.jobs[0].slides[..3], &[5, 7, -1]);
		assert_eq!(plan.jobs[1].name, "Design 2");
		assert_eq!(&plan.jobs[1].slides[..2], &[1, 0]);
		assert_eq!(plan.image_urls.len(), 8);
		assert_eq!(plan.request(&plan.jobs[0]).patron.len(), PATTERN_LENGTH);
	}

	#[test]
	fn missing_canva_token_blocks_everything() {
		let sets = [DesignSet::new(Some(0), Some(1), None)];
		let p = pattern(Template::Double, &[0]);
		assert_eq!(
			BatchPlan::prepare(Template::Double, &p, &sets, &images(2), None),
			Err(ValidationError::MissingCredential(Provider::Canva))
		);
		assert_eq!(
			BatchPlan::prepare(Template::Double, &p, &sets, &images(2), Some("")),
			Err(ValidationError::MissingCredential(Provider::Canva))
		);
	}

	#[test]
	fn template_needs_enough_images() {
		let sets = [DesignSet::new(Some(0), Some(1), Some(2))];
		assert_eq!(
			BatchPlan::prepare(Template::Triple, &pattern(Template::Triple, &[0]), &sets, &images(2), Some("c")),
			Err(ValidationError::InsufficientImages { required: 3, available: 2 })
		);
	}

	#[test]
	fn empty_pattern_blocks_submission() {
		let sets = [DesignSet::new(Some(0), Some(1), None)];
		let blank = AbstractPattern::blank(Template::Double, PATTERN_LENGTH);
		assert_eq!(
			BatchPlan::prepare(Template::Double, &blank, &sets, &images(2), Some("c")),
			Err(ValidationError::EmptyPattern)
		);
	}

	#[test]
	fn single_template_uses_only_the_first_image_of_each_set() {
		let sets = [DesignSet::new(Some(5), Some(7), None)];
		let plan = BatchPlan::prepare(Template::Single, &pattern(Template::Single, &[0, 2, 0]), &sets, &images(8), Some("c")).unwrap();
		assert_eq!(&plan.jobs[0].slides[..4], &[5, -1, 5, -1]);

		let mut second_slot = vec![2; PATTERN_LENGTH];
		second_slot[..2].copy_from_slice(&[0, 1]);
		assert_eq!(
			BatchPlan::prepare(Template::Single, &AbstractPattern::new(second_slot), &sets, &images(8), Some("c")),
			Err(ValidationError::PatternValue {
				position: 1,
				value: 1,
				template: Template::Single
			})
		);
	}

	#[test]
	fn pattern_must_have_configured_length() {
		let sets = [DesignSet::new(Some(0), None, None)];
		let short = AbstractPattern::new(vec![0; 10]);
		assert_eq!(
			BatchPlan::prepare(Template::Single, &short, &sets, &images(1), Some("c")),
			Err(ValidationError::PatternLength {
				expected: PATTERN_LENGTH,
				actual: 10
			})
		);
	}

	#[test]
	fn incomplete_or_out_of_range_sets_are_rejected() {
		let p = pattern(Template::Double, &[0, 1]);
		assert_eq!(
			BatchPlan::prepare(Template::Double, &p, &[DesignSet::new(Some(0), None, None)], &images(2), Some("c")),
			Err(ValidationError::IncompleteDesignSet { set: 1, slot: 2 })
		);
		assert_eq!(
			BatchPlan::prepare(
				Template::Double,
				&p,
				&[DesignSet::new(Some(0), Some(1), None), DesignSet::new(Some(0), Some(9), None)],
				&images(2),
				Some("c")
			),
			Err(ValidationError::ImageOutOfRange { set: 2, image: 9, available: 2 })
		);
		assert_eq!(
			BatchPlan::prepare(Template::Double, &p, &[], &images(2), Some("c")),
			Err(ValidationError::NoDesignSets)
		);
	}

	#[test]
	fn drive_file_prefers_content_link() {
		let file = DriveFile {
			id: "abc".into(),
			name: "cat.png".into(),
			mime_type: None,
			thumbnail_link: Some("https://thumb".into()),
			web_content_link: Some("https://content".into()),
			web_view_link: None,
		};
		let image = ImageRef::from(file);
		assert_eq!(image.url, "https://content");
		assert_eq!(image.source, ImageSource::Drive);
		assert_eq!(ImageRef::from_url("https://x.test/a/b.jpg").name, "b.jpg");
	}
}
