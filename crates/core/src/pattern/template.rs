use serde::{Deserialize, Serialize};

/// Slide layout a batch is generated with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
	/// One image per design.
	Single,
	/// Two images per design.
	#[default]
	Double,
	/// Three images per design.
	Triple,
}

impl Template {
	/// Pattern value meaning "no image". Single shares the double layout's
	/// sentinel even though it only has one slot.
	pub fn sentinel(self) -> i64 {
		match self {
			Template::Single | Template::Double => 2,
			Template::Triple => 3,
		}
	}

	/// Image slots per design. Every design set must fill them all, and the
	/// batch must have at least this many images selected.
	pub fn arity(self) -> usize {
		match self {
			Template::Single => 1,
			Template::Double => 2,
			Template::Triple => 3,
		}
	}

	/// Whether `value` may appear in a pattern: a slot below the arity, or
	/// the sentinel.
	pub fn accepts(self, value: i64) -> bool {
		value == self.sentinel() || usize::try_from(value).is_ok_and(|slot| slot < self.arity())
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Template::Single => "single",
			Template::Double => "double",
			Template::Triple => "triple",
		}
	}
}

impl std::fmt::Display for Template {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for Template {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"single" | "1" => Ok(Template::Single),
			"double" | "2" => Ok(Template::Double),
			"triple" | "3" => Ok(Template::Triple),
			_ => Err(format!("unknown template: {s} (expected single, double or triple)")),
		}
	}
}
