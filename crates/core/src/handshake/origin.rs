/// Normalizes a URL or origin string to `scheme://host[:port]`.
///
/// Returns `None` for unparseable input and for opaque origins such as
/// `null` or `file://` URLs.
pub fn normalize_origin(raw: &str) -> Option<String> {
	let parsed = url::Url::parse(raw.trim()).ok()?;
	let origin = parsed.origin();
	origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Origins a completion message is accepted from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginAllowList {
	origins: Vec<String>,
}

impl OriginAllowList {
	/// Builds the list from URLs; path components are dropped.
	pub fn new<I, S>(urls: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut origins: Vec<String> = urls.into_iter().filter_map(|url| normalize_origin(url.as_ref())).collect();
		origins.dedup();
		Self { origins }
	}

	pub fn allows(&self, origin: &str) -> bool {
		normalize_origin(origin).is_some_and(|origin| self.origins.contains(&origin))
	}

	pub fn origins(&self) -> &[String] {
		&self.origins
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn origin_ignores_path_and_default_port() {
		assert_eq!(normalize_origin("https://api.example.com:443/api/google"), Some("https://api.example.com".into()));
		assert_eq!(normalize_origin("http://localhost:4200/"), Some("http://localhost:4200".into()));
	}

	#[test]
	fn opaque_origins_are_rejected() {
		assert_eq!(normalize_origin("null"), None);
		assert_eq!(normalize_origin("file:///tmp/x.html"), None);
	}

	#[test]
	fn allow_list_matches_exact_origin_only() {
		let list = OriginAllowList::new(["http://localhost:4200", "https://api.example.com/api"]);
		assert!(list.allows("https://api.example.com"));
		assert!(list.allows("http://localhost:4200"));
		assert!(!list.allows("http://localhost:4201"));
		assert!(!list.allows("https://api.example.com.evil.test"));
		assert!(!list.allows("null"));
	}
}
