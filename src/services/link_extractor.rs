//! Check-in link extraction.
//!
//! The booking service embeds a link of the form
//!
//! ```text
//! https://<host>/external/api/reservation/CheckIn?id=<6 digits>&hash=<64 alphanumerics>
//! ```
//!
//! in its reservation emails. [`LinkExtractor`] finds the first well-formed
//! occurrence in a piece of text.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::{CheckInLink, ScannableText};

/// Scheme and host of the booking service.
pub const DEFAULT_CHECKIN_ORIGIN: &str = "https://ukg.iofficeconnect.com";

/// Path of the check-in endpoint, including the `id` parameter name.
const CHECKIN_PATH: &str = "/external/api/reservation/CheckIn?id=";

/// Extracts check-in links from scannable text.
///
/// Matching is case-sensitive on the literal prefix. The `id` parameter must
/// hold exactly six ASCII digits and `hash` at least 64 ASCII alphanumerics,
/// of which the first 64 form the link.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    prefix: String,
    pattern: Regex,
}

impl LinkExtractor {
    /// Builds an extractor for links served from `origin` (scheme and host,
    /// without a trailing slash).
    pub fn for_origin(origin: &str) -> Result<Self, regex::Error> {
        let origin = origin.trim_end_matches('/');
        let prefix = format!("{}{}", origin, CHECKIN_PATH);
        let pattern = Regex::new(&format!(
            r"{}[0-9]{{6}}&hash=[0-9A-Za-z]{{64}}",
            regex::escape(&prefix)
        ))?;
        Ok(Self { prefix, pattern })
    }

    /// The literal prefix every link starts with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the first well-formed check-in link in `text`, if any.
    pub fn extract(&self, text: &ScannableText) -> Option<CheckInLink> {
        let text = text.as_str();
        if !text.contains(&self.prefix) {
            return None;
        }
        self.pattern
            .find(text)
            .map(|m| CheckInLink::from_match(m.as_str()))
    }
}

impl Default for LinkExtractor {
    fn default() -> Self {
        static DEFAULT: OnceLock<LinkExtractor> = OnceLock::new();
        DEFAULT
            .get_or_init(|| {
                LinkExtractor::for_origin(DEFAULT_CHECKIN_ORIGIN)
                    .expect("default check-in regex must compile")
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "a1B2c3D4e5F6a1B2c3D4e5F6a1B2c3D4e5F6a1B2c3D4e5F6a1B2c3D4e5F6abcd";

    fn link(id: &str, hash: &str) -> String {
        format!(
            "https://ukg.iofficeconnect.com/external/api/reservation/CheckIn?id={}&hash={}",
            id, hash
        )
    }

    fn extract(text: &str) -> Option<String> {
        LinkExtractor::default()
            .extract(&ScannableText::from(text))
            .map(|l| l.to_string())
    }

    #[test]
    fn hash_fixture_is_64_chars() {
        assert_eq!(HASH.len(), 64);
    }

    #[test]
    fn finds_link_in_surrounding_text() {
        let url = link("123456", HASH);
        let text = format!("Please check in here: {}\r\nThanks!", url);
        assert_eq!(extract(&text), Some(url));
    }

    #[test]
    fn finds_link_at_end_of_text() {
        let url = link("654321", HASH);
        assert_eq!(extract(&url), Some(url.clone()));
    }

    #[test]
    fn no_prefix_yields_nothing() {
        assert_eq!(extract("Your reservation is confirmed."), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn prefix_is_case_sensitive() {
        let url = link("123456", HASH).replace("CheckIn", "checkin");
        assert_eq!(extract(&url), None);
    }

    #[test]
    fn id_must_be_six_digits() {
        assert_eq!(extract(&link("12345", HASH)), None);
        assert_eq!(extract(&link("1234567", HASH)), None);
        assert_eq!(extract(&link("12345a", HASH)), None);
    }

    #[test]
    fn hash_needs_64_alphanumerics() {
        assert_eq!(extract(&link("123456", &HASH[..63])), None);

        let mut with_underscore = HASH.to_string();
        with_underscore.replace_range(10..11, "_");
        assert_eq!(extract(&link("123456", &with_underscore)), None);
    }

    #[test]
    fn longer_hash_run_yields_first_64() {
        let url = link("123456", HASH);
        let text = format!("{}Z more text", url);
        assert_eq!(extract(&text), Some(url));

        let run = "a".repeat(70);
        let expected = link("123456", &run[..64]);
        assert_eq!(extract(&link("123456", &run)), Some(expected));
    }

    #[test]
    fn hash_may_be_followed_by_punctuation() {
        let url = link("123456", HASH);
        let text = format!("<a href=\"{}\">Check in</a>", url);
        assert_eq!(extract(&text), Some(url));
    }

    #[test]
    fn returns_only_the_well_formed_occurrence() {
        let broken = link("12", "short");
        let good = link("000111", HASH);
        let text = format!("{}\n{}\n{}", broken, good, broken);
        assert_eq!(extract(&text), Some(good));
    }

    #[test]
    fn returns_first_of_several_links() {
        let first = link("111111", HASH);
        let second = link("222222", HASH);
        let text = format!("{} {}", first, second);
        assert_eq!(extract(&text), Some(first));
    }

    #[test]
    fn custom_origin() {
        let extractor = LinkExtractor::for_origin("http://127.0.0.1:8080/").unwrap();
        assert_eq!(
            extractor.prefix(),
            "http://127.0.0.1:8080/external/api/reservation/CheckIn?id="
        );
        let url = format!(
            "http://127.0.0.1:8080/external/api/reservation/CheckIn?id=123456&hash={}",
            HASH
        );
        let found = extractor.extract(&ScannableText::from(url.as_str()));
        assert_eq!(found.map(|l| l.to_string()), Some(url));
    }

    #[test]
    fn default_origin_does_not_match_other_hosts() {
        let url = link("123456", HASH).replace("ukg.iofficeconnect.com", "ukg.example.com");
        assert_eq!(extract(&url), None);
    }
}
