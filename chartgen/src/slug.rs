// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Utilities for deriving directory names from chart titles.
//!
//! Slugs produced by this module contain only lowercase ASCII alphanumeric
//! characters, underscores and hyphens. Runs of separators collapse to the
//! first separator of the run and the result never exceeds
//! [`MAX_SLUG_LEN`] characters, keeping artifact paths portable.

/// Upper bound on the number of characters in a slug.
pub const MAX_SLUG_LEN: usize = 64;

/// Directory name used when a title has no slug-worthy characters.
pub const FALLBACK_SLUG: &str = "untitled_chart";

/// Builder for slug strings derived from chart titles.
#[derive(Debug, Clone, Copy,)]
pub struct SlugStrategy<'input,>
{
    source: &'input str,
}

impl<'input,> SlugStrategy<'input,>
{
    /// Creates a new slug builder for the provided string slice.
    ///
    /// The builder retains a borrowed view of the source to avoid allocations
    /// until [`build`](Self::build) is invoked.
    pub fn builder(source: &'input str,) -> Self
    {
        Self {
            source,
        }
    }

    /// Builds a slug from the provided title. Uppercase ASCII letters are
    /// lowered, every character outside `[a-z0-9_-]` becomes `_`, and
    /// separators at either end are dropped. Returns `None` when nothing
    /// remains.
    ///
    /// # Examples
    ///
    /// ```
    /// use chartgen::SlugStrategy;
    ///
    /// let slug = SlugStrategy::builder("Sales by Region",).build();
    /// assert_eq!(slug.as_deref(), Some("sales_by_region"));
    /// ```
    pub fn build(self,) -> Option<String,>
    {
        let mut slug = String::with_capacity(self.source.len().min(MAX_SLUG_LEN,),);
        let mut previous_separator = true;

        for candidate in self.source.chars() {
            let mapped = match candidate {
                'A'..='Z' => candidate.to_ascii_lowercase(),
                'a'..='z' | '0'..='9' | '-' | '_' => candidate,
                _ => '_',
            };

            if is_separator(mapped,) {
                if previous_separator {
                    continue;
                }
                previous_separator = true;
            } else {
                previous_separator = false;
            }

            slug.push(mapped,);
            if slug.len() >= MAX_SLUG_LEN {
                break;
            }
        }

        while slug.ends_with(is_separator,) {
            slug.pop();
        }

        if slug.is_empty() { None } else { Some(slug,) }
    }

    /// Builds the slug, substituting [`FALLBACK_SLUG`] for empty results.
    pub fn build_or_fallback(self,) -> String
    {
        self.build().unwrap_or_else(|| FALLBACK_SLUG.to_owned(),)
    }
}

fn is_separator(candidate: char,) -> bool
{
    matches!(candidate, '-' | '_')
}
