//! Page selector parsing for extraction and deletion
//!
//! Users type 1-based page numbers ("3") or inclusive intervals ("2-5");
//! everything past this module works with zero-based page indices.

use crate::error::PdfStudioError;

const SEPARATOR: char = '-';

/// A validated page selector, zero-based and within the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSelector {
    Single(usize),
    /// Inclusive on both ends, `start <= end`
    Range(usize, usize),
}

impl RangeSelector {
    /// Parse a selector like "3" or "2-5" against a document of `page_count` pages
    pub fn parse(input: &str, page_count: usize) -> Result<Self, PdfStudioError> {
        let input = input.trim();

        if input.contains(SEPARATOR) {
            let parts: Vec<&str> = input.split(SEPARATOR).collect();
            if parts.len() != 2 {
                return Err(PdfStudioError::InvalidRange(format!(
                    "Expected \"start-end\", got \"{}\"",
                    input
                )));
            }

            let first = parse_number(parts[0], input)?;
            let last = parse_number(parts[1], input)?;
            let start = first - 1;
            let end = last - 1;

            if start < 0 || end >= page_count as i64 || start > end {
                return Err(PdfStudioError::InvalidRange(format!(
                    "{}-{} is not a valid range for a {}-page document",
                    first, last, page_count
                )));
            }

            Ok(RangeSelector::Range(start as usize, end as usize))
        } else {
            let number = parse_number(input, input)?;
            let target = number - 1;

            if target < 0 || target >= page_count as i64 {
                return Err(PdfStudioError::InvalidPage(format!(
                    "Page {} does not exist (document has {} pages)",
                    number, page_count
                )));
            }

            Ok(RangeSelector::Single(target as usize))
        }
    }

    /// Zero-based indices in ascending order
    pub fn indices(&self) -> Vec<usize> {
        match *self {
            RangeSelector::Single(index) => vec![index],
            RangeSelector::Range(start, end) => (start..=end).collect(),
        }
    }

    /// Number of pages the selector covers
    pub fn page_count(&self) -> usize {
        match *self {
            RangeSelector::Single(_) => 1,
            RangeSelector::Range(start, end) => end - start + 1,
        }
    }
}

/// Parse a selector and return the zero-based indices it covers
pub fn parse_page_selector(input: &str, page_count: usize) -> Result<Vec<usize>, PdfStudioError> {
    RangeSelector::parse(input, page_count).map(|selector| selector.indices())
}

/// Parse a single page number (deletion only accepts this form)
pub fn parse_single_page(input: &str, page_count: usize) -> Result<usize, PdfStudioError> {
    match RangeSelector::parse(input, page_count) {
        Ok(RangeSelector::Single(index)) => Ok(index),
        Ok(RangeSelector::Range(..)) => Err(PdfStudioError::InvalidRange(format!(
            "Expected a single page number, got \"{}\"",
            input.trim()
        ))),
        Err(PdfStudioError::InvalidRange(_)) if input.contains(SEPARATOR) => {
            Err(PdfStudioError::InvalidRange(format!(
                "Expected a single page number, got \"{}\"",
                input.trim()
            )))
        }
        Err(e) => Err(e),
    }
}

fn parse_number(part: &str, input: &str) -> Result<i64, PdfStudioError> {
    let part = part.trim();
    if part.is_empty() {
        return Err(PdfStudioError::InvalidRange(format!(
            "Missing page number in \"{}\"",
            input
        )));
    }
    part.parse::<i64>()
        .map_err(|_| PdfStudioError::InvalidRange(format!("\"{}\" is not a page number", part)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_page() {
        assert_eq!(parse_page_selector("3", 10).unwrap(), vec![2]);
    }

    #[test]
    fn test_range_is_inclusive_and_zero_based() {
        assert_eq!(parse_page_selector("2-5", 10).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_range_spanning_whole_document() {
        assert_eq!(parse_page_selector("1-3", 3).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_single_page_range() {
        let selector = RangeSelector::parse("4-4", 10).unwrap();
        assert_eq!(selector, RangeSelector::Range(3, 3));
        assert_eq!(selector.page_count(), 1);
    }

    #[test]
    fn test_whitespace_is_ignored() {
        assert_eq!(parse_page_selector("  2 - 3 ", 10).unwrap(), vec![1, 2]);
        assert_eq!(parse_page_selector(" 7\n", 10).unwrap(), vec![6]);
    }

    #[test]
    fn test_reversed_range_fails() {
        assert!(matches!(
            parse_page_selector("5-2", 10),
            Err(PdfStudioError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_range_past_end_fails() {
        assert!(matches!(
            parse_page_selector("3-20", 10),
            Err(PdfStudioError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_range_starting_at_zero_fails() {
        assert!(matches!(
            parse_page_selector("0-3", 10),
            Err(PdfStudioError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_page_zero_fails_as_invalid_page() {
        assert!(matches!(
            parse_page_selector("0", 10),
            Err(PdfStudioError::InvalidPage(_))
        ));
    }

    #[test]
    fn test_page_past_end_fails_as_invalid_page() {
        assert!(matches!(
            parse_page_selector("11", 10),
            Err(PdfStudioError::InvalidPage(_))
        ));
    }

    #[test]
    fn test_non_numeric_fails_as_invalid_range() {
        for input in ["", "   ", "abc", "3x", "-", "-3", "1-", "a-b", "1-2-3", "1.5"] {
            assert!(
                matches!(
                    parse_page_selector(input, 10),
                    Err(PdfStudioError::InvalidRange(_))
                ),
                "expected InvalidRange for {:?}",
                input
            );
        }
    }

    #[test]
    fn test_empty_document_rejects_everything() {
        assert!(parse_page_selector("1", 0).is_err());
        assert!(parse_page_selector("1-1", 0).is_err());
    }

    #[test]
    fn test_single_page_form() {
        assert_eq!(parse_single_page("1", 3).unwrap(), 0);
        assert_eq!(parse_single_page(" 3 ", 3).unwrap(), 2);
    }

    #[test]
    fn test_single_page_form_rejects_ranges() {
        assert!(matches!(
            parse_single_page("1-2", 3),
            Err(PdfStudioError::InvalidRange(_))
        ));
        assert!(matches!(
            parse_single_page("2-9", 3),
            Err(PdfStudioError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_single_page_form_bounds() {
        assert!(matches!(
            parse_single_page("4", 3),
            Err(PdfStudioError::InvalidPage(_))
        ));
        assert!(matches!(
            parse_single_page("x", 3),
            Err(PdfStudioError::InvalidRange(_))
        ));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Every valid page number maps to exactly its zero-based index
        #[test]
        fn every_page_number_parses(page_count in 1usize..500, seed in 0usize..500) {
            let k = seed % page_count + 1;
            prop_assert_eq!(parse_page_selector(&k.to_string(), page_count).unwrap(), vec![k - 1]);
        }

        /// One past either end is rejected as an invalid page
        #[test]
        fn out_of_bounds_pages_fail(page_count in 1usize..500) {
            let zero = parse_page_selector("0", page_count);
            let past_end = parse_page_selector(&(page_count + 1).to_string(), page_count);
            prop_assert!(matches!(zero, Err(PdfStudioError::InvalidPage(_))));
            prop_assert!(matches!(past_end, Err(PdfStudioError::InvalidPage(_))));
        }

        /// Valid ranges yield contiguous ascending indices of the right length
        #[test]
        fn valid_ranges_are_contiguous(page_count in 1usize..200, a in 0usize..200, b in 0usize..200) {
            let start = a % page_count + 1;
            let end = b % page_count + 1;
            let (start, end) = (start.min(end), start.max(end));

            let indices = parse_page_selector(&format!("{}-{}", start, end), page_count).unwrap();
            prop_assert_eq!(indices.len(), end - start + 1);
            prop_assert_eq!(indices[0], start - 1);
            prop_assert!(indices.windows(2).all(|w| w[1] == w[0] + 1));
            prop_assert!(indices.iter().all(|&i| i < page_count));
        }

        /// Parsing never panics on arbitrary input
        #[test]
        fn arbitrary_input_never_panics(input in "\\PC{0,20}", page_count in 0usize..50) {
            let _ = parse_page_selector(&input, page_count);
            let _ = parse_single_page(&input, page_count);
        }
    }
}
