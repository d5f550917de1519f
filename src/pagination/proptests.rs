//! Property-based tests for pagination and text filtering

use super::*;
use proptest::prelude::*;

fn arb_items() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-zA-Z ]{0,12}", 0..200)
}

fn arb_request() -> impl Strategy<Value = PageRequest> {
    (
        proptest::option::of(1usize..=MAX_LIMIT),
        proptest::option::of(0usize..400),
    )
        .prop_map(|(limit, offset)| PageRequest::new(limit, offset))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_page_length_matches_window(items in arb_items(), request in arb_request()) {
        let total = items.len();
        let window = request.resolve();
        let result = paginate(items, &request);

        let expected = window.limit.min(total.saturating_sub(window.offset));
        prop_assert_eq!(result.items.len(), expected);
        prop_assert_eq!(result.metadata.total, total);
        prop_assert_eq!(result.metadata.has_more, window.offset + window.limit < total);
    }

    #[test]
    fn prop_offset_past_end_is_empty(items in arb_items(), extra in 0usize..50, limit in 1usize..=MAX_LIMIT) {
        let offset = items.len() + extra;
        let result = paginate(items, &PageRequest::new(Some(limit), Some(offset)));
        prop_assert!(result.items.is_empty());
        prop_assert!(!result.metadata.has_more);
    }

    #[test]
    fn prop_page_is_contiguous_slice(items in arb_items(), request in arb_request()) {
        let window = request.resolve();
        let result = paginate(items.clone(), &request);
        let expected: Vec<_> = items.into_iter().skip(window.offset).take(window.limit).collect();
        prop_assert_eq!(result.items, expected);
    }

    #[test]
    fn prop_filter_is_idempotent(items in arb_items(), query in "[a-zA-Z]{0,3}") {
        let project = |s: &String| s.clone();
        let once = filter_by_text(items, Some(&query), project);
        let twice = filter_by_text(once.clone(), Some(&query), project);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_filter_ignores_query_case(items in arb_items(), query in "[a-zA-Z]{1,3}") {
        let project = |s: &String| s.clone();
        let lower = filter_by_text(items.clone(), Some(&query.to_lowercase()), project);
        let upper = filter_by_text(items, Some(&query.to_uppercase()), project);
        prop_assert_eq!(lower, upper);
    }

    #[test]
    fn prop_filter_preserves_order(items in arb_items(), query in "[a-z]{1,2}") {
        let indexed: Vec<(usize, String)> = items.into_iter().enumerate().collect();
        let filtered = filter_by_text(indexed, Some(&query), |(_, s)| s.clone());
        prop_assert!(filtered.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn prop_summary_for_nonempty_pages(items in arb_items(), request in arb_request()) {
        let result = paginate(items, &request);
        let summary = format_summary(&result.metadata);
        if result.metadata.total == 0 {
            prop_assert_eq!(summary, "No items found");
        } else {
            let total_suffix = format!("of {} items", result.metadata.total);
            prop_assert!(summary.starts_with("Showing "));
            prop_assert!(summary.contains(&total_suffix));
            prop_assert_eq!(summary.contains("use offset"), result.metadata.has_more);
        }
    }
}
