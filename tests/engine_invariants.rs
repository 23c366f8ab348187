//! Client Query Engine Invariant Tests
//!
//! - Execution is deterministic
//! - Adding filters never grows the filtered count
//! - Sorting is stable under every active key
//! - Page length is min(size, max(0, total - page*size))
//! - Reference scenarios for filter, sort and search

use gridquery::engine::{expected_page_len, ClientQueryEngine, PagedResult};
use gridquery::query::{FilterCriterion, FilterOperator, QueryState, SortDirection, SortSpec};
use gridquery::row::Row;

// =============================================================================
// Helper Functions
// =============================================================================

/// Deterministic pseudo-random sequence (LCG), enough to shuffle fixtures
struct Sequence(u64);

impl Sequence {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn pick<'a>(&mut self, options: &[&'a str]) -> &'a str {
        options[(self.next() as usize) % options.len()]
    }
}

fn fixture(n: usize) -> Vec<Row> {
    let mut seq = Sequence(42);
    (0..n)
        .map(|i| {
            Row::new(format!("r{}", i))
                .with("seq", i as i64)
                .with("status", seq.pick(&["Active", "Inactive", "Pending"]))
                .with("role", seq.pick(&["admin", "editor", "viewer"]))
                .with("score", (seq.next() % 5) as i64)
                .with("email", format!("user{}@{}.com", i, seq.pick(&["x", "y", "john"])))
        })
        .collect()
}

fn execute(rows: &[Row], query: &QueryState) -> PagedResult {
    ClientQueryEngine::new().execute(rows, query)
}

// =============================================================================
// Determinism
// =============================================================================

/// Same rows, same query, same page.
#[test]
fn test_execution_is_idempotent() {
    let rows = fixture(200);
    let query = QueryState::new(1, 15)
        .unwrap()
        .searching("user")
        .filtered_by("status", "active")
        .sorted_by(SortSpec::desc("score"))
        .sorted_by(SortSpec::asc("role"));

    let first = execute(&rows, &query);
    for _ in 0..50 {
        assert_eq!(execute(&rows, &query), first);
    }
}

// =============================================================================
// Monotonic Narrowing
// =============================================================================

/// A superset of filters never matches more rows.
#[test]
fn test_more_filters_never_widen() {
    let rows = fixture(300);
    let engine = ClientQueryEngine::new();

    let base = QueryState::default();
    let f1 = base.with_filter("status", Some("active".into()));
    let f2 = f1.with_filter("role", Some("admin".into()));
    let f3 = f2.with_filter(
        "score",
        Some(FilterCriterion::structured(FilterOperator::Gte, 3i64)),
    );
    let f4 = f3.with_global("john");

    let counts: Vec<usize> = [&base, &f1, &f2, &f3, &f4]
        .iter()
        .map(|q| engine.filtered_count(&rows, q))
        .collect();

    for pair in counts.windows(2) {
        assert!(pair[1] <= pair[0], "counts grew: {:?}", counts);
    }
    assert_eq!(counts[0], 300);
}

/// A blank filter is a no-op.
#[test]
fn test_blank_filter_does_not_narrow() {
    let rows = fixture(50);
    let engine = ClientQueryEngine::new();
    let query = QueryState::default().filtered_by("status", "   ");
    assert_eq!(engine.filtered_count(&rows, &query), 50);
}

// =============================================================================
// Stable Sort
// =============================================================================

/// Rows equal under every sort key keep their input order.
#[test]
fn test_sort_is_stable() {
    let rows = fixture(120);
    let query = QueryState::new(0, 1000)
        .unwrap()
        .sorted_by(SortSpec::desc("status"))
        .sorted_by(SortSpec::asc("score"));

    let result = execute(&rows, &query);
    assert_eq!(result.len(), 120);

    for pair in result.rows.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.get("status") == b.get("status") && a.get("score") == b.get("score") {
            let seq_a = a.get("seq").and_then(|c| c.as_number()).unwrap();
            let seq_b = b.get("seq").and_then(|c| c.as_number()).unwrap();
            assert!(seq_a < seq_b, "tie reordered: {} before {}", a.id(), b.id());
        }
    }
}

/// Descending negates only its own key.
#[test]
fn test_desc_negates_one_key_only() {
    let rows = vec![
        Row::new("1").with("team", "red").with("name", "b"),
        Row::new("2").with("team", "blue").with("name", "a"),
        Row::new("3").with("team", "red").with("name", "a"),
        Row::new("4").with("team", "blue").with("name", "b"),
    ];
    let query = QueryState::default()
        .sorted_by(SortSpec::desc("team"))
        .sorted_by(SortSpec::asc("name"));

    assert_eq!(execute(&rows, &query).ids(), vec!["3", "1", "2", "4"]);
}

// =============================================================================
// Pagination Bound
// =============================================================================

/// rows.len() == min(size, max(0, total - page*size)) for every window.
#[test]
fn test_pagination_bound() {
    let rows = fixture(47);
    for size in [1, 3, 10, 47, 50] {
        for page in 0..20 {
            let query = QueryState::new(page, size).unwrap().filtered_by("role", "e");
            let result = execute(&rows, &query);
            assert_eq!(
                result.len(),
                expected_page_len(result.total, page, size),
                "page {} size {}",
                page,
                size
            );
            assert_eq!(result.total_pages, result.total.div_ceil(size));
        }
    }
}

/// Pages partition the filtered, sorted set.
#[test]
fn test_pages_concatenate_to_full_result() {
    let rows = fixture(64);
    let base = QueryState::new(0, 1000).unwrap().sorted_by(SortSpec::asc("email"));
    let all = execute(&rows, &base);

    let mut stitched = Vec::new();
    for page in 0..7 {
        let query = base.with_page(page, 10).unwrap();
        stitched.extend(execute(&rows, &query).rows);
    }
    assert_eq!(stitched, all.rows);
}

// =============================================================================
// Reference Scenarios
// =============================================================================

/// Structured `eq` on status "Active" keeps rows 1 and 3.
#[test]
fn test_structured_eq_status_filter() {
    let rows = vec![
        Row::new("1").with("status", "Active"),
        Row::new("2").with("status", "Inactive"),
        Row::new("3").with("status", "Active"),
    ];
    let query = QueryState::default().filtered_by(
        "status",
        FilterCriterion::structured(FilterOperator::Eq, "Active"),
    );

    let result = execute(&rows, &query);
    assert_eq!(result.ids(), vec!["1", "3"]);
    assert_eq!(result.total, 2);
    assert_eq!(result.total_pages, 1);
}

/// Scalar `{status: "Active"}` is a substring match, so "Inactive" matches too.
#[test]
fn test_scalar_status_filter_is_substring() {
    let rows = vec![
        Row::new("1").with("status", "Active"),
        Row::new("2").with("status", "Inactive"),
        Row::new("3").with("status", "Active"),
    ];
    let query = QueryState::default().filtered_by("status", "Active");
    let result = execute(&rows, &query);
    assert_eq!(result.ids(), vec!["1", "2", "3"]);
    assert_eq!(result.total, 3);
}

/// 25 unsorted rows, sorted by name, page 1 of size 10.
#[test]
fn test_scenario_sorted_second_page() {
    let rows: Vec<Row> = (0..25)
        .map(|i| {
            let n = (i * 7) % 25;
            Row::new(format!("{}", n)).with("name", format!("name{:02}", n))
        })
        .collect();
    let query = QueryState::new(1, 10)
        .unwrap()
        .with_sort("name", SortDirection::Asc)
        .with_page(1, 10)
        .unwrap();

    let result = execute(&rows, &query);
    let expected: Vec<String> = (10..20).map(|n| n.to_string()).collect();
    assert_eq!(result.ids(), expected);
    assert_eq!(result.total, 25);
    assert_eq!(result.total_pages, 3);
}

/// Global search matches one email regardless of case.
#[test]
fn test_scenario_global_search() {
    let rows = vec![
        Row::new("1").with("name", "Ann").with("email", "ann@x.com"),
        Row::new("2").with("name", "Bob").with("email", "john@x.com"),
        Row::new("3").with("name", "Cy").with("email", "cy@x.com"),
    ];

    for term in ["john", "JOHN", "JoHn"] {
        let result = execute(&rows, &QueryState::default().with_global(term));
        assert_eq!(result.ids(), vec!["2"]);
    }
}

/// A page past the end is empty but reports the full total.
#[test]
fn test_out_of_range_page() {
    let rows = fixture(12);
    let result = execute(&rows, &QueryState::new(9, 10).unwrap());
    assert!(result.is_empty());
    assert_eq!(result.total, 12);
    assert_eq!(result.total_pages, 2);
}
