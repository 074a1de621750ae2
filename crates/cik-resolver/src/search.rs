use analysis_core::TickerCatalog;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub ticker: String,
    pub company_name: String,
    pub cik: String,
}

/// Match quality, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchRank {
    ExactTicker,
    TickerPrefix,
    TickerContains,
    NameContains,
    Subsequence,
}

/// Case-insensitive ranked search over ticker symbols and company names.
///
/// Ties within a rank go to the shorter ticker, then alphabetical order.
pub fn search_catalog(catalog: &TickerCatalog, query: &str, limit: usize) -> Vec<SearchResult> {
    let query = query.trim().to_uppercase();
    if query.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut hits: Vec<(MatchRank, &String, &analysis_core::CatalogEntry)> = catalog
        .iter()
        .filter_map(|(ticker, entry)| rank(&query, ticker, &entry.title).map(|r| (r, ticker, entry)))
        .collect();

    hits.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.len().cmp(&b.1.len()))
            .then_with(|| a.1.cmp(b.1))
    });

    hits.into_iter()
        .take(limit)
        .map(|(_, ticker, entry)| SearchResult {
            ticker: ticker.clone(),
            company_name: entry.title.clone(),
            cik: entry.cik.clone(),
        })
        .collect()
}

fn rank(query: &str, ticker: &str, title: &str) -> Option<MatchRank> {
    let ticker = ticker.to_uppercase();
    if ticker == query {
        return Some(MatchRank::ExactTicker);
    }
    if ticker.starts_with(query) {
        return Some(MatchRank::TickerPrefix);
    }
    if ticker.contains(query) {
        return Some(MatchRank::TickerContains);
    }
    let title = title.to_uppercase();
    if title.contains(query) {
        return Some(MatchRank::NameContains);
    }
    let haystack = format!("{} {}", ticker, title);
    if is_subsequence(query, &haystack) {
        return Some(MatchRank::Subsequence);
    }
    None
}

/// Every non-space char of `needle` appears in `haystack` in order.
fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut hay = haystack.chars();
    needle
        .chars()
        .filter(|c| !c.is_whitespace())
        .all(|n| hay.any(|h| h == n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::CatalogEntry;

    fn catalog() -> TickerCatalog {
        [
            ("AAPL", "0000320193", "Apple Inc."),
            ("APLE", "0001418121", "Apple Hospitality REIT, Inc."),
            ("MSFT", "0000789019", "Microsoft Corp"),
            ("GOOGL", "0001652044", "Alphabet Inc."),
            ("GOOG", "0001652044", "Alphabet Inc."),
            ("PAAPL", "0009999999", "Pineapple Holdings"),
        ]
        .into_iter()
        .map(|(t, c, n)| {
            (
                t.to_string(),
                CatalogEntry {
                    cik: c.to_string(),
                    title: n.to_string(),
                },
            )
        })
        .collect()
    }

    fn tickers(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.ticker.as_str()).collect()
    }

    #[test]
    fn test_ranking_order() {
        let results = search_catalog(&catalog(), "aapl", 10);
        // exact, ticker substring, then in-order match on "APLE APPLE ..."
        assert_eq!(tickers(&results), vec!["AAPL", "PAAPL", "APLE"]);

        let results = search_catalog(&catalog(), "goog", 10);
        assert_eq!(tickers(&results), vec!["GOOG", "GOOGL"]);
    }

    #[test]
    fn test_name_and_subsequence_matches() {
        let results = search_catalog(&catalog(), "apple", 10);
        assert_eq!(tickers(&results), vec!["AAPL", "APLE", "PAAPL"]);

        let results = search_catalog(&catalog(), "msft corp", 10);
        assert_eq!(tickers(&results), vec!["MSFT"]);
    }

    #[test]
    fn test_empty_query_and_limit() {
        assert!(search_catalog(&catalog(), "   ", 10).is_empty());
        assert_eq!(search_catalog(&catalog(), "a", 2).len(), 2);
    }
}
