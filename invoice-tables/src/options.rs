use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::aggregate::TARGET_PRODUCT;

/// 1-based pages to analyze, parsed from strings like `1-3,5`. Ranges are kept
/// as written, so an open-ended `1-4000000000` costs nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    ranges: Vec<RangeInclusive<u32>>,
}

impl PageSelection {
    #[must_use]
    pub fn contains(&self, page: u32) -> bool {
        self.ranges.iter().any(|range| range.contains(&page))
    }

    /// Number of distinct pages selected.
    #[must_use]
    pub fn page_count(&self) -> u64 {
        let mut sorted = self.ranges.clone();
        sorted.sort_by_key(|range| *range.start());

        let mut count = 0;
        let mut covered_to = 0_u32;
        for range in sorted {
            let start = (*range.start()).max(covered_to.saturating_add(1));
            if start <= *range.end() && covered_to < *range.end() {
                count += u64::from(*range.end() - start) + 1;
                covered_to = *range.end();
            }
        }
        count
    }
}

fn parse_page_number(raw: &str, what: &str) -> Result<u32, String> {
    let page: u32 = raw
        .trim()
        .parse()
        .map_err(|_| format!("invalid {what}: '{}'", raw.trim()))?;
    if page == 0 {
        return Err("pages are 1-based".to_string());
    }
    Ok(page)
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for token in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some((start, end)) = token.split_once('-') {
                let start = parse_page_number(start, "page range start")?;
                let end = parse_page_number(end, "page range end")?;
                if end < start {
                    return Err(format!(
                        "invalid range '{token}': end is smaller than start"
                    ));
                }
                ranges.push(start..=end);
            } else {
                let page = parse_page_number(token, "page number")?;
                ranges.push(page..=page);
            }
        }

        if ranges.is_empty() {
            return Err("page selection cannot be empty".to_string());
        }

        Ok(Self { ranges })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzeOptions {
    pub pages: Option<PageSelection>,
    pub min_cols: usize,
    /// Product name compared against the trimmed `Product` cell.
    pub product: String,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            pages: None,
            min_cols: 2,
            product: TARGET_PRODUCT.to_string(),
        }
    }
}
