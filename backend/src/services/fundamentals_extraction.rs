//! Extraction of price, P/E and earnings from a Screener.in company page.
//!
//! The page markup drifts, so extraction runs an ordered chain of
//! strategies. Each strategy is a pure function of the parsed document and
//! only fills fields that earlier strategies left empty:
//!
//! 1. `summary_ratios` - the `#top-ratios` summary list (name / value pairs)
//! 2. `labelled_text` - every element with a class attribute, matched by label
//!    (`P/E`, `Earnings`, `Current Price`) with the first number after it
//! 3. `profit_and_loss` - the EPS row of the profit & loss table
//!
//! A strategy that errors is skipped. `extract` fails only when every
//! strategy it tried failed.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::debug;

use crate::models::AuxiliaryRatios;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("invalid selector {0}")]
    Selector(String),

    #[error("invalid pattern: {0}")]
    Pattern(String),

    #[error("page has no {0} section")]
    MissingSection(&'static str),
}

/// Values recovered from a page so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub price: Option<BigDecimal>,
    pub pe_ratio: Option<String>,
    pub latest_earnings: Option<String>,
    pub ratios: AuxiliaryRatios,
}

impl Extraction {
    pub fn is_complete(&self) -> bool {
        self.price.is_some() && self.pe_ratio.is_some() && self.latest_earnings.is_some()
    }

    fn fill_missing_from(&mut self, other: Extraction) {
        if self.price.is_none() {
            self.price = other.price;
        }
        if self.pe_ratio.is_none() {
            self.pe_ratio = other.pe_ratio;
        }
        if self.latest_earnings.is_none() {
            self.latest_earnings = other.latest_earnings;
        }
        self.ratios.fill_missing_from(other.ratios);
    }
}

struct Strategy {
    name: &'static str,
    needed: fn(&Extraction) -> bool,
    run: fn(&Html) -> Result<Extraction, ExtractionError>,
}

fn always(_: &Extraction) -> bool {
    true
}

fn missing_any_headline(e: &Extraction) -> bool {
    !e.is_complete()
}

fn missing_earnings(e: &Extraction) -> bool {
    e.latest_earnings.is_none()
}

const STRATEGIES: [Strategy; 3] = [
    Strategy { name: "summary-ratios", needed: always, run: summary_ratios },
    Strategy { name: "labelled-text", needed: missing_any_headline, run: labelled_text },
    Strategy { name: "profit-and-loss", needed: missing_earnings, run: profit_and_loss },
];

/// Run the strategy chain over a raw HTML page.
pub fn extract(html: &str) -> Result<Extraction, ExtractionError> {
    let document = Html::parse_document(html);
    let mut extraction = Extraction::default();
    let mut any_succeeded = false;
    let mut last_error = None;

    for strategy in STRATEGIES.iter() {
        if !(strategy.needed)(&extraction) {
            continue;
        }

        match (strategy.run)(&document) {
            Ok(found) => {
                any_succeeded = true;
                extraction.fill_missing_from(found);
            }
            Err(e) => {
                debug!("Extraction strategy {} failed: {}", strategy.name, e);
                last_error = Some(e);
            }
        }
    }

    match (any_succeeded, last_error) {
        (false, Some(e)) => Err(e),
        _ => Ok(extraction),
    }
}

/// Reads the `#top-ratios` list: `<li><span class="name">Stock P/E</span><span class="value">…</span></li>`.
pub fn summary_ratios(document: &Html) -> Result<Extraction, ExtractionError> {
    let item_selector = selector("#top-ratios li")?;
    let name_selector = selector(".name")?;
    let value_selector = selector(".value")?;
    let number_selector = selector(".number")?;
    let number = number_pattern()?;

    let mut items = document.select(&item_selector).peekable();
    if items.peek().is_none() {
        return Err(ExtractionError::MissingSection("top-ratios"));
    }

    let mut out = Extraction::default();

    for item in items {
        let Some(name) = item.select(&name_selector).next().map(element_text) else {
            continue;
        };
        let value_text = item
            .select(&value_selector)
            .next()
            .map(element_text)
            .unwrap_or_default();
        let first_number = item
            .select(&number_selector)
            .next()
            .map(element_text)
            .and_then(|t| first_number_in(&number, &t))
            .or_else(|| first_number_in(&number, &value_text));

        let label = name.to_lowercase();
        let display = if value_text.is_empty() { None } else { Some(value_text) };

        if label.contains("current price") {
            out.price = first_number.as_deref().and_then(parse_decimal);
        } else if label.contains("p/e") {
            out.pe_ratio = first_number;
        } else if label.contains("earnings") || label.starts_with("eps") {
            out.latest_earnings = first_number;
        } else if label.contains("market cap") {
            out.ratios.market_cap = display;
        } else if label.contains("book value") {
            out.ratios.book_value = display;
        } else if label.contains("dividend yield") {
            out.ratios.dividend_yield = display;
        } else if label == "roce" {
            out.ratios.roce = display;
        } else if label == "roe" {
            out.ratios.roe = display;
        } else if label.contains("face value") {
            out.ratios.face_value = display;
        }
    }

    Ok(out)
}

/// Scans every element carrying a class for a label followed by a number.
pub fn labelled_text(document: &Html) -> Result<Extraction, ExtractionError> {
    let classed = selector("[class]")?;
    let pe_re = label_pattern(r"P/E")?;
    let earnings_re = label_pattern(r"Earnings")?;
    let price_re = label_pattern(r"Current Price")?;

    let mut nodes = document.select(&classed).peekable();
    if nodes.peek().is_none() {
        return Err(ExtractionError::MissingSection("labelled"));
    }

    let mut out = Extraction::default();

    for node in nodes {
        if out.is_complete() {
            break;
        }
        let text = element_text(node);

        if out.pe_ratio.is_none() {
            out.pe_ratio = capture_number(&pe_re, &text);
        }
        if out.latest_earnings.is_none() {
            out.latest_earnings = capture_number(&earnings_re, &text);
        }
        if out.price.is_none() {
            out.price = capture_number(&price_re, &text).as_deref().and_then(parse_decimal);
        }
    }

    Ok(out)
}

/// Recovers the latest EPS from the profit & loss table; net profit if no EPS row.
pub fn profit_and_loss(document: &Html) -> Result<Extraction, ExtractionError> {
    let row_selector = selector("section#profit-loss table tr")?;
    let cell_selector = selector("td, th")?;
    let number = number_pattern()?;

    let rows: Vec<ElementRef> = document.select(&row_selector).collect();
    if rows.is_empty() {
        return Err(ExtractionError::MissingSection("profit-loss"));
    }

    let latest_in_row = |label_matches: fn(&str) -> bool| -> Option<String> {
        rows.iter().find_map(|row| {
            let cells: Vec<String> = row.select(&cell_selector).map(element_text).collect();
            let (label, values) = cells.split_first()?;
            if !label_matches(&label.to_lowercase()) {
                return None;
            }
            values
                .iter()
                .rev()
                .find_map(|cell| first_number_in(&number, cell))
        })
    };

    let latest_earnings = latest_in_row(|l| l.starts_with("eps"))
        .or_else(|| latest_in_row(|l| l.starts_with("net profit")));

    Ok(Extraction { latest_earnings, ..Default::default() })
}

fn selector(css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::Selector(format!("{}: {:?}", css, e)))
}

fn number_pattern() -> Result<Regex, ExtractionError> {
    Regex::new(r"-?\d[\d,]*(?:\.\d+)?").map_err(|e| ExtractionError::Pattern(e.to_string()))
}

fn label_pattern(label: &str) -> Result<Regex, ExtractionError> {
    Regex::new(&format!(r"(?i){}\D*?(-?\d[\d,]*(?:\.\d+)?)", label))
        .map_err(|e| ExtractionError::Pattern(e.to_string()))
}

fn capture_number(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace(',', ""))
}

fn first_number_in(re: &Regex, text: &str) -> Option<String> {
    re.find(text).map(|m| m.as_str().replace(',', ""))
}

fn parse_decimal(text: &str) -> Option<BigDecimal> {
    BigDecimal::from_str(text).ok()
}

// Collapses whitespace across all descendant text nodes.
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PAGE: &str = r#"
        <html><body>
          <div class="company-ratios">
            <ul id="top-ratios">
              <li class="flex"><span class="name">Market Cap</span>
                <span class="nowrap value">₹ <span class="number">1,23,456</span> Cr.</span></li>
              <li class="flex"><span class="name">Current Price</span>
                <span class="nowrap value">₹ <span class="number">2,451.50</span></span></li>
              <li class="flex"><span class="name">Stock P/E</span>
                <span class="nowrap value"><span class="number">18.4</span></span></li>
              <li class="flex"><span class="name">Dividend Yield</span>
                <span class="nowrap value"><span class="number">0.85</span> %</span></li>
              <li class="flex"><span class="name">ROE</span>
                <span class="nowrap value"><span class="number">14.2</span> %</span></li>
            </ul>
          </div>
          <section id="profit-loss">
            <table class="data-table">
              <tr><th></th><th>Mar 2023</th><th>Mar 2024</th></tr>
              <tr><td class="text">Net Profit</td><td>1,000</td><td>1,250</td></tr>
              <tr><td class="text">EPS in Rs</td><td>41.20</td><td>52.75</td></tr>
            </table>
          </section>
        </body></html>
    "#;

    #[test]
    fn test_full_page_uses_all_tiers() {
        let out = extract(FULL_PAGE).unwrap();

        assert_eq!(out.price, Some(BigDecimal::from_str("2451.50").unwrap()));
        assert_eq!(out.pe_ratio.as_deref(), Some("18.4"));
        assert_eq!(out.latest_earnings.as_deref(), Some("52.75"));
        assert_eq!(out.ratios.market_cap.as_deref(), Some("₹ 1,23,456 Cr."));
        assert_eq!(out.ratios.dividend_yield.as_deref(), Some("0.85 %"));
        assert_eq!(out.ratios.roe.as_deref(), Some("14.2 %"));
    }

    #[test]
    fn test_summary_ratios_alone() {
        let doc = Html::parse_document(FULL_PAGE);
        let out = summary_ratios(&doc).unwrap();

        assert_eq!(out.pe_ratio.as_deref(), Some("18.4"));
        assert_eq!(out.latest_earnings, None);
    }

    #[test]
    fn test_summary_ratios_missing_section_is_an_error() {
        let doc = Html::parse_document("<html><body><p class='x'>hello</p></body></html>");
        assert_eq!(summary_ratios(&doc), Err(ExtractionError::MissingSection("top-ratios")));
    }

    #[test]
    fn test_labelled_text_recovers_drifted_markup() {
        let html = r#"
            <div class="stats">
              <div class="row">Stock P/E: 22.5x</div>
              <div class="row">Latest Earnings per share Rs. 1,204.6</div>
              <div class="row">Current Price ₹ 310</div>
            </div>
        "#;
        let doc = Html::parse_document(html);
        let out = labelled_text(&doc).unwrap();

        assert_eq!(out.pe_ratio.as_deref(), Some("22.5"));
        assert_eq!(out.latest_earnings.as_deref(), Some("1204.6"));
        assert_eq!(out.price, Some(BigDecimal::from(310)));
    }

    #[test]
    fn test_labels_match_case_insensitively() {
        let doc = Html::parse_document(r#"<span class="k">stock p/e 9.1 earnings 3</span>"#);
        let out = labelled_text(&doc).unwrap();

        assert_eq!(out.pe_ratio.as_deref(), Some("9.1"));
        assert_eq!(out.latest_earnings.as_deref(), Some("3"));
    }

    #[test]
    fn test_profit_and_loss_takes_latest_eps() {
        let doc = Html::parse_document(FULL_PAGE);
        let out = profit_and_loss(&doc).unwrap();
        assert_eq!(out.latest_earnings.as_deref(), Some("52.75"));
    }

    #[test]
    fn test_profit_and_loss_falls_back_to_net_profit() {
        let html = r#"
            <section id="profit-loss"><table>
              <tr><td>Sales</td><td>9,000</td></tr>
              <tr><td>Net Profit</td><td>700</td><td>-35</td></tr>
            </table></section>
        "#;
        let out = profit_and_loss(&Html::parse_document(html)).unwrap();
        assert_eq!(out.latest_earnings.as_deref(), Some("-35"));
    }

    #[test]
    fn test_later_tier_does_not_override_earlier_value() {
        let html = r#"
            <ul id="top-ratios">
              <li><span class="name">Stock P/E</span><span class="value"><span class="number">18.4</span></span></li>
            </ul>
            <div class="blurb">P/E 99.9</div>
        "#;
        let out = extract(html).unwrap();
        assert_eq!(out.pe_ratio.as_deref(), Some("18.4"));
    }

    #[test]
    fn test_page_without_any_structure_fails() {
        let err = extract("<html><body><p>Page not found</p></body></html>").unwrap_err();
        assert_eq!(err, ExtractionError::MissingSection("profit-loss"));
    }

    #[test]
    fn test_structure_without_values_is_empty_not_error() {
        let html = r#"<ul id="top-ratios"><li><span class="name">High / Low</span></li></ul>"#;
        let out = extract(html).unwrap();

        assert_eq!(out.price, None);
        assert_eq!(out.pe_ratio, None);
        assert_eq!(out.latest_earnings, None);
    }
}
