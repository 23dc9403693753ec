use crate::models::Exchange;

/// Where a holding's live data comes from and under which symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub exchange: Exchange,
    /// Identifier handed to the authoritative source.
    pub lookup_symbol: String,
    /// Exchange-qualified symbol reported back to the client.
    pub resolved_symbol: String,
}

/// All-digit identifiers are BSE scrip codes; everything else is an NSE ticker.
///
/// An existing `.NS`/`.BO` suffix picks the exchange and is never doubled.
/// BSE identifiers go to the fundamentals source without their suffix.
pub fn classify(raw_symbol: &str) -> Classification {
    let symbol = raw_symbol.trim();

    if let Some(code) = symbol.strip_suffix(Exchange::Bse.suffix()) {
        return bse(code);
    }
    if symbol.ends_with(Exchange::Nse.suffix()) {
        return Classification {
            exchange: Exchange::Nse,
            lookup_symbol: symbol.to_string(),
            resolved_symbol: symbol.to_string(),
        };
    }
    if !symbol.is_empty() && symbol.chars().all(|c| c.is_ascii_digit()) {
        return bse(symbol);
    }

    let resolved = format!("{}{}", symbol, Exchange::Nse.suffix());
    Classification {
        exchange: Exchange::Nse,
        lookup_symbol: resolved.clone(),
        resolved_symbol: resolved,
    }
}

fn bse(code: &str) -> Classification {
    Classification {
        exchange: Exchange::Bse,
        lookup_symbol: code.to_string(),
        resolved_symbol: format!("{}{}", code, Exchange::Bse.suffix()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_code_routes_to_bse() {
        let c = classify("532174");
        assert_eq!(c.exchange, Exchange::Bse);
        assert_eq!(c.lookup_symbol, "532174");
        assert_eq!(c.resolved_symbol, "532174.BO");
    }

    #[test]
    fn test_ticker_routes_to_nse_with_suffix() {
        let c = classify("HDFCBANK");
        assert_eq!(c.exchange, Exchange::Nse);
        assert_eq!(c.lookup_symbol, "HDFCBANK.NS");
        assert_eq!(c.resolved_symbol, "HDFCBANK.NS");
    }

    #[test]
    fn test_mixed_alphanumeric_is_a_ticker() {
        assert_eq!(classify("M&M").exchange, Exchange::Nse);
        assert_eq!(classify("3MINDIA").exchange, Exchange::Nse);
    }

    #[test]
    fn test_existing_suffix_is_not_doubled() {
        assert_eq!(classify("TCS.NS").lookup_symbol, "TCS.NS");
        assert_eq!(classify("TCS.NS").exchange, Exchange::Nse);
        assert_eq!(classify("500325.BO").resolved_symbol, "500325.BO");
    }

    #[test]
    fn test_bse_suffix_routes_to_fundamentals() {
        let c = classify("500325.BO");
        assert_eq!(c.exchange, Exchange::Bse);
        assert_eq!(c.lookup_symbol, "500325");
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(classify(" 532174 ").exchange, Exchange::Bse);
        assert_eq!(classify(" INFY ").lookup_symbol, "INFY.NS");
    }
}
