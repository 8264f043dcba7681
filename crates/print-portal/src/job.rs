//! Queued print jobs and colour classification

use serde::{Deserialize, Serialize};

/// One job waiting in the release queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintJob {
    pub job_id: String,
    pub name: String,
    pub pages: u32,
    pub copies: u32,
    pub price: f64,
    pub printer_name: String,
    pub date: String,
}

/// Per-page prices of one printer class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintPrice {
    pub name: String,
    pub black: f64,
    pub color: f64,
}

impl PrintPrice {
    pub fn new(name: &str, black: f64, color: f64) -> Self {
        Self {
            name: name.to_owned(),
            black,
            color,
        }
    }
}

/// Campus printer price table.
pub fn default_print_prices() -> Vec<PrintPrice> {
    vec![
        PrintPrice::new("mfd-single-sided", 0.0255, 0.255),
        PrintPrice::new("mfd-double-sided", 0.0205, 0.25),
        PrintPrice::new("laser-single-sided", 0.0285, 0.285),
        PrintPrice::new("laser-double-sided", 0.0235, 0.28),
    ]
}

impl PrintJob {
    /// Price of one printed page, or `None` for a job with no pages.
    pub fn price_per_page(&self) -> Option<f64> {
        let sheets = self.pages.checked_mul(self.copies)?;
        (sheets > 0).then(|| self.price / f64::from(sheets))
    }

    /// Whether the job was priced as colour.
    ///
    /// The portal does not report colour directly, so the per-page price is
    /// matched against the closest entry of `prices`. The first entry wins a
    /// tie, colour before black within a row. Returns `false` when `prices`
    /// is empty or the job has no pages.
    pub fn is_color(&self, prices: &[PrintPrice]) -> bool {
        let Some(per_page) = self.price_per_page() else {
            return false;
        };

        let mut best: Option<(bool, f64)> = None;
        for price in prices {
            for (is_color, rate) in [(true, price.color), (false, price.black)] {
                let distance = (per_page - rate).abs();
                if best.is_none_or(|(_, d)| distance < d) {
                    best = Some((is_color, distance));
                }
            }
        }
        best.is_some_and(|(is_color, _)| is_color)
    }
}
