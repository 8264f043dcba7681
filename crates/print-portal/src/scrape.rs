//! Extractors for the portal's server-rendered pages

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{Error, Result};
use crate::job::PrintJob;
use crate::session::PortalPath;

static BUDGET_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\.c_updateToken\("(.*)"\)"#).expect("valid regex"));
static QUEUE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"token=(.*)";"#).expect("valid regex"));
static JOB_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"c_OnSelectJob\('(.*)'\)").expect("valid regex"));

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static BUDGET_HEADLINE: LazyLock<Selector> = LazyLock::new(|| selector("font.editHeadline"));
static QUEUE_CELLS: LazyLock<Selector> = LazyLock::new(|| selector("#divMain tr td.Middle"));

const BUDGET_MARKER: &str = "Your current budget is:";

/// Number of `td.Middle` cells rendered per queued job.
pub const QUEUE_ROW_WIDTH: usize = 7;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Pull the session token out of a sign-in response.
pub fn extract_token(path: PortalPath, body: &str) -> Result<String> {
    let pattern = match path {
        PortalPath::Budget => &*BUDGET_TOKEN,
        PortalPath::Queue => &*QUEUE_TOKEN,
    };
    pattern
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|token| token.as_str().to_owned())
        .ok_or_else(|| Error::Scraping(format!("no token found on {} sign-in page", path)))
}

fn require_title(document: &Html) -> Result<()> {
    if document.select(&TITLE).next().is_none() {
        return Err(Error::Scraping("page has no title".into()));
    }
    Ok(())
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

/// Parse the remaining budget from the budget page.
pub fn parse_budget(body: &str) -> Result<f64> {
    let document = Html::parse_document(body);
    require_title(&document)?;

    let headline = document
        .select(&BUDGET_HEADLINE)
        .next()
        .ok_or_else(|| Error::Scraping("budget not found".into()))?;
    let labelled = headline
        .parent()
        .and_then(ElementRef::wrap)
        .is_some_and(|parent| parent.text().collect::<String>().contains(BUDGET_MARKER));
    if !labelled {
        return Err(Error::Scraping("budget not found".into()));
    }

    let text = text_of(headline);
    text.parse()
        .map_err(|_| Error::Scraping(format!("budget is not a valid number: {text:?}")))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Pages,
    Copies,
    Price,
    PrinterName,
    Date,
}

/// Cell offset within a row → field it carries. Offset 5 is unused.
const COLUMNS: [(usize, Field); 6] = [
    (0, Field::Name),
    (1, Field::Pages),
    (2, Field::Copies),
    (3, Field::Price),
    (4, Field::PrinterName),
    (6, Field::Date),
];

struct Row<'a> {
    index: usize,
    cells: &'a [ElementRef<'a>],
}

impl Row<'_> {
    fn cell(&self, field: Field) -> Result<ElementRef<'_>> {
        COLUMNS
            .iter()
            .find(|(_, f)| *f == field)
            .and_then(|(offset, _)| self.cells.get(*offset).copied())
            .ok_or_else(|| Error::Scraping(format!("queue row {} is truncated", self.index)))
    }

    fn text(&self, field: Field) -> Result<String> {
        self.cell(field).map(text_of)
    }

    fn number<T: std::str::FromStr>(&self, field: Field, label: &str) -> Result<T> {
        let text = self.text(field)?;
        text.parse().map_err(|_| {
            Error::Scraping(format!(
                "queue row {}: {label} is not a valid number: {text:?}",
                self.index
            ))
        })
    }

    fn job_id(&self) -> Result<String> {
        let cell = self.cell(Field::Name)?;
        cell.value()
            .attr("onclick")
            .and_then(|onclick| JOB_ID.captures(onclick))
            .and_then(|caps| caps.get(1))
            .map(|id| id.as_str().to_owned())
            .ok_or_else(|| {
                Error::Scraping(format!(
                    "print job id not found for document: {}",
                    text_of(cell)
                ))
            })
    }

    fn to_job(&self) -> Result<PrintJob> {
        Ok(PrintJob {
            job_id: self.job_id()?,
            name: self.text(Field::Name)?,
            pages: self.number(Field::Pages, "pages")?,
            copies: self.number(Field::Copies, "copies")?,
            price: self.number(Field::Price, "price")?,
            printer_name: self.text(Field::PrinterName)?,
            date: self.text(Field::Date)?,
        })
    }
}

/// Parse the queued jobs from the queue page.
///
/// Fails when the cell count is not a whole number of rows rather than
/// silently dropping the trailing cells.
pub fn parse_queue(body: &str) -> Result<Vec<PrintJob>> {
    let document = Html::parse_document(body);
    require_title(&document)?;

    let cells: Vec<ElementRef<'_>> = document.select(&QUEUE_CELLS).collect();
    if cells.len() % QUEUE_ROW_WIDTH != 0 {
        return Err(Error::Scraping(format!(
            "queue table has {} cells, not a multiple of {QUEUE_ROW_WIDTH}",
            cells.len()
        )));
    }

    cells
        .chunks_exact(QUEUE_ROW_WIDTH)
        .enumerate()
        .map(|(index, cells)| Row { index, cells }.to_job())
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Budget page showing `amount`.
    pub fn budget_page(amount: &str) -> String {
        format!(
            r#"<html><head><title>uniFLOW Budget</title></head><body>
<table><tr><td>Your current budget is: <font class="editHeadline"> {amount} </font></td></tr></table>
</body></html>"#
        )
    }

    /// One rendered queue row.
    pub fn queue_row(id: &str, name: &str, pages: &str, copies: &str, price: &str) -> String {
        format!(
            r#"<tr>
<td class="Middle" onclick="c_OnSelectJob('{id}')">{name}</td>
<td class="Middle">{pages}</td>
<td class="Middle">{copies}</td>
<td class="Middle">{price}</td>
<td class="Middle">HH-MFD</td>
<td class="Middle"><img src="x.gif"></td>
<td class="Middle">10/18/2026 9:15 AM</td>
</tr>"#
        )
    }

    /// Queue page wrapping pre-rendered rows.
    pub fn queue_page(rows: &str) -> String {
        format!(
            r#"<html><head><title>uniFLOW Release Queue</title></head><body>
<div id="divMain"><table><tr><th class="Middle">Document</th></tr>{rows}</table></div>
<table><tr><td class="Middle">footer cell outside the queue</td></tr></table>
</body></html>"#
        )
    }
}
