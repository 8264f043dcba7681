//! Cloud Job Ticket construction
//!
//! A ticket is the JSON description of how the printer should handle a job.
//! Field order is fixed by the struct layout, so equal options always
//! serialize to identical bytes.

use std::fmt;

use serde::Serialize;

const TICKET_VERSION: &str = "1.0";

/// Duplex type code for single-sided printing.
pub const DUPLEX_NONE: u8 = 0;
/// Duplex type code for double-sided printing (short edge).
pub const DUPLEX_SHORT_EDGE: u8 = 2;

const STAPLE_ITEM_ID: &str = "psk:JobStapleAllDocuments";
const STAPLE_TOP_LEFT: &str = "psk:StapleTopLeft";

/// User-facing print options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintOptions {
    pub color: bool,
    /// Double-sided.
    pub duplex: bool,
    pub copies: u32,
    pub collate: bool,
    pub staple: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            color: false,
            duplex: false,
            copies: 1,
            collate: true,
            staple: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColorType {
    StandardColor,
    StandardMonochrome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct ColorItem {
    #[serde(rename = "type")]
    kind: ColorType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct DuplexItem {
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct CopiesItem {
    copies: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct CollateItem {
    collate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct VendorTicketItem {
    id: &'static str,
    value: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct PrintSection {
    color: ColorItem,
    duplex: DuplexItem,
    copies: CopiesItem,
    collate: CollateItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    vendor_ticket_item: Option<Vec<VendorTicketItem>>,
}

/// Serialized form of a set of print options. Display renders the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintTicket {
    version: &'static str,
    print: PrintSection,
}

impl PrintTicket {
    pub fn color_type(&self) -> ColorType {
        self.print.color.kind
    }

    pub fn duplex_type(&self) -> u8 {
        self.print.duplex.kind
    }

    pub fn copies(&self) -> u32 {
        self.print.copies.copies
    }

    pub fn collate(&self) -> bool {
        self.print.collate.collate
    }

    pub fn staple(&self) -> bool {
        self.print.vendor_ticket_item.is_some()
    }
}

impl fmt::Display for PrintTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// Build the ticket for `options`.
pub fn build_ticket(options: &PrintOptions) -> PrintTicket {
    let color = if options.color {
        ColorType::StandardColor
    } else {
        ColorType::StandardMonochrome
    };
    let duplex = if options.duplex {
        DUPLEX_SHORT_EDGE
    } else {
        DUPLEX_NONE
    };
    let vendor_ticket_item = options.staple.then(|| {
        vec![VendorTicketItem {
            id: STAPLE_ITEM_ID,
            value: STAPLE_TOP_LEFT,
        }]
    });

    PrintTicket {
        version: TICKET_VERSION,
        print: PrintSection {
            color: ColorItem { kind: color },
            duplex: DuplexItem { kind: duplex },
            copies: CopiesItem {
                copies: options.copies,
            },
            collate: CollateItem {
                collate: options.collate,
            },
            vendor_ticket_item,
        },
    }
}
