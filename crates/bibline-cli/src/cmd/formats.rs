//! Formats subcommand - list the supported input formats

use bibline_formats::{Format, Framing};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

fn framing_label(framing: Framing) -> String {
    match framing {
        Framing::JsonLines => "JSON lines".to_string(),
        Framing::XmlElements(name) => format!("XML <{name}>"),
    }
}

pub fn formats_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Format").fg(Color::Cyan),
            Cell::new("Source ID").fg(Color::Cyan),
            Cell::new("Framing").fg(Color::Cyan),
            Cell::new("Description").fg(Color::Cyan),
        ]);

    for format in Format::ALL {
        table.add_row(vec![
            Cell::new(format.as_str()).fg(Color::Green),
            Cell::new(format.source_id()),
            Cell::new(framing_label(format.framing())),
            Cell::new(format.description()),
        ]);
    }
    table
}

pub fn run() {
    eprintln!("\n{}", formats_table());
}
