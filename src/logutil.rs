//! Log hygiene helpers for user-authored strings (POI names, zone labels come
//! from custom maps and may contain anything) and compact coordinate output.

use crate::geo::Coordinate;

/// Escape a string for single-line logging, replacing newlines, tabs and
/// other control characters with visible escapes. Long values are cut at
/// `MAX_PREVIEW` characters with an ellipsis so a hostile POI name cannot
/// flood the log.
pub fn escape_log(s: &str) -> String {
    const MAX_PREVIEW: usize = 120;
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Format a coordinate for log lines: five decimal places (~1 m resolution)
/// keeps positions readable without pretending to more precision than GPS has.
pub fn fmt_coord(c: &Coordinate) -> String {
    format!("({:.5}, {:.5})", c.latitude, c.longitude)
}
