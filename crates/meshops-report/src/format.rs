//! Report serialization: CSV for the bucket, an aligned text table for
//! operators and Slack.

use meshops_common::types::TriggerRow;

/// Formats rows as CSV. The first line is the title verbatim; each row's
/// fields are joined with `", "` and the line ends with a trailing comma.
/// This is the exact layout the downstream report consumers ingest, so it is
/// pinned by tests.
pub fn format_csv(title: &str, rows: &[TriggerRow]) -> String {
    let mut out = String::new();
    out.push_str(title);
    out.push('\n');
    for row in rows {
        out.push_str(&format!(
            "{}, {}, {}, {},\n",
            row.host, row.description, row.priority, row.trip_count
        ));
    }
    out
}

const HEADERS: [&str; 4] = ["Host", "Description", "Priority", "Trip Count"];

/// Formats rows as a four-column left-aligned text table with a two-space
/// gutter. Column widths grow to fit the widest cell.
pub fn format_table(rows: &[TriggerRow]) -> String {
    let mut widths = [0usize; 4];
    for (i, header) in HEADERS.iter().enumerate() {
        widths[i] = header.len();
    }
    for row in rows {
        widths[0] = widths[0].max(row.host.len());
        widths[1] = widths[1].max(row.description.len());
        widths[2] = widths[2].max(row.priority.to_string().len());
        widths[3] = widths[3].max(row.trip_count.to_string().len());
    }

    let mut out = String::new();
    push_line(&mut out, &widths, HEADERS.map(str::to_string));
    for row in rows {
        push_line(
            &mut out,
            &widths,
            [
                row.host.clone(),
                row.description.clone(),
                row.priority.to_string(),
                row.trip_count.to_string(),
            ],
        );
    }
    out
}

fn push_line(out: &mut String, widths: &[usize; 4], cells: [String; 4]) {
    for (i, cell) in cells.iter().enumerate() {
        if i == 3 {
            // Last column carries no padding.
            out.push_str(cell);
        } else {
            out.push_str(&format!("{:<width$}  ", cell, width = widths[i]));
        }
    }
    out.push('\n');
}
