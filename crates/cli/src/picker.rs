//! Interactive fallback when window discovery times out: the user picks the
//! window to embed from a numbered list.

use std::io::{BufRead, Write};

use opcon_embed::WindowPicker;

/// Reads the selection from stdin. The list is written to stderr so that
/// stdout stays clean for scripted use.
pub struct StdinPicker;

impl WindowPicker for StdinPicker {
    fn pick(&self, titles: &[String]) -> Option<usize> {
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "No matching window was found. Visible windows:");
        for (i, title) in titles.iter().enumerate() {
            let _ = writeln!(err, "  {}. {title}", i + 1);
        }
        let _ = write!(err, "Select a window to embed (1-{}, empty to cancel): ", titles.len());
        let _ = err.flush();

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).ok()?;
        parse_selection(&line, titles.len())
    }
}

/// Maps a 1-based answer to a 0-based index; anything else cancels.
fn parse_selection(line: &str, count: usize) -> Option<usize> {
    let choice: usize = line.trim().parse().ok()?;
    if choice >= 1 && choice <= count { Some(choice - 1) } else { None }
}
