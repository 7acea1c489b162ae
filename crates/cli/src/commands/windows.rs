//! The `windows` command: list visible top-level windows, either as a table
//! or as JSON for scripting.

use serde::Serialize;

#[derive(Debug, Serialize)]
#[cfg_attr(not(windows), allow(dead_code))]
struct WindowRow {
    handle: isize,
    title: String,
}

#[cfg(windows)]
pub fn execute(json: bool) -> anyhow::Result<()> {
    use opcon_embed::WindowSystem;
    use opcon_embed::window_system::win32::Win32WindowSystem;

    let ws = Win32WindowSystem::new();
    let rows: Vec<WindowRow> = ws
        .visible_windows()
        .into_iter()
        .filter(|c| !c.title.is_empty())
        .map(|c| WindowRow {
            handle: c.handle.0,
            title: c.title,
        })
        .collect();

    print!("{}", render(&rows, json)?);
    Ok(())
}

#[cfg(not(windows))]
pub fn execute(_json: bool) -> anyhow::Result<()> {
    anyhow::bail!("window enumeration requires Windows")
}

#[cfg_attr(not(windows), allow(dead_code))]
fn render(rows: &[WindowRow], json: bool) -> anyhow::Result<String> {
    if json {
        let mut out = serde_json::to_string_pretty(rows)?;
        out.push('\n');
        return Ok(out);
    }
    let mut out = String::new();
    for row in rows {
        out.push_str(&format!("{:>12}  {}\n", format!("0x{:x}", row.handle), row.title));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<WindowRow> {
        vec![
            WindowRow {
                handle: 0x1a2b,
                title: "Item List".to_string(),
            },
            WindowRow {
                handle: 66,
                title: "Notepad".to_string(),
            },
        ]
    }

    #[test]
    fn table_shows_hex_handles() {
        let out = render(&rows(), false).unwrap();
        assert!(out.contains("0x1a2b  Item List"));
        assert!(out.contains("0x42  Notepad"));
    }

    #[test]
    fn json_is_machine_readable() {
        let out = render(&rows(), true).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0]["handle"], 0x1a2b);
        assert_eq!(parsed[1]["title"], "Notepad");
    }
}
