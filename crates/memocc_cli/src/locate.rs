//! `memocc locate`: show which compiler would be wrapped.

use memocc_cli::EXIT_CONFIG;
use memocc_driver::{find_all, select_compiler};

/// Prints every `PATH` match for `tool`, marking the selected one with `*`.
pub fn run(tool: &str) -> Result<i32, Box<dyn std::error::Error>> {
    let search_path = std::env::var_os("PATH").unwrap_or_default();
    let candidates = find_all(tool, &search_path);
    let this_exe = std::env::current_exe().ok();

    let selected = match select_compiler(tool, &candidates, this_exe.as_deref()) {
        Ok(path) => Some(path),
        Err(err) => {
            eprintln!("memocc: {err}");
            None
        }
    };
    for candidate in &candidates {
        let mark = if Some(candidate) == selected.as_ref() {
            "*"
        } else {
            " "
        };
        println!("{mark} {}", candidate.display());
    }
    Ok(if selected.is_some() { 0 } else { EXIT_CONFIG })
}
