//! Terminal logging with colored module prefixes.
//!
//! ```ignore
//! log!("build"; "transformed {} files", count);
//! ```

use colored::{ColoredString, Colorize};

/// Log a message with a colored module prefix.
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Print one line as `[module] message`.
///
/// Errors go to stderr, everything else to stdout.
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);
    if module_lower == "error" {
        eprintln!("{prefix} {message}");
    } else {
        println!("{prefix} {message}");
    }
}

fn colorize_prefix(module: &str, module_lower: &str) -> ColoredString {
    let prefix = format!("[{module}]");
    match module_lower {
        "watch" => prefix.bright_green().bold(),
        "error" => prefix.bright_red().bold(),
        "copy" => prefix.bright_blue().bold(),
        _ => prefix.bright_yellow().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_wraps_module_name() {
        colored::control::set_override(false);
        assert_eq!(colorize_prefix("build", "build").to_string(), "[build]");
        assert_eq!(colorize_prefix("Watch", "watch").to_string(), "[Watch]");
    }
}
