use console::style;
use std::fmt::Display;

/// Green bold: success marks, approved actions.
pub fn success<D: Display>(text: D) -> String {
    style(text).green().bold().to_string()
}

/// White bold: section headers.
pub fn header<D: Display>(text: D) -> String {
    style(text).white().bold().to_string()
}

pub fn dim<D: Display>(text: D) -> String {
    style(text).dim().to_string()
}

/// Yellow: commands and warnings.
pub fn yellow<D: Display>(text: D) -> String {
    style(text).yellow().to_string()
}

/// Red bold: failures.
pub fn error<D: Display>(text: D) -> String {
    style(text).red().bold().to_string()
}

/// Cyan bold: prompt and bullets.
pub fn accent<D: Display>(text: D) -> String {
    style(text).cyan().bold().to_string()
}

/// Colour a unified diff line by line.
pub fn diff<D: Display>(text: D) -> String {
    text.to_string()
        .lines()
        .map(|line| {
            if line.starts_with("+++") || line.starts_with("---") {
                header(line)
            } else if line.starts_with("@@") {
                style(line).cyan().to_string()
            } else if line.starts_with('+') {
                style(line).green().to_string()
            } else if line.starts_with('-') {
                style(line).red().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
