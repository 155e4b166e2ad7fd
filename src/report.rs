//! Human-readable report rendering for terminal output.
//!
//! Sections appear in a fixed order: accounts by category, privileged sessions
//! by host, unconstrained delegation principals, and finally any input files
//! that had to be skipped.
use colored::*;

use crate::engine::Engine;

fn visible_len(s: &str) -> usize {
    // Strip ANSI escape sequences (\x1b[ ... m) to compute printable width
    let mut len = 0;
    let mut iter = s.chars().peekable();
    while let Some(ch) = iter.next() {
        if ch == '\u{1b}' {
            if let Some('[') = iter.peek().cloned() {
                let _ = iter.next();
            }
            for c in iter.by_ref() {
                if c == 'm' {
                    break;
                }
            }
        } else {
            len += 1;
        }
    }
    len
}

fn section_header(title: &str) -> String {
    let len = visible_len(title);
    let mut s = String::new();
    s.push('\n');
    s.push_str(title);
    s.push('\n');
    s.push_str(&"─".repeat(len));
    s.push_str("\n\n");
    s
}

fn push_section(out: &mut String, title: &str, lines: Vec<String>) {
    out.push_str(&section_header(&title.bold().green().to_string()));
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
}

pub fn render_summary(engine: &Engine) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{}\n",
        "Quickmapper: BloodHound Lateral Movement Triage"
            .bold()
            .cyan()
    ));
    out.push_str(&format!(
        "Files processed: {}, skipped: {}\n",
        engine.files_processed,
        engine.failures.len()
    ));

    // High-value accounts
    let mut account_lines: Vec<String> = Vec::new();
    if engine.high_value.is_empty() {
        account_lines.push("(No high-value accounts found)".to_string());
    }
    for (category, names) in engine.high_value.iter() {
        account_lines.push(format!(
            "{} ({} found):",
            category.label().bold().blue(),
            names.len()
        ));
        for name in names {
            account_lines.push(format!("  - {}", name));
        }
        account_lines.push(String::new());
    }
    push_section(&mut out, "Top Accounts to Target", account_lines);

    // Privileged sessions
    let mut session_lines: Vec<String> = Vec::new();
    if engine.sessions.is_empty() {
        session_lines.push("(No privileged sessions found)".to_string());
    }
    for (host, users) in &engine.sessions {
        session_lines.push(format!(
            "{} ({} privileged users logged in):",
            host.bold().blue(),
            users.len()
        ));
        for user in users {
            session_lines.push(format!("  - {}", user));
        }
        session_lines.push(String::new());
    }
    push_section(
        &mut out,
        "Privileged User Sessions (Lateral Movement Targets)",
        session_lines,
    );

    // Unconstrained delegation
    let delegation_lines: Vec<String> = if engine.delegation.is_empty() {
        vec!["  No Unconstrained Delegation principals found.".to_string()]
    } else {
        engine
            .delegation
            .iter()
            .map(|name| format!("  - {}", name.red()))
            .collect()
    };
    push_section(
        &mut out,
        "Principals Trusted for Unconstrained Delegation",
        delegation_lines,
    );

    if !engine.failures.is_empty() {
        let failure_lines = engine
            .failures
            .iter()
            .map(|f| format!("  {}: {}", f.file, f.message.dimmed()))
            .collect();
        push_section(&mut out, "Skipped Files", failure_lines);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;

    const EXAMPLE: &str = r#"{"nodes":[
        {"properties":{"name":"A","highvalue":true}},
        {"properties":{"name":"B","admincount":1,"unconstraineddelegation":true},
         "sessions":[{"user":{"name":"A"}}]}
    ]}"#;

    #[test]
    fn snapshot_summary() {
        colored::control::set_override(false);
        let mut e = Engine::new();
        e.load_from_strings(&[EXAMPLE]);
        let s = render_summary(&e);
        insta::assert_snapshot!(s);
    }

    #[test]
    fn empty_run_has_placeholders() {
        colored::control::set_override(false);
        let e = Engine::new();
        let s = render_summary(&e);
        assert!(s.contains("Files processed: 0, skipped: 0"));
        assert!(s.contains("(No high-value accounts found)"));
        assert!(s.contains("(No privileged sessions found)"));
        assert!(s.contains("No Unconstrained Delegation principals found."));
        assert!(!s.contains("Skipped Files"));
    }

    #[test]
    fn sections_keep_fixed_order_and_list_failures() {
        colored::control::set_override(false);
        let mut e = Engine::new();
        e.load_from_strings(&["not json", EXAMPLE]);
        let s = render_summary(&e);
        let accounts = s.find("Top Accounts to Target").unwrap();
        let sessions = s.find("Privileged User Sessions").unwrap();
        let delegation = s.find("Principals Trusted for Unconstrained Delegation").unwrap();
        let skipped = s.find("Skipped Files").unwrap();
        assert!(accounts < sessions && sessions < delegation && delegation < skipped);
        assert!(s.contains("  <input 0>: "));
        assert!(s.contains("B (1 privileged users logged in):"));
        assert!(s.contains("High Value (1 found):"));
    }

    #[test]
    fn header_underline_ignores_color_codes() {
        let colored_title = "\u{1b}[1;32mTitle\u{1b}[0m";
        assert_eq!(visible_len(colored_title), 5);
        assert!(section_header(colored_title).contains("\n─────\n"));
    }
}
