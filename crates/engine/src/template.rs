//! Issue-body template rendering.
//!
//! Deliberately minimal: the message template supports exactly three
//! placeholders — `{{ org }}`, `{{ repo }}`, and `{{ user }}` — with
//! whitespace inside the braces tolerated. Unknown placeholders are left
//! verbatim so a typo is visible in the rendered issue rather than silently
//! swallowed.

use policy::{Login, OrgName, RepoName};

/// Renders a message template for one user.
pub fn render_message(template: &str, org: &OrgName, repo: &RepoName, user: &Login) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        match after_open.find("}}") {
            Some(end) => {
                let key = after_open[..end].trim();
                match key {
                    "org" => out.push_str(org.as_str()),
                    "repo" => out.push_str(repo.as_str()),
                    "user" => out.push_str(user.as_str()),
                    _ => {
                        // Unknown placeholder: emit it unchanged.
                        out.push_str(&rest[start..start + 2 + end + 2]);
                    }
                }
                rest = &after_open[end + 2..];
            }
            None => {
                // Unterminated braces: emit the remainder as-is.
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
