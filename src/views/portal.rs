//! Account, entry and map pages

use super::{escape, layout, PageContext};
use crate::types::{Entry, OwnedEntry};
use axum::response::Html;
use std::fmt::Write;

fn credentials_form(action: &str, button: &str) -> String {
    format!(
        r#"<form method="post" action="{action}">
<label>Username <input type="text" name="username" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">{button}</button>
</form>"#
    )
}

pub fn register(ctx: &PageContext) -> Html<String> {
    let body = credentials_form("/register", "Register")
        + "\n<p>Already have an account? <a href=\"/login\">Log in</a></p>";
    layout("Register", ctx, &body)
}

pub fn login(ctx: &PageContext) -> Html<String> {
    let body = credentials_form("/login", "Log in")
        + "\n<p>No account yet? <a href=\"/register\">Register</a></p>";
    layout("Login", ctx, &body)
}

pub fn create_entry(ctx: &PageContext) -> Html<String> {
    layout(
        "New entry",
        ctx,
        r#"<form method="post" action="/create_entry">
<label>Title <input type="text" name="title" required></label>
<label>Description <textarea name="description" rows="5"></textarea></label>
<button type="submit">Save</button>
</form>"#,
    )
}

fn entry_item(entry: &Entry, owner: Option<&str>) -> String {
    let mut item = format!(
        "<li class=\"entry\"><h3>{}</h3><p>{}</p><small>{}",
        escape(&entry.title),
        escape(&entry.description),
        entry.created_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(owner) = owner {
        let _ = write!(item, " · {}", escape(owner));
    }
    item.push_str("</small></li>\n");
    item
}

/// Admin view of every entry with its owner
pub fn dashboard(ctx: &PageContext, entries: &[OwnedEntry]) -> Html<String> {
    let mut body = String::new();
    if entries.is_empty() {
        body.push_str("<p>No entries yet.</p>");
    } else {
        body.push_str("<ul class=\"entries\">\n");
        for owned in entries {
            body.push_str(&entry_item(&owned.entry, Some(&owned.owner)));
        }
        body.push_str("</ul>");
    }
    layout("Dashboard", ctx, &body)
}

/// The signed-in user's own entries
pub fn my_entries(ctx: &PageContext, entries: &[Entry]) -> Html<String> {
    let mut body = String::from("<p><a href=\"/create_entry\">New entry</a></p>\n");
    if entries.is_empty() {
        body.push_str("<p>You have no entries yet.</p>");
    } else {
        body.push_str("<ul class=\"entries\">\n");
        for entry in entries {
            body.push_str(&entry_item(entry, None));
        }
        body.push_str("</ul>");
    }
    layout("My entries", ctx, &body)
}

/// Page embedding a generated map file, or an inline map document
pub fn mapa(ctx: &PageContext, map_src: Option<&str>, inline_map: Option<&str>) -> Html<String> {
    let frame = match (map_src, inline_map) {
        (Some(src), _) => format!(
            "<iframe class=\"map\" src=\"{}\" width=\"100%\" height=\"500\"></iframe>",
            escape(src)
        ),
        (None, Some(html)) => format!(
            "<iframe class=\"map\" srcdoc=\"{}\" width=\"100%\" height=\"500\"></iframe>",
            escape(html)
        ),
        (None, None) => "<p>Map unavailable.</p>".to_string(),
    };
    let body = format!(
        r#"{frame}
<button id="alerta">Reportar alerta en mi ubicación</button>
<script>
document.getElementById("alerta").addEventListener("click", () => {{
  navigator.geolocation.getCurrentPosition(async (pos) => {{
    await fetch("/alerta", {{
      method: "POST",
      headers: {{ "Content-Type": "application/json" }},
      body: JSON.stringify({{ lat: pos.coords.latitude, lon: pos.coords.longitude }})
    }});
    window.location.reload();
  }});
}});
</script>"#
    );
    layout("Mapa", ctx, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(title: &str) -> Entry {
        Entry {
            id: 1,
            title: title.into(),
            description: "desc".into(),
            created_at: Utc::now(),
            user_id: 1,
        }
    }

    #[test]
    fn test_dashboard_lists_owners() {
        let entries = vec![OwnedEntry {
            entry: entry("<script>"),
            owner: "bob".into(),
        }];
        let Html(page) = dashboard(&PageContext::default(), &entries);
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("· bob"));
    }

    #[test]
    fn test_my_entries_empty() {
        let Html(page) = my_entries(&PageContext::default(), &[]);
        assert!(page.contains("You have no entries yet."));
    }

    #[test]
    fn test_mapa_prefers_generated_file() {
        let Html(page) = mapa(
            &PageContext::default(),
            Some("/static/maps/map_x.html"),
            Some("<html></html>"),
        );
        assert!(page.contains("src=\"/static/maps/map_x.html\""));
        assert!(!page.contains("srcdoc"));
    }
}
