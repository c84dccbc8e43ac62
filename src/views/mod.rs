//! HTML rendering.
//!
//! Pages are assembled from small string builders around one shared layout.
//! Every value that originates from a request or the database goes through
//! [`escape`].

pub mod portal;
pub mod predict;

use crate::auth::{Flash, SessionUser};
use axum::response::Html;
use std::fmt::Write;

/// Site name shown in the header
pub const SITE_NAME: &str = "Machine_Learning";

/// Per-request data every page needs
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub user: Option<SessionUser>,
    pub flashes: Vec<Flash>,
}

/// Escape text for HTML element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn nav(ctx: &PageContext) -> String {
    let mut nav = String::from(
        r#"<nav>
<a href="/">Inicio</a>
<a href="/conceptos_basicos">Conceptos básicos</a>
<a href="/casos_de_uso_ML">Casos de uso</a>
<a href="/prediccion">Regresión lineal</a>
<a href="/Cursos">Aprobación de cursos</a>
<a href="/KNN">Recomendador KNN</a>
<a href="/mapa">Mapa</a>
"#,
    );
    match &ctx.user {
        Some(user) => {
            if user.is_admin {
                nav.push_str("<a href=\"/dashboard\">Dashboard</a>\n");
            } else {
                nav.push_str("<a href=\"/my_entries\">My entries</a>\n");
            }
            let _ = write!(
                nav,
                "<a href=\"/create_entry\">New entry</a>\n<span class=\"user\">{}</span>\n<a href=\"/logout\">Logout</a>\n",
                escape(&user.username)
            );
        }
        None => nav.push_str("<a href=\"/login\">Login</a>\n<a href=\"/register\">Register</a>\n"),
    }
    nav.push_str("</nav>\n");
    nav
}

fn flashes(ctx: &PageContext) -> String {
    let mut out = String::new();
    for flash in &ctx.flashes {
        let _ = writeln!(
            out,
            "<div class=\"flash flash-{}\">{}</div>",
            flash.kind.as_str(),
            escape(&flash.message)
        );
    }
    out
}

/// Wrap `body` in the shared page chrome
pub fn layout(title: &str, ctx: &PageContext, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>{title} | {site}</title>
</head>
<body>
<header><h1>{site}</h1></header>
{nav}{flashes}<main>
<h2>{title}</h2>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
        site = SITE_NAME,
        nav = nav(ctx),
        flashes = flashes(ctx),
        body = body
    ))
}

/// Home page
pub fn index(ctx: &PageContext) -> Html<String> {
    layout(
        "Inicio",
        ctx,
        &format!(
            "<p>Bienvenido a {}: modelos de regresión, clasificación y vecinos cercanos.</p>",
            SITE_NAME
        ),
    )
}

/// Static page: basic machine learning concepts
pub fn conceptos_basicos(ctx: &PageContext) -> Html<String> {
    layout(
        "Conceptos básicos",
        ctx,
        r#"<dl>
<dt>Regresión lineal</dt><dd>Predice un valor numérico como combinación lineal de las variables de entrada.</dd>
<dt>Clasificación</dt><dd>Asigna una de varias clases a una observación.</dd>
<dt>K vecinos más cercanos</dt><dd>Clasifica según la clase mayoritaria de los ejemplos más parecidos.</dd>
<dt>Escalado</dt><dd>Normaliza cada variable con la media y la desviación del entrenamiento.</dd>
</dl>"#,
    )
}

/// Static page: machine learning use cases
pub fn casos_de_uso_ml(ctx: &PageContext) -> Html<String> {
    layout(
        "Casos de uso de ML",
        ctx,
        r#"<ul>
<li>Predicción del precio del café según lluvia y temperatura.</li>
<li>Predicción de aprobación de un curso según dedicación y nivel educativo.</li>
<li>Recomendación de categorías de productos según el perfil del cliente.</li>
</ul>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::FlashKind;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<a href="x">&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_layout_shows_flashes_and_user() {
        let ctx = PageContext {
            user: Some(SessionUser {
                id: 1,
                username: "<ana>".into(),
                is_admin: false,
            }),
            flashes: vec![Flash {
                kind: FlashKind::Error,
                message: "Access denied".into(),
            }],
        };
        let Html(page) = index(&ctx);
        assert!(page.contains("flash-error\">Access denied"));
        assert!(page.contains("&lt;ana&gt;"));
        assert!(page.contains("/my_entries"));
        assert!(!page.contains("/dashboard"));
    }

    #[test]
    fn test_anonymous_nav() {
        let Html(page) = index(&PageContext::default());
        assert!(page.contains("/login"));
        assert!(page.contains(SITE_NAME));
    }
}
