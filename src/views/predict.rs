//! Prediction form pages

use super::{escape, layout, PageContext};
use crate::models::EvaluationReport;
use axum::response::Html;
use std::fmt::Write;

const PRICE_FORM: &str = r#"<form method="post" action="/prediccion">
<label>Lluvia (mm) <input type="number" step="any" name="rainfall" required></label>
<label>Temperatura (°C) <input type="number" step="any" name="temperature" required></label>
<button type="submit">Predecir</button>
</form>"#;

const COURSE_FORM: &str = r#"<form method="post" action="/Cursos">
<label>Horas de estudio <input type="number" step="any" name="horas" required></label>
<label>Participaciones en foros <input type="number" step="1" name="foros" required></label>
<label>Nivel educativo
<select name="nivel">
<option value="Secundaria">Secundaria</option>
<option value="Tecnico">Técnico</option>
<option value="Universitario">Universitario</option>
</select></label>
<button type="submit">Predecir</button>
</form>"#;

const KNN_FORM: &str = r#"<form method="post" action="/KNN">
<label>Edad <input type="number" step="1" name="edad" required></label>
<label>Género
<select name="genero">
<option value="F">F</option>
<option value="M">M</option>
</select></label>
<label>Historial de compras <input type="number" step="1" name="historial" required></label>
<label>Tiempo en el sitio (min) <input type="number" step="any" name="tiempo" required></label>
<label>Categorías visitadas <input type="number" step="1" name="categorias" required></label>
<button type="submit">Recomendar</button>
</form>"#;

/// `/prediccion`: coffee price form and optional result
pub fn price_page(ctx: &PageContext, result: Option<f64>) -> Html<String> {
    let mut body = String::from(PRICE_FORM);
    if let Some(price) = result {
        let _ = write!(
            body,
            "\n<p class=\"result\">Precio estimado del café: <strong>{:.2}</strong></p>",
            price
        );
    }
    layout("Predicción del precio del café", ctx, &body)
}

/// `/Cursos`: approval form, optional verdict and the static metrics
pub fn course_page(
    ctx: &PageContext,
    result: Option<&str>,
    evaluation: Option<&EvaluationReport>,
) -> Html<String> {
    let mut body = String::from(COURSE_FORM);
    if let Some(verdict) = result {
        let _ = write!(
            body,
            "\n<p class=\"result\">¿Aprobará el curso? <strong>{}</strong></p>",
            escape(verdict)
        );
    }
    if let Some(report) = evaluation {
        let _ = write!(
            body,
            "\n<section class=\"metrics\">\n<p>Exactitud del modelo: <strong>{:.2}%</strong></p>\n{}\n{}\n</section>",
            report.accuracy * 100.0,
            classification_report(report),
            confusion_matrix_svg(report)
        );
    }
    layout("Predicción de aprobación", ctx, &body)
}

/// `/KNN`: recommender form with either a category or an error
pub fn knn_page(ctx: &PageContext, categoria: Option<&str>, error: Option<&str>) -> Html<String> {
    let mut body = String::from(KNN_FORM);
    if let Some(category) = categoria {
        let _ = write!(
            body,
            "\n<p class=\"result\">Categoría recomendada: <strong>{}</strong></p>",
            escape(category)
        );
    }
    if let Some(message) = error {
        let _ = write!(
            body,
            "\n<p class=\"error\">Error: {}</p>",
            escape(message)
        );
    }
    layout("Recomendación de categorías", ctx, &body)
}

/// Precision/recall/F1 table in the layout of a classification report
pub fn classification_report(report: &EvaluationReport) -> String {
    let mut table = String::from(
        "<table class=\"report\">\n<tr><th></th><th>precision</th><th>recall</th><th>f1-score</th><th>support</th></tr>\n",
    );
    for row in report
        .per_class
        .iter()
        .chain([&report.macro_avg, &report.weighted_avg])
    {
        let _ = writeln!(
            table,
            "<tr><th>{}</th><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td></tr>",
            escape(&row.label),
            row.precision,
            row.recall,
            row.f1,
            row.support
        );
    }
    table.push_str("</table>");
    table
}

/// Confusion matrix drawn as an inline SVG heat map
pub fn confusion_matrix_svg(report: &EvaluationReport) -> String {
    const CELL: usize = 60;
    const MARGIN: usize = 40;

    let n = report.classes.len();
    let size = MARGIN + n * CELL;
    let max = report
        .confusion
        .iter()
        .flatten()
        .copied()
        .max()
        .unwrap_or(0)
        .max(1);

    let mut svg = format!(
        "<svg class=\"confusion-matrix\" xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {size} {size}\">\n"
    );
    for (i, class) in report.classes.iter().enumerate() {
        let offset = MARGIN + i * CELL + CELL / 2;
        let _ = writeln!(
            svg,
            "<text x=\"{offset}\" y=\"{y}\" text-anchor=\"middle\">{class}</text>\
             <text x=\"{x}\" y=\"{offset}\" text-anchor=\"middle\">{class}</text>",
            y = MARGIN / 2,
            x = MARGIN / 2
        );
    }
    for (i, row) in report.confusion.iter().enumerate() {
        for (j, &count) in row.iter().enumerate() {
            let x = MARGIN + j * CELL;
            let y = MARGIN + i * CELL;
            // Darker blue for larger counts.
            let shade = 255 - (count * 200 / max) as u8;
            let text_color = if shade < 128 { "white" } else { "black" };
            let _ = writeln!(
                svg,
                "<rect x=\"{x}\" y=\"{y}\" width=\"{CELL}\" height=\"{CELL}\" fill=\"rgb({shade},{shade},255)\" stroke=\"gray\"/>\
                 <text x=\"{tx}\" y=\"{ty}\" text-anchor=\"middle\" fill=\"{text_color}\">{count}</text>",
                tx = x + CELL / 2,
                ty = y + CELL / 2 + 5
            );
        }
    }
    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_page_formats_result() {
        let Html(page) = price_page(&PageContext::default(), Some(123.456));
        assert!(page.contains("<strong>123.46</strong>"));

        let Html(empty) = price_page(&PageContext::default(), None);
        assert!(!empty.contains("class=\"result\""));
    }

    #[test]
    fn test_course_page_shows_metrics() {
        let report = EvaluationReport::from_predictions(&[0, 1, 1], &[0, 1, 0]);
        let Html(page) = course_page(&PageContext::default(), Some("Sí"), Some(&report));
        assert!(page.contains("<strong>Sí</strong>"));
        assert!(page.contains("66.67%"));
        assert!(page.contains("weighted avg"));
        assert!(page.contains("<svg class=\"confusion-matrix\""));
    }

    #[test]
    fn test_knn_page_escapes_error() {
        let Html(page) = knn_page(&PageContext::default(), None, Some("<bad>"));
        assert!(page.contains("Error: &lt;bad&gt;"));
    }

    #[test]
    fn test_confusion_svg_cells() {
        let report = EvaluationReport::from_predictions(&[0, 0, 1], &[0, 1, 1]);
        let svg = confusion_matrix_svg(&report);
        assert_eq!(svg.matches("<rect").count(), 4);
    }
}
