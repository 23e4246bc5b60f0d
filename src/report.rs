//! Selection and markdown rendering of the scored report.

use std::cmp::Ordering;

use crate::upstream::{EngineTranslation, ScoredReport};

/// Shown when the report carries no candidates at all.
pub const EMPTY_REPORT_MESSAGE: &str = "Error: the upstream service returned no translations.";

const REPORT_HEADING: &str = "### Detailed Translation Report";

/// Missing scores compare as zero and therefore sort lowest.
fn score_of(translation: &EngineTranslation) -> f64 {
    translation.score.unwrap_or(0.0)
}

fn by_score_desc(a: &EngineTranslation, b: &EngineTranslation) -> Ordering {
    score_of(b)
        .partial_cmp(&score_of(a))
        .unwrap_or(Ordering::Equal)
}

/// Pick the translation presented as the answer body.
///
/// The aggregate pseudo-model takes the highest-scored candidate; a concrete
/// model name takes its engine's candidate, falling back to the best-scored
/// one when that engine is absent from the report.
pub fn select_primary<'a>(
    model: &str,
    best_model: &str,
    report: &'a ScoredReport,
) -> Option<&'a EngineTranslation> {
    let best = report
        .translations
        .iter()
        .max_by(|a, b| score_of(a).partial_cmp(&score_of(b)).unwrap_or(Ordering::Equal))?;

    if model == best_model {
        return Some(best);
    }

    Some(
        report
            .translations
            .iter()
            .find(|t| t.engine == model)
            .unwrap_or(best),
    )
}

/// Render the full markdown answer: the primary translation, then every
/// candidate sorted by score descending.
pub fn render_markdown(model: &str, best_model: &str, report: &ScoredReport) -> String {
    let Some(primary) = select_primary(model, best_model, report) else {
        return EMPTY_REPORT_MESSAGE.to_string();
    };

    let mut out = String::new();
    out.push_str(primary.text.trim());
    out.push_str("\n\n---\n\n");
    out.push_str(REPORT_HEADING);
    out.push('\n');

    let mut ranked: Vec<&EngineTranslation> = report.translations.iter().collect();
    ranked.sort_by(|a, b| by_score_desc(a, b));

    for translation in ranked {
        let score = match translation.score {
            Some(score) => format!("{score:.2}"),
            None => "N/A".to_string(),
        };
        out.push_str(&format!(
            "\n**Model: {}** (score: {})\n> {}\n",
            translation.engine,
            score,
            translation.text.trim()
        ));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation(engine: &str, text: &str, score: Option<f64>) -> EngineTranslation {
        EngineTranslation {
            engine: engine.into(),
            text: text.into(),
            score,
        }
    }

    fn report(translations: Vec<EngineTranslation>) -> ScoredReport {
        ScoredReport {
            share_id: "abc123".into(),
            translations,
        }
    }

    #[test]
    fn test_select_primary_aggregate_takes_best_score() {
        let report = report(vec![
            translation("a", "alpha", Some(0.7)),
            translation("b", "beta", Some(0.9)),
            translation("c", "gamma", None),
        ]);

        let picked = select_primary("mt-best", "mt-best", &report).unwrap();
        assert_eq!(picked.text, "beta");
    }

    #[test]
    fn test_select_primary_exact_engine_match() {
        let report = report(vec![
            translation("a", "hola", Some(0.7)),
            translation("b", "beta", Some(0.9)),
        ]);

        let picked = select_primary("a", "mt-best", &report).unwrap();
        assert_eq!(picked.text, "hola");
    }

    #[test]
    fn test_select_primary_unknown_engine_falls_back_to_best() {
        let report = report(vec![
            translation("a", "alpha", Some(0.7)),
            translation("b", "beta", Some(0.9)),
        ]);

        let picked = select_primary("c", "mt-best", &report).unwrap();
        assert_eq!(picked.text, "beta");
    }

    #[test]
    fn test_select_primary_empty_report() {
        assert!(select_primary("mt-best", "mt-best", &report(vec![])).is_none());
    }

    #[test]
    fn test_render_markdown_empty_report_yields_fixed_message() {
        let rendered = render_markdown("mt-best", "mt-best", &report(vec![]));
        assert_eq!(rendered, EMPTY_REPORT_MESSAGE);
    }

    #[test]
    fn test_render_markdown_orders_by_score_with_na_last() {
        let report = report(vec![
            translation("c", "gamma", None),
            translation("a", " alpha ", Some(0.7)),
            translation("b", "beta", Some(0.9)),
        ]);

        let rendered = render_markdown("mt-best", "mt-best", &report);

        assert!(rendered.starts_with("beta\n\n---\n\n### Detailed Translation Report\n"));
        let b = rendered.find("**Model: b** (score: 0.90)").unwrap();
        let a = rendered.find("**Model: a** (score: 0.70)").unwrap();
        let c = rendered.find("**Model: c** (score: N/A)").unwrap();
        assert!(b < a && a < c);
        assert!(rendered.contains("> alpha\n"), "candidate text is trimmed");
    }

    #[test]
    fn test_render_markdown_trims_primary() {
        let report = report(vec![translation("a", "  hello world \n", Some(0.5))]);
        let rendered = render_markdown("a", "mt-best", &report);
        assert!(rendered.starts_with("hello world\n\n---"));
    }
}
