//! ABOUTME: Pure, stateless template evaluator backed by Tera
//! ABOUTME: Renders flow step inputs, outputs, and skip conditions against a data record

mod helpers;

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template parse error: {0}")]
    Parse(String),
    #[error("template execution error: {0}")]
    Execution(String),
}

/// A pure, reentrant evaluator: `eval(template, data) -> Result<String, TemplateError>`.
///
/// Built on a Jinja-style engine (Tera) so `{{ var }}` interpolation, `{% if %}`/`{% for %}`
/// blocks, and `{{ value | filter }}` pipelines are all available, plus a small
/// Sprig-flavored filter library registered in [`helpers`].
#[derive(Clone)]
pub struct TemplateEvaluator {
    engine: tera::Tera,
    counter: std::sync::Arc<AtomicU64>,
}

impl Default for TemplateEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEvaluator {
    pub fn new() -> Self {
        let mut engine = tera::Tera::default();
        helpers::register(&mut engine);
        Self {
            engine,
            counter: std::sync::Arc::new(AtomicU64::new(0)),
        }
    }

    /// Render `template` against `data`. Stateless and reentrant: each call
    /// registers the template under a fresh throwaway name on a cheap clone
    /// of the engine so concurrent calls never race on shared template state.
    pub fn eval<T: Serialize>(&self, template: &str, data: &T) -> Result<String, TemplateError> {
        let context = tera::Context::from_serialize(data)
            .map_err(|e| TemplateError::Execution(e.to_string()))?;
        self.eval_with_context(template, &context)
    }

    pub fn eval_with_context(
        &self,
        template: &str,
        context: &tera::Context,
    ) -> Result<String, TemplateError> {
        let id = self.counter.fetch_add(1, Ordering::Relaxed);
        let name = format!("__teamforge_inline_{id}");
        let mut engine = self.engine.clone();
        engine
            .add_raw_template(&name, template)
            .map_err(|e| TemplateError::Parse(e.to_string()))?;
        engine
            .render(&name, context)
            .map_err(|e| TemplateError::Execution(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn interpolation() {
        let eval = TemplateEvaluator::new();
        let out = eval.eval("hello {{ name }}", &json!({"name": "world"})).unwrap();
        assert_eq!(out, "hello world");
    }

    #[test]
    fn conditional_and_pipeline() {
        let eval = TemplateEvaluator::new();
        let out = eval
            .eval(
                "{% if ok %}{{ name | upper }}{% else %}no{% endif %}",
                &json!({"ok": true, "name": "alice"}),
            )
            .unwrap();
        assert_eq!(out, "ALICE");
    }

    #[test]
    fn sprig_default_filter() {
        let eval = TemplateEvaluator::new();
        let out = eval
            .eval("{{ name | default(value=\"anon\") }}", &json!({}))
            .unwrap();
        assert_eq!(out, "anon");
    }

    #[test]
    fn sprig_math_filters() {
        let eval = TemplateEvaluator::new();
        let out = eval.eval("{{ n | add(n=5) }}", &json!({"n": 1})).unwrap();
        assert_eq!(out, "6");
    }

    #[test]
    fn skip_when_true_literal() {
        let eval = TemplateEvaluator::new();
        let out = eval.eval("{{ a == b }}", &json!({"a": 1, "b": 1})).unwrap();
        assert_eq!(out.trim(), "true");
    }

    #[test]
    fn parse_error_surfaces() {
        let eval = TemplateEvaluator::new();
        let err = eval.eval("{{ unterminated", &json!({})).unwrap_err();
        assert!(matches!(err, TemplateError::Parse(_)));
    }

    #[test]
    fn reentrant_concurrent_calls_do_not_collide() {
        let eval = TemplateEvaluator::new();
        let a = eval.eval("{{ x }}", &json!({"x": 1})).unwrap();
        let b = eval.eval("{{ x }}", &json!({"x": 2})).unwrap();
        assert_eq!(a, "1");
        assert_eq!(b, "2");
    }
}
