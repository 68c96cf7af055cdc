use std::collections::BTreeMap;

use crate::{
    animation::param::{ScalarParam, VectorParam},
    foundation::error::{SuiteError, SuiteResult},
    scene::SceneSource,
};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(String),
}

#[derive(Clone, Debug)]
enum Binding {
    Scalar(ScalarParam),
    Vector(VectorParam),
}

/// Scene text with `{{name}}` placeholders filled from bound parameters at snapshot time.
///
/// Scalars print with `f64`'s `Display`; vectors print as `< a, b, c >`.
#[derive(Clone, Debug)]
pub struct SceneTemplate {
    segments: Vec<Segment>,
    bindings: BTreeMap<String, Binding>,
}

impl SceneTemplate {
    pub fn parse(text: &str) -> SuiteResult<Self> {
        let mut segments = Vec::new();
        let mut rest = text;
        while let Some(open) = rest.find(OPEN) {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_owned()));
            }
            let after = &rest[open + OPEN.len()..];
            let close = after.find(CLOSE).ok_or_else(|| {
                SuiteError::configuration(format!(
                    "unterminated placeholder at byte {}",
                    text.len() - rest.len() + open
                ))
            })?;
            let name = after[..close].trim();
            if !is_placeholder_name(name) {
                return Err(SuiteError::configuration(format!(
                    "invalid placeholder name '{name}'"
                )));
            }
            segments.push(Segment::Slot(name.to_owned()));
            rest = &after[close + CLOSE.len()..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_owned()));
        }
        Ok(Self {
            segments,
            bindings: BTreeMap::new(),
        })
    }

    /// Placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for seg in &self.segments {
            if let Segment::Slot(name) = seg
                && !seen.contains(&name.as_str())
            {
                seen.push(name.as_str());
            }
        }
        seen
    }

    /// Placeholders with no parameter bound yet.
    pub fn unbound(&self) -> Vec<&str> {
        self.placeholders()
            .into_iter()
            .filter(|name| !self.bindings.contains_key(*name))
            .collect()
    }

    pub fn bind_scalar(&mut self, name: impl Into<String>, param: &ScalarParam) -> &mut Self {
        self.bindings
            .insert(name.into(), Binding::Scalar(param.clone()));
        self
    }

    pub fn bind_vector(&mut self, name: impl Into<String>, param: &VectorParam) -> &mut Self {
        self.bindings
            .insert(name.into(), Binding::Vector(param.clone()));
        self
    }

    /// Fill every placeholder with the current parameter values.
    pub fn render(&self) -> SuiteResult<String> {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::Text(t) => out.push_str(t),
                Segment::Slot(name) => match self.bindings.get(name) {
                    Some(Binding::Scalar(p)) => out.push_str(&p.to_string()),
                    Some(Binding::Vector(p)) => out.push_str(&p.to_string()),
                    None => {
                        return Err(SuiteError::configuration(format!(
                            "scene placeholder '{{{{{name}}}}}' has no bound parameter"
                        )));
                    }
                },
            }
        }
        Ok(out)
    }
}

impl SceneSource for SceneTemplate {
    fn scene_text(&self) -> SuiteResult<String> {
        self.render()
    }
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
}
