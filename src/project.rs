//! JSON project files: render defaults, named parameters, episodes, and a scene template.
//!
//! ```json
//! {
//!   "config": { "fps": { "num": 10, "den": 1 }, "out_dir": "frames", "width": 320 },
//!   "params": { "radius": 1.0, "rot": [0, 0, 0] },
//!   "episodes": [
//!     { "duration": 2.0, "actions": [ { "param": "rot", "to": [0, 360, 0] } ] }
//!   ],
//!   "scene": { "file": "scene.pov" }
//! }
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;

use crate::{
    animation::{
        ease::Ease,
        param::{ScalarParam, VectorParam},
        sequencer::Sequencer,
        timeline::{Endpoints, Timeline},
        value::Vector,
    },
    foundation::error::{SuiteError, SuiteResult},
    render::{Renderer, options::RenderConfig},
    scene::SceneTemplate,
    suite::Suite,
};

/// A parameter value as written in JSON: a number or a list of numbers.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl ParamValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Vector(_) => "vector",
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionSpec {
    pub param: String,
    pub to: ParamValue,
    /// Explicit start; when absent the action starts from the parameter's value at the moment
    /// the episode is built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ParamValue>,
    #[serde(default)]
    pub ease: Ease,
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

fn unit_scale() -> f64 {
    1.0
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EpisodeSpec {
    pub duration: f64,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneSpec {
    /// Template file, relative to the project file's directory.
    File(PathBuf),
    Inline(String),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    #[serde(default)]
    pub config: RenderConfig,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    pub episodes: Vec<EpisodeSpec>,
    pub scene: SceneSpec,
}

/// A live parameter created from a project.
#[derive(Clone, Debug)]
pub enum BoundParam {
    Scalar(ScalarParam),
    Vector(VectorParam),
}

/// A project turned into runnable parts. Not `Send`: it owns live parameters.
#[derive(Debug)]
pub struct BuiltProject {
    pub config: RenderConfig,
    pub sequencer: Sequencer,
    pub scene: SceneTemplate,
    pub params: BTreeMap<String, BoundParam>,
}

impl BuiltProject {
    /// Wire the parts to `renderer`; the scene template is returned beside the suite.
    pub fn into_suite(self, renderer: Arc<dyn Renderer>) -> SuiteResult<(Suite, SceneTemplate)> {
        let suite = Suite::from_parts(self.config, self.sequencer, renderer)?;
        Ok((suite, self.scene))
    }
}

impl Project {
    pub fn from_json(text: &str) -> SuiteResult<Self> {
        serde_json::from_str(text).map_err(|e| SuiteError::serde(e.to_string()))
    }

    pub fn load(path: &Path) -> SuiteResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read project '{}'", path.display()))?;
        Self::from_json(&text)
    }

    pub fn to_json_pretty(&self) -> SuiteResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| SuiteError::serde(e.to_string()))
    }

    /// Check everything that can be checked without reading the scene file.
    pub fn validate(&self) -> SuiteResult<()> {
        self.config.validate()?;
        if self.episodes.is_empty() {
            return Err(SuiteError::configuration("project has no episodes"));
        }

        for (name, value) in &self.params {
            if let ParamValue::Vector(v) = value
                && v.is_empty()
            {
                return Err(SuiteError::configuration(format!(
                    "vector parameter '{name}' has no components"
                )));
            }
        }

        for (i, ep) in self.episodes.iter().enumerate() {
            if !ep.duration.is_finite() || ep.duration < 0.0 {
                return Err(SuiteError::configuration(format!(
                    "episode {i} has invalid duration {}",
                    ep.duration
                )));
            }
            for action in &ep.actions {
                let Some(initial) = self.params.get(&action.param) else {
                    return Err(SuiteError::configuration(format!(
                        "episode {i} animates unknown parameter '{}'",
                        action.param
                    )));
                };
                for end in std::iter::once(&action.to).chain(action.from.as_ref()) {
                    check_same_shape(&action.param, initial, end)?;
                }
                if !action.scale.is_finite() {
                    return Err(SuiteError::configuration(format!(
                        "action on '{}' has non-finite scale",
                        action.param
                    )));
                }
            }
        }
        Ok(())
    }

    /// Create the parameters, author every episode, and bind the scene template.
    ///
    /// A `scene.file` path is resolved against `base_dir`. Every placeholder in the template must
    /// name a parameter.
    pub fn build(&self, base_dir: &Path) -> SuiteResult<BuiltProject> {
        self.validate()?;

        let mut params = BTreeMap::new();
        for (name, value) in &self.params {
            let bound = match value {
                ParamValue::Scalar(v) => BoundParam::Scalar(ScalarParam::new(*v)),
                ParamValue::Vector(v) => BoundParam::Vector(VectorParam::new(vector(v)?)),
            };
            params.insert(name.clone(), bound);
        }

        let mut sequencer = Sequencer::new(self.config.fps);
        for ep in &self.episodes {
            let timeline = sequencer.make_episode(ep.duration)?;
            for action in &ep.actions {
                author(timeline, &params, action)?;
            }
        }

        let text = match &self.scene {
            SceneSpec::Inline(text) => text.clone(),
            SceneSpec::File(path) => {
                let path = base_dir.join(path);
                std::fs::read_to_string(&path)
                    .with_context(|| format!("read scene template '{}'", path.display()))?
            }
        };
        let mut scene = SceneTemplate::parse(&text)?;
        for (name, param) in &params {
            match param {
                BoundParam::Scalar(p) => scene.bind_scalar(name.as_str(), p),
                BoundParam::Vector(p) => scene.bind_vector(name.as_str(), p),
            };
        }
        if let Some(name) = scene.unbound().first() {
            return Err(SuiteError::configuration(format!(
                "scene placeholder '{name}' does not name a parameter"
            )));
        }

        Ok(BuiltProject {
            config: self.config.clone(),
            sequencer,
            scene,
            params,
        })
    }
}

fn check_same_shape(name: &str, param: &ParamValue, end: &ParamValue) -> SuiteResult<()> {
    match (param, end) {
        (ParamValue::Scalar(_), ParamValue::Scalar(_)) => Ok(()),
        (ParamValue::Vector(a), ParamValue::Vector(b)) if a.len() == b.len() => Ok(()),
        (ParamValue::Vector(a), ParamValue::Vector(b)) => Err(SuiteError::configuration(format!(
            "action on '{name}' has {} components, parameter has {}",
            b.len(),
            a.len()
        ))),
        _ => Err(SuiteError::configuration(format!(
            "action on {} parameter '{name}' gives a {} value",
            param.kind(),
            end.kind()
        ))),
    }
}

fn vector(values: &[f64]) -> SuiteResult<Vector> {
    Vector::new(values.to_vec())
}

fn author(
    timeline: &mut Timeline,
    params: &BTreeMap<String, BoundParam>,
    action: &ActionSpec,
) -> SuiteResult<()> {
    let param = params.get(&action.param).ok_or_else(|| {
        SuiteError::configuration(format!("unknown parameter '{}'", action.param))
    })?;
    let (ease, scale) = (action.ease, action.scale);
    match (param, &action.to, &action.from) {
        (BoundParam::Scalar(p), ParamValue::Scalar(to), None) => {
            timeline.add_scalar_action(p, *to, ease, scale)?;
        }
        (BoundParam::Scalar(p), ParamValue::Scalar(to), Some(ParamValue::Scalar(from))) => {
            timeline.add_scalar_action(p, (*from, *to), ease, scale)?;
        }
        (BoundParam::Vector(p), ParamValue::Vector(to), None) => {
            timeline.add_vector_action(p, vector(to)?, ease, scale)?;
        }
        (BoundParam::Vector(p), ParamValue::Vector(to), Some(ParamValue::Vector(from))) => {
            let ends = Endpoints::Between(vector(from)?, vector(to)?);
            timeline.add_vector_action(p, ends, ease, scale)?;
        }
        _ => {
            return Err(SuiteError::configuration(format!(
                "action endpoints do not match parameter '{}'",
                action.param
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{foundation::core::FrameTick, scene::SceneSource};

    const SPINNING_BALL: &str = r#"{
        "config": { "fps": { "num": 10, "den": 1 }, "out_dir": "frames", "Display_Gamma": 2.2 },
        "params": { "r": 1.0, "rot": [0, 0, 0] },
        "episodes": [
            { "duration": 1.0, "actions": [ { "param": "rot", "to": [0, 90, 0] } ] },
            { "duration": 0.5, "actions": [
                { "param": "r", "from": 1.0, "to": 3.0, "ease": "tanhyp", "scale": 1.0 }
            ] }
        ],
        "scene": { "inline": "sphere { 0, {{r}} rotate {{rot}} }" }
    }"#;

    #[test]
    fn parses_and_builds() {
        let project = Project::from_json(SPINNING_BALL).unwrap();
        assert_eq!(project.params["rot"], ParamValue::Vector(vec![0.0, 0.0, 0.0]));
        assert!(project.config.extra.contains_key("Display_Gamma"));

        let mut built = project.build(Path::new(".")).unwrap();
        assert_eq!(built.sequencer.frame_count(), 11 + 6);

        let t = built.sequencer.advance_to(FrameTick::new(0, 10)).unwrap();
        assert_eq!(t, 1.0);
        assert_eq!(
            built.scene.scene_text().unwrap(),
            "sphere { 0, 1 rotate < 0, 90, 0 > }"
        );
        let ticks: Vec<_> = built.sequencer.play().collect();
        assert_eq!(ticks.len(), 17);
    }

    #[test]
    fn unknown_parameter_is_rejected() {
        let mut project = Project::from_json(SPINNING_BALL).unwrap();
        project.episodes[0].actions[0].param = "nope".to_owned();
        assert!(project.validate().unwrap_err().is_configuration());
    }

    #[test]
    fn shape_mismatches_are_rejected() {
        let mut project = Project::from_json(SPINNING_BALL).unwrap();
        project.episodes[0].actions[0].to = ParamValue::Vector(vec![1.0, 2.0]);
        assert!(project.validate().is_err());

        let mut project = Project::from_json(SPINNING_BALL).unwrap();
        project.episodes[0].actions[0].to = ParamValue::Scalar(1.0);
        assert!(project.validate().is_err());
    }

    #[test]
    fn unbound_scene_placeholder_fails_build() {
        let mut project = Project::from_json(SPINNING_BALL).unwrap();
        project.scene = SceneSpec::Inline("{{r}} {{colour}}".to_owned());
        let err = project.build(Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn scene_file_is_read_relative_to_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ball.pov"), "radius {{r}}").unwrap();
        let mut project = Project::from_json(SPINNING_BALL).unwrap();
        project.scene = SceneSpec::File("ball.pov".into());
        let built = project.build(dir.path()).unwrap();
        assert_eq!(built.scene.render().unwrap(), "radius 1");

        let missing = project.build(&dir.path().join("elsewhere")).unwrap_err();
        assert!(matches!(missing, SuiteError::Other(_)));
    }

    #[test]
    fn malformed_json_is_a_serde_error() {
        assert!(matches!(
            Project::from_json("{ \"episodes\": 3 }"),
            Err(SuiteError::Serde(_))
        ));
    }
}
