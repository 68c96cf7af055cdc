use crate::{
    animation::{
        ease::Ease,
        param::{Param, ScalarParam, VectorParam},
        value::{Lerp, Vector},
    },
    foundation::error::{SuiteError, SuiteResult},
};

/// Start/end values of an action.
#[derive(Clone, Debug, PartialEq)]
pub enum Endpoints<T> {
    /// Animate from the parameter's value at authoring time to the given target.
    To(T),
    /// Animate between two explicit values, ignoring the parameter's current value.
    Between(T, T),
}

impl From<f64> for Endpoints<f64> {
    fn from(to: f64) -> Self {
        Self::To(to)
    }
}

impl From<Vector> for Endpoints<Vector> {
    fn from(to: Vector) -> Self {
        Self::To(to)
    }
}

impl<T> From<(T, T)> for Endpoints<T> {
    fn from((from, to): (T, T)) -> Self {
        Self::Between(from, to)
    }
}

/// One interpolation rule bound to a parameter. Immutable once authored.
#[derive(Debug)]
pub struct Action<T> {
    param: Param<T>,
    from: T,
    to: T,
    ease: Ease,
    scale: f64,
}

impl<T> Action<T>
where
    T: Lerp + Clone,
{
    fn author(
        param: &Param<T>,
        endpoints: Endpoints<T>,
        ease: Ease,
        scale: f64,
    ) -> SuiteResult<Self> {
        if !scale.is_finite() {
            return Err(SuiteError::configuration("action scale must be finite"));
        }
        let (from, to) = match endpoints {
            Endpoints::To(to) => (param.snapshot(), to),
            Endpoints::Between(from, to) => (from, to),
        };
        let arity = param.with(T::arity);
        if from.arity() != arity || to.arity() != arity {
            return Err(SuiteError::configuration(format!(
                "action endpoints have {} and {} components, parameter has {arity}",
                from.arity(),
                to.arity()
            )));
        }
        Ok(Self {
            param: param.clone(),
            from,
            to,
            ease,
            scale,
        })
    }

    pub fn param(&self) -> &Param<T> {
        &self.param
    }

    pub fn start(&self) -> &T {
        &self.from
    }

    pub fn end(&self) -> &T {
        &self.to
    }

    pub fn ease(&self) -> Ease {
        self.ease
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Interpolated value at normalized time `t`.
    pub fn value_at(&self, t: f64) -> T {
        T::lerp(&self.from, &self.to, self.ease.apply(t), self.scale)
    }

    fn apply(&self, t: f64) {
        self.param.write(self.value_at(t));
    }
}

#[derive(Debug)]
enum AnyAction {
    Scalar(Action<f64>),
    Vector(Action<Vector>),
}

impl AnyAction {
    fn apply(&self, t: f64) {
        match self {
            Self::Scalar(a) => a.apply(t),
            Self::Vector(a) => a.apply(t),
        }
    }
}

/// An episode: ordered actions evaluated over normalized time `[0, 1]`.
#[derive(Debug)]
pub struct Timeline {
    duration: f64,
    actions: Vec<AnyAction>,
}

impl Timeline {
    /// `duration` is in seconds; zero is allowed and yields a single frame.
    pub fn new(duration: f64) -> SuiteResult<Self> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(SuiteError::configuration(format!(
                "timeline duration must be a finite number of seconds >= 0, got {duration}"
            )));
        }
        Ok(Self {
            duration,
            actions: Vec::new(),
        })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn add_vector_action(
        &mut self,
        param: &VectorParam,
        endpoints: impl Into<Endpoints<Vector>>,
        ease: Ease,
        scale: f64,
    ) -> SuiteResult<&mut Self> {
        let action = Action::author(param, endpoints.into(), ease, scale)?;
        self.actions.push(AnyAction::Vector(action));
        Ok(self)
    }

    pub fn add_scalar_action(
        &mut self,
        param: &ScalarParam,
        endpoints: impl Into<Endpoints<f64>>,
        ease: Ease,
        scale: f64,
    ) -> SuiteResult<&mut Self> {
        let action = Action::author(param, endpoints.into(), ease, scale)?;
        self.actions.push(AnyAction::Scalar(action));
        Ok(self)
    }

    /// Linear, unscaled vector change.
    pub fn change_vector(
        &mut self,
        param: &VectorParam,
        endpoints: impl Into<Endpoints<Vector>>,
    ) -> SuiteResult<&mut Self> {
        self.add_vector_action(param, endpoints, Ease::Linear, 1.0)
    }

    /// Linear, unscaled scalar change.
    pub fn change_value(
        &mut self,
        param: &ScalarParam,
        endpoints: impl Into<Endpoints<f64>>,
    ) -> SuiteResult<&mut Self> {
        self.add_scalar_action(param, endpoints, Ease::Linear, 1.0)
    }

    /// Write every action's value at `t` into its parameter, in insertion order.
    ///
    /// Actions sharing a parameter do not blend: the last one wins.
    pub fn evaluate(&self, t: f64) {
        for action in &self.actions {
            action.apply(t);
        }
    }
}
