//! Template parameters and their canonical, hashable form.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use arcstr::ArcStr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Descriptions of the parameters a template accepts, in declaration order.
pub type ParamsInfo = IndexMap<ArcStr, ArcStr>;

/// A single parameter value.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// No value.
    #[default]
    None,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(ArcStr),
    /// An ordered sequence.
    List(Vec<ParamValue>),
    /// A string-keyed mapping; identity does not depend on insertion order.
    Map(IndexMap<ArcStr, ParamValue>),
    /// An opaque object.
    ///
    /// Objects can be passed to a drawing callback but cannot be part of a
    /// template's identity, so templates receiving one fail to build.
    #[serde(skip)]
    Object(Arc<dyn Any + Send + Sync>),
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for ParamValue {
            fn from(value: $t) -> Self {
                ParamValue::Int(value as i64)
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.into())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value.into())
    }
}

impl From<ArcStr> for ParamValue {
    fn from(value: ArcStr) -> Self {
        ParamValue::Str(value)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(value: Vec<T>) -> Self {
        ParamValue::List(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::None)
    }
}

impl From<Params> for ParamValue {
    fn from(value: Params) -> Self {
        ParamValue::Map(value.0)
    }
}

/// A named set of parameter values.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(IndexMap<ArcStr, ParamValue>);

impl Params {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `self` with `name` set to `value`.
    ///
    /// # Example
    ///
    /// ```
    /// # use laygen::params::Params;
    /// let params = Params::new().with("nf", 4).with("name", "inv");
    /// assert_eq!(params.get_int("nf").unwrap(), 4);
    /// ```
    pub fn with(mut self, name: impl Into<ArcStr>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets `name` to `value`, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<ArcStr>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.0.insert(name.into(), value.into())
    }

    /// Returns the raw value of `name`.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Returns `true` if `name` is set.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterates over all parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &ParamValue)> {
        self.0.iter()
    }

    /// The number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, name: &str) -> Result<&ParamValue> {
        self.0.get(name).ok_or_else(|| Error::MissingParameter {
            name: name.into(),
            description: ArcStr::default(),
        })
    }

    fn mismatch(name: &str, expected: &'static str) -> Error {
        Error::InvalidParameter {
            name: name.into(),
            expected,
        }
    }

    /// Returns the boolean parameter `name`.
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        match self.require(name)? {
            ParamValue::Bool(v) => Ok(*v),
            _ => Err(Self::mismatch(name, "a boolean")),
        }
    }

    /// Returns the integer parameter `name`.
    pub fn get_int(&self, name: &str) -> Result<i64> {
        match self.require(name)? {
            ParamValue::Int(v) => Ok(*v),
            _ => Err(Self::mismatch(name, "an integer")),
        }
    }

    /// Returns the numeric parameter `name`; integers are widened.
    pub fn get_float(&self, name: &str) -> Result<f64> {
        match self.require(name)? {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            _ => Err(Self::mismatch(name, "a number")),
        }
    }

    /// Returns the string parameter `name`.
    pub fn get_str(&self, name: &str) -> Result<ArcStr> {
        match self.require(name)? {
            ParamValue::Str(v) => Ok(v.clone()),
            _ => Err(Self::mismatch(name, "a string")),
        }
    }

    /// Returns the list parameter `name`.
    pub fn get_list(&self, name: &str) -> Result<&[ParamValue]> {
        match self.require(name)? {
            ParamValue::List(v) => Ok(v),
            _ => Err(Self::mismatch(name, "a list")),
        }
    }

    /// Returns the mapping parameter `name`.
    pub fn get_map(&self, name: &str) -> Result<&IndexMap<ArcStr, ParamValue>> {
        match self.require(name)? {
            ParamValue::Map(v) => Ok(v),
            _ => Err(Self::mismatch(name, "a map")),
        }
    }

    /// Returns the object parameter `name`, downcast to `T`.
    pub fn get_object<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        match self.require(name)? {
            ParamValue::Object(v) => v
                .clone()
                .downcast::<T>()
                .map_err(|_| Self::mismatch(name, std::any::type_name::<T>())),
            _ => Err(Self::mismatch(name, "an object")),
        }
    }

    /// Builds the full parameter set of a template.
    ///
    /// Only declared parameters are kept. Missing ones are taken from
    /// `defaults`; a parameter with neither a value nor a default is an error.
    pub fn resolve(info: &ParamsInfo, defaults: &Params, given: &Params) -> Result<Params> {
        let mut out = Params::new();
        for (name, description) in info {
            let value = given
                .get(name)
                .or_else(|| defaults.get(name))
                .ok_or_else(|| Error::MissingParameter {
                    name: name.clone(),
                    description: description.clone(),
                })?;
            out.insert(name.clone(), value.clone());
        }
        Ok(out)
    }

    /// Returns a copy of `self` in which every key already present is
    /// replaced by its value in `overrides`.
    ///
    /// Keys in `overrides` that `self` does not have are ignored.
    pub fn updated(&self, overrides: &Params) -> Params {
        let mut out = self.clone();
        for (name, value) in overrides.iter() {
            if let Some(slot) = out.0.get_mut(name) {
                *slot = value.clone();
            }
        }
        out
    }

    /// Looks up `name` in the `rename_dict` mapping parameter.
    ///
    /// Returns `name` unchanged if there is no such parameter or no entry.
    pub fn pin_name(&self, name: &str) -> ArcStr {
        match self.get("rename_dict") {
            Some(ParamValue::Map(map)) => match map.get(name) {
                Some(ParamValue::Str(new_name)) => new_name.clone(),
                _ => name.into(),
            },
            _ => name.into(),
        }
    }

    /// Converts these parameters to their canonical identity.
    pub fn to_immutable_id(&self) -> Result<ImmutableId> {
        map_id(self.0.iter())
    }
}

impl<K: Into<ArcStr>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// The canonical, order-independent form of a parameter value.
///
/// Sequences keep their order; mapping entries are sorted by key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ImmutableId {
    /// No value.
    None,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// The bits of a non-NaN float, with negative zero folded into zero.
    Float(u64),
    /// A string.
    Str(ArcStr),
    /// A sequence of canonical values.
    Seq(Vec<ImmutableId>),
    /// Mapping entries sorted by key.
    Map(Vec<(ArcStr, ImmutableId)>),
}

fn map_id<'a>(entries: impl Iterator<Item = (&'a ArcStr, &'a ParamValue)>) -> Result<ImmutableId> {
    let mut out = entries
        .map(|(k, v)| Ok((k.clone(), to_immutable_id(k, v)?)))
        .collect::<Result<Vec<_>>>()?;
    out.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(ImmutableId::Map(out))
}

/// Canonicalizes `value`, the value of the parameter `name`.
///
/// Opaque objects and NaN floats have no canonical form and produce
/// [`Error::UnhashableParameter`].
pub fn to_immutable_id(name: &str, value: &ParamValue) -> Result<ImmutableId> {
    Ok(match value {
        ParamValue::None => ImmutableId::None,
        ParamValue::Bool(v) => ImmutableId::Bool(*v),
        ParamValue::Int(v) => ImmutableId::Int(*v),
        ParamValue::Float(v) => {
            if v.is_nan() {
                return Err(Error::UnhashableParameter(name.into()));
            }
            ImmutableId::Float(if *v == 0.0 { 0f64.to_bits() } else { v.to_bits() })
        }
        ParamValue::Str(v) => ImmutableId::Str(v.clone()),
        ParamValue::List(v) => ImmutableId::Seq(
            v.iter()
                .map(|item| to_immutable_id(name, item))
                .collect::<Result<_>>()?,
        ),
        ParamValue::Map(v) => map_id(v.iter())?,
        ParamValue::Object(_) => return Err(Error::UnhashableParameter(name.into())),
    })
}

/// The identity of a template: its qualified class name plus canonical parameters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateKey {
    class: ArcStr,
    params: ImmutableId,
}

impl TemplateKey {
    /// Computes the key of a template of class `class` with parameters `params`.
    pub fn new(class: impl Into<ArcStr>, params: &Params) -> Result<Self> {
        Ok(Self {
            class: class.into(),
            params: params.to_immutable_id()?,
        })
    }

    /// The qualified class name.
    pub fn class(&self) -> &ArcStr {
        &self.class
    }

    /// The canonical parameters.
    pub fn params(&self) -> &ImmutableId {
        &self.params
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(names: &[&str]) -> ParamsInfo {
        names
            .iter()
            .map(|n| (ArcStr::from(*n), arcstr::format!("the {n} parameter")))
            .collect()
    }

    #[crate::test]
    fn map_identity_ignores_insertion_order() {
        let a = Params::new().with("x", 1).with("y", "two");
        let b = Params::new().with("y", "two").with("x", 1);
        assert_eq!(
            TemplateKey::new("cls", &a).unwrap(),
            TemplateKey::new("cls", &b).unwrap()
        );

        let nested_a = Params::new().with("m", Params::new().with("p", 1).with("q", 2));
        let nested_b = Params::new().with("m", Params::new().with("q", 2).with("p", 1));
        assert_eq!(
            nested_a.to_immutable_id().unwrap(),
            nested_b.to_immutable_id().unwrap()
        );
    }

    #[crate::test]
    fn list_identity_depends_on_order() {
        let a = Params::new().with("l", vec![1, 2, 3]);
        let b = Params::new().with("l", vec![3, 2, 1]);
        assert_ne!(a.to_immutable_id().unwrap(), b.to_immutable_id().unwrap());
    }

    #[crate::test]
    fn class_name_is_part_of_identity() {
        let p = Params::new().with("x", 1);
        assert_ne!(
            TemplateKey::new("a", &p).unwrap(),
            TemplateKey::new("b", &p).unwrap()
        );
    }

    #[crate::test]
    fn objects_and_nan_are_unhashable() {
        let p = Params::new().with("obj", ParamValue::Object(Arc::new(5u8)));
        assert!(matches!(
            p.to_immutable_id(),
            Err(Error::UnhashableParameter(name)) if name == "obj"
        ));
        let p = Params::new().with("l", vec![ParamValue::Float(f64::NAN)]);
        assert!(matches!(
            p.to_immutable_id(),
            Err(Error::UnhashableParameter(_))
        ));
        assert_eq!(
            to_immutable_id("z", &ParamValue::Float(-0.0)).unwrap(),
            to_immutable_id("z", &ParamValue::Float(0.0)).unwrap()
        );
    }

    #[crate::test]
    fn resolve_fills_defaults_and_drops_undeclared() {
        let defaults = Params::new().with("b", 2);
        let given = Params::new().with("a", 1).with("extra", 9);
        let params = Params::resolve(&info(&["a", "b"]), &defaults, &given).unwrap();
        assert_eq!(params.get_int("a").unwrap(), 1);
        assert_eq!(params.get_int("b").unwrap(), 2);
        assert!(!params.contains("extra"));

        let err = Params::resolve(&info(&["a", "c"]), &defaults, &given).unwrap_err();
        assert!(matches!(err, Error::MissingParameter { name, .. } if name == "c"));
    }

    #[crate::test]
    fn typed_getters() {
        let p = Params::new()
            .with("n", 3)
            .with("f", 0.5)
            .with("s", "abc")
            .with("obj", ParamValue::Object(Arc::new(String::from("payload"))));
        assert_eq!(p.get_float("n").unwrap(), 3.0);
        assert_eq!(p.get_str("s").unwrap(), "abc");
        assert_eq!(*p.get_object::<String>("obj").unwrap(), "payload");
        assert!(matches!(
            p.get_int("f"),
            Err(Error::InvalidParameter { expected: "an integer", .. })
        ));
        assert!(matches!(p.get_bool("missing"), Err(Error::MissingParameter { .. })));
    }

    #[crate::test]
    fn updated_only_touches_existing_keys() {
        let p = Params::new().with("a", 1).with("b", 2);
        let q = p.updated(&Params::new().with("b", 5).with("c", 7));
        assert_eq!(q.get_int("b").unwrap(), 5);
        assert!(!q.contains("c"));
    }

    #[crate::test]
    fn pin_names_follow_rename_dict() {
        let p = Params::new().with("rename_dict", Params::new().with("in", "vin"));
        assert_eq!(p.pin_name("in"), "vin");
        assert_eq!(p.pin_name("out"), "out");
        assert_eq!(Params::new().pin_name("in"), "in");
    }
}
