use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

/// Single scalar carried by a form or query field.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Text(String),
    Int(i64),
    Int32(i32),
    Uint32(u32),
    Uint64(u64),
    Float(f64),
}

impl Scalar {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn int(value: i64) -> Self {
        Self::Int(value)
    }

    pub fn float(value: f64) -> Self {
        Self::Float(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Int(value) => write!(f, "{value}"),
            Self::Int32(value) => write!(f, "{value}"),
            Self::Uint32(value) => write!(f, "{value}"),
            Self::Uint64(value) => write!(f, "{value}"),
            Self::Float(value) => f.write_str(&format_float(*value)),
        }
    }
}

/// Shortest round-trip decimal, switching to `d.ddde±XX` when the decimal
/// exponent is below -4 or at least 21.
fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_owned();
    }

    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or_default();
    if (-4..21).contains(&exponent) {
        return format!("{value}");
    }
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs())
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int32(value)
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Self::Uint32(value)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::Uint64(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Reference to a local file uploaded as a multipart part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormFile {
    /// Path of the file to read.
    pub path: PathBuf,
    /// Part name; defaults to the form key.
    pub field: Option<String>,
    /// File name sent to the server; defaults to the base name of `path`.
    pub file_name: Option<String>,
}

impl FormFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            field: None,
            file_name: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub(crate) fn resolved_field<'a>(&'a self, key: &'a str) -> &'a str {
        self.field.as_deref().filter(|f| !f.is_empty()).unwrap_or(key)
    }

    pub(crate) fn resolved_file_name(&self) -> String {
        if let Some(name) = self.file_name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_owned();
        }
        base_name(&self.path)
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Value of a single form field.
///
/// The set of shapes is closed: anything else is rejected when the form is
/// built from loosely typed input (see [`crate::Form::from_json`]).
#[derive(Clone, Debug, PartialEq)]
pub enum FormValue {
    /// Encoded as `key=value`.
    Scalar(Scalar),
    /// Encoded as repeated `key[]=item`, in order.
    List(Vec<Scalar>),
    /// Encoded as `key[sub]=value`.
    Map(BTreeMap<String, Scalar>),
    /// Encoded as `key[index][sub]=value`.
    MapList(Vec<BTreeMap<String, Scalar>>),
    /// Uploaded as a file part; forces multipart encoding.
    File(FormFile),
}

impl FormValue {
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<Scalar>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl fmt::Display for FormValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(scalar) => write!(f, "{scalar}"),
            Self::List(items) => {
                f.write_str("[")?;
                write_joined(f, items.iter())?;
                f.write_str("]")
            }
            Self::Map(map) => write_map(f, map),
            Self::MapList(maps) => {
                f.write_str("[")?;
                for (index, map) in maps.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write_map(f, map)?;
                }
                f.write_str("]")
            }
            Self::File(file) => write!(f, "@{}", file.path.display()),
        }
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = T>,
) -> fmt::Result {
    for (index, item) in items.enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_map(f: &mut fmt::Formatter<'_>, map: &BTreeMap<String, Scalar>) -> fmt::Result {
    f.write_str("{")?;
    write_joined(f, map.iter().map(|(key, value)| format!("{key}: {value}")))?;
    f.write_str("}")
}

macro_rules! scalar_form_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FormValue {
                fn from(value: $ty) -> Self {
                    Self::Scalar(value.into())
                }
            }
        )*
    };
}

scalar_form_value!(Scalar, String, &str, i64, i32, u32, u64, f64);

impl From<FormFile> for FormValue {
    fn from(file: FormFile) -> Self {
        Self::File(file)
    }
}

macro_rules! list_form_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<Vec<$ty>> for FormValue {
                fn from(items: Vec<$ty>) -> Self {
                    Self::list(items)
                }
            }
        )*
    };
}

list_form_value!(Scalar, String, &str, i64, i32, u32, u64, f64);

impl From<BTreeMap<String, Scalar>> for FormValue {
    fn from(map: BTreeMap<String, Scalar>) -> Self {
        Self::Map(map)
    }
}

impl From<Vec<BTreeMap<String, Scalar>>> for FormValue {
    fn from(maps: Vec<BTreeMap<String, Scalar>>) -> Self {
        Self::MapList(maps)
    }
}
