use quick_xml::escape::escape;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::result;
use std::str::FromStr;
use thiserror::Error;

/// Error that has occurred when parsing an option's value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("expected boolean option, got: {value}")]
pub struct ParseError {
    value: String,
}

impl ParseError {
    fn new(value: &str) -> Self {
        Self {
            value: value.to_owned(),
        }
    }
}

/// Paging and serialization parameters of a query request.
///
/// # Example
///
/// ```
/// # use existdb::QueryOptions;
/// let options = QueryOptions::default().start(11).max(10);
/// assert_eq!(11, options.start_index());
/// assert_eq!(10, options.max_items());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    start: usize,
    max: usize,
    cache: bool,
    serialization: SerializationOptions,
}

impl Default for QueryOptions {
    fn default() -> Self {
        let mut serialization = SerializationOptions::default();
        serialization.set("indent", false);

        Self {
            start: 1,
            max: 0,
            cache: false,
            serialization,
        }
    }
}

impl QueryOptions {
    /// Sets the 1-based position of the first item returned. Positions below 1 are raised to 1.
    pub fn start(mut self, start: usize) -> Self {
        self.start = start.max(1);
        self
    }

    /// Sets the maximum number of items returned; `0` returns all.
    pub fn max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    /// Asks the server to cache the result set for subsequent pages.
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Replaces the serialization parameters.
    pub fn serialization(mut self, serialization: SerializationOptions) -> Self {
        self.serialization = serialization;
        self
    }

    /// The 1-based position of the first item returned.
    pub fn start_index(&self) -> usize {
        self.start
    }

    /// The maximum number of items returned; `0` means all.
    pub fn max_items(&self) -> usize {
        self.max
    }

    /// Whether the server caches the result set.
    pub fn is_cached(&self) -> bool {
        self.cache
    }

    /// The serialization parameters.
    pub fn serialization_options(&self) -> &SerializationOptions {
        &self.serialization
    }

    /// The same options, with the result wrapping forced on.
    pub(crate) fn wrapped(&self) -> Self {
        let mut options = self.clone();
        options.serialization.set("wrap", true);
        options
    }
}

/// Options for the query result [serializer](https://exist-db.org/exist/apps/doc/xquery#serialization).
///
/// # Example
///
/// ```
/// # use existdb::{SerializationOptions, ParseError};
/// # use std::str::FromStr;
/// # fn main() -> Result<(), ParseError> {
/// let mut options = SerializationOptions::from_str("encoding=US-ASCII,indent=yes")?;
///
/// let indent = options.get("indent").unwrap();
/// assert!(indent.as_bool()?);
/// let indent = options.set("indent", false);
/// assert!(!indent.as_bool()?);
///
/// assert_eq!("encoding=US-ASCII,indent=no", &options.to_string());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SerializationOptions {
    options: BTreeMap<String, Attribute>,
}

impl SerializationOptions {
    /// Gets a reference to an attribute if it exists.
    pub fn get(&self, key: &str) -> Option<&Attribute> {
        self.options.get(key)
    }

    /// Inserts new attribute value.
    pub fn set(&mut self, key: &str, value: impl ToAttribute) -> &Attribute {
        self.options.insert(key.to_owned(), value.to_attribute());
        &self.options[key]
    }

    /// Renders the options as `<property>` elements of a query request.
    pub(crate) fn to_properties(&self) -> String {
        self.options
            .iter()
            .map(|(key, value)| {
                format!(
                    r#"<property name="{}" value="{}"/>"#,
                    escape(key.as_str()),
                    escape(value.as_str())
                )
            })
            .collect()
    }
}

impl Display for SerializationOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (key, value) in self.options.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}={}", key, value)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for SerializationOptions {
    type Err = ParseError;

    fn from_str(s: &str) -> result::Result<Self, Self::Err> {
        let mut options = BTreeMap::new();

        for pair in s.split(',').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            options.insert(key.to_owned(), Attribute::from_str(value)?);
        }

        Ok(Self { options })
    }
}

/// Makes this type usable as a serializer attribute value.
pub trait ToAttribute {
    /// Converts the value.
    fn to_attribute(&self) -> Attribute;
}

impl ToAttribute for bool {
    fn to_attribute(&self) -> Attribute {
        Attribute::new(if *self { "yes" } else { "no" })
    }
}

impl ToAttribute for &str {
    fn to_attribute(&self) -> Attribute {
        Attribute::new(self)
    }
}

/// Attribute of the serializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    inner: String,
}

impl Attribute {
    fn new(value: &str) -> Self {
        Self {
            inner: value.to_owned(),
        }
    }

    /// Returns this attribute as str.
    pub fn as_str(&self) -> &str {
        self.inner.as_str()
    }

    /// Returns this attribute as boolean.
    pub fn as_bool(&self) -> result::Result<bool, ParseError> {
        match self.inner.as_str() {
            "yes" => Ok(true),
            "no" => Ok(false),
            _ => Err(ParseError::new(&self.inner)),
        }
    }
}

impl FromStr for Attribute {
    type Err = ParseError;

    fn from_str(s: &str) -> result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl Display for Attribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query_options_return_everything_without_indent() {
        let options = QueryOptions::default();

        assert_eq!(1, options.start_index());
        assert_eq!(0, options.max_items());
        assert!(!options.is_cached());
        assert_eq!("indent=no", options.serialization_options().to_string());
    }

    #[test]
    fn test_start_below_one_is_raised() {
        assert_eq!(1, QueryOptions::default().start(0).start_index());
    }

    #[test]
    fn test_wrapped_forces_wrap_on() {
        let mut serialization = SerializationOptions::default();
        serialization.set("wrap", false);
        let options = QueryOptions::default().serialization(serialization);

        let wrapped = options.wrapped();

        assert!(wrapped.serialization_options().get("wrap").unwrap().as_bool().unwrap());
    }

    #[test]
    fn test_properties_are_escaped() {
        let mut options = SerializationOptions::default();
        options.set("indent", false);
        options.set("item-separator", "<&>");

        assert_eq!(
            r#"<property name="indent" value="no"/><property name="item-separator" value="&lt;&amp;&gt;"/>"#,
            options.to_properties()
        );
    }

    #[test]
    fn test_cloning_options_produces_same_options() -> result::Result<(), ParseError> {
        let expected_options = SerializationOptions::from_str("encoding=US-ASCII,indent=yes")?;
        let actual_options = expected_options.clone();
        assert_eq!(expected_options, actual_options);
        Ok(())
    }

    #[test]
    fn test_true_attribute_as_bool_is_true() {
        assert!(true.to_attribute().as_bool().unwrap());
    }

    #[test]
    fn test_false_attribute_as_bool_is_false() {
        assert!(!false.to_attribute().as_bool().unwrap());
    }

    #[test]
    fn test_non_boolean_fails_as_bool() {
        Attribute::from_str("test")
            .unwrap()
            .as_bool()
            .expect_err("Parsing must fail");
    }

    #[test]
    fn test_parse_error_formats_as_debug() {
        format!("{:?}", ParseError::new("test"));
    }

    #[test]
    fn test_attributes_can_be_inserted_into_options() {
        let mut options = SerializationOptions::from_str("").unwrap();
        options.set("indent", false);
        options.set("encoding", "UTF-8");
        assert_eq!("encoding=UTF-8,indent=no", &options.to_string());
    }

    #[test]
    fn test_attributes_can_be_read_from_options() -> result::Result<(), ParseError> {
        let options = SerializationOptions::from_str("encoding=UTF-8,indent=yes")?;
        assert_eq!(*options.get("indent").unwrap(), true.to_attribute());
        assert_eq!(*options.get("encoding").unwrap(), Attribute::from_str("UTF-8").unwrap());
        Ok(())
    }
}
