use std::{fmt, str::FromStr};

/// Output or input type reference of a field or argument, `[String!]!` for example.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Named(Box<str>),
    List(Box<Type>),
    NonNull(Box<Type>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeParseError {
    #[error("Empty type reference")]
    Empty,
    #[error("Invalid type name `{0}`")]
    InvalidName(String),
    #[error("Unbalanced brackets in `{0}`")]
    UnbalancedBrackets(String),
    #[error("A non-null type cannot be wrapped in another non-null in `{0}`")]
    DoubleNonNull(String),
}

impl Type {
    pub fn named(name: impl Into<Box<str>>) -> Self {
        Type::Named(name.into())
    }

    #[must_use]
    pub fn list(self) -> Self {
        Type::List(Box::new(self))
    }

    #[must_use]
    pub fn non_null(self) -> Self {
        match self {
            Type::NonNull(_) => self,
            other => Type::NonNull(Box::new(other)),
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, Type::NonNull(_))
    }

    pub fn is_nullable(&self) -> bool {
        !self.is_non_null()
    }

    /// Name of the innermost named type.
    pub fn type_name(&self) -> &str {
        match self {
            Type::Named(name) => name,
            Type::List(inner) | Type::NonNull(inner) => inner.type_name(),
        }
    }

    fn parse_inner(raw: &str, full: &str) -> Result<Self, TypeParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TypeParseError::Empty);
        }
        if let Some(inner) = raw.strip_suffix('!') {
            let inner = Self::parse_inner(inner, full)?;
            if inner.is_non_null() {
                return Err(TypeParseError::DoubleNonNull(full.to_string()));
            }
            return Ok(Type::NonNull(Box::new(inner)));
        }
        match (raw.strip_prefix('['), raw.strip_suffix(']')) {
            (Some(_), Some(_)) => {
                let inner = &raw[1..raw.len() - 1];
                Ok(Type::List(Box::new(Self::parse_inner(inner, full)?)))
            }
            (None, None) => {
                if is_valid_name(raw) {
                    Ok(Type::Named(raw.into()))
                } else {
                    Err(TypeParseError::InvalidName(raw.to_string()))
                }
            }
            _ => Err(TypeParseError::UnbalancedBrackets(full.to_string())),
        }
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first == '_' || first.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

impl FromStr for Type {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_inner(s, s)
    }
}

/// Lenient conversion used by the schema builders. An unparseable reference is kept as a named
/// type with the raw text so that `SchemaBuilder::finish` reports it as an unknown type.
impl From<&str> for Type {
    fn from(value: &str) -> Self {
        value.parse().unwrap_or_else(|_| Type::Named(value.into()))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Named(name) => f.write_str(name),
            Type::List(inner) => write!(f, "[{inner}]"),
            Type::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}
