use super::{Named, Typed};
use crate::error::WeaveError;
use crate::value::{Value, ValueKind};
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Enum,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Enum => write!(f, "enum"),
        }
    }
}

/// A database-level type. Only enumerations are supported.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub(crate) name: String,
    pub(crate) kind: TypeKind,
    pub(crate) values: Vec<String>,
    pub(crate) value_kind: Option<ValueKind>,
    pub(crate) registration_error: Option<WeaveError>,
}

impl TypeDescriptor {
    /// Builds an enumeration, recording a registration error instead of failing
    /// when the values are empty, non-scalar or of mixed kinds.
    pub(crate) fn enumeration(name: &str, values: Vec<Value>) -> Self {
        let mut descriptor = TypeDescriptor {
            name: super::normalize_name(name),
            kind: TypeKind::Enum,
            values: Vec::with_capacity(values.len()),
            value_kind: None,
            registration_error: None,
        };

        if !super::is_identifier(&descriptor.name) {
            descriptor.registration_error = Some(WeaveError::InvalidType(format!(
                "{name} is not a valid type name"
            )));
            return descriptor;
        }
        if values.is_empty() {
            descriptor.registration_error = Some(WeaveError::Empty(format!(
                "enum {} must have at least one value",
                descriptor.name
            )));
            return descriptor;
        }

        for value in &values {
            let kind = value.kind();
            if !value.is_scalar() {
                descriptor.registration_error = Some(WeaveError::InvalidType(format!(
                    "enum {} accepts only scalar values, found {kind}",
                    descriptor.name
                )));
                return descriptor;
            }
            match descriptor.value_kind {
                Some(expected) if expected != kind => {
                    descriptor.registration_error = Some(WeaveError::InvalidType(format!(
                        "enum {} mixes {expected} and {kind} values",
                        descriptor.name
                    )));
                    return descriptor;
                }
                _ => descriptor.value_kind = Some(kind),
            }
            // scalars always have a label
            if let Some(label) = value.to_label() {
                descriptor.values.push(label);
            }
        }
        descriptor
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn value_kind(&self) -> Option<ValueKind> {
        self.value_kind
    }

    pub fn registration_error(&self) -> Option<&WeaveError> {
        self.registration_error.as_ref()
    }
}

impl Named for TypeDescriptor {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Typed for TypeDescriptor {
    fn type_kind(&self) -> TypeKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn homogeneous_text_enum() {
        let role = TypeDescriptor::enumeration(
            "User_Role",
            vec!["STUDENT".into(), "TEACHER".into(), "ADMIN".into()],
        );
        assert!(role.registration_error().is_none());
        assert_eq!(role.name(), "user_role");
        assert_eq!(role.values(), ["STUDENT", "TEACHER", "ADMIN"]);
        assert_eq!(role.value_kind(), Some(ValueKind::Text));
    }

    #[test]
    fn mixed_kinds_are_rejected() {
        let mixed = TypeDescriptor::enumeration("level", vec!["low".into(), 2i32.into()]);
        assert_eq!(
            mixed.registration_error().map(WeaveError::kind),
            Some(ErrorKind::InvalidType)
        );
    }

    #[test]
    fn non_scalar_and_empty_are_rejected() {
        let null = TypeDescriptor::enumeration("flag", vec![Value::Null]);
        assert_eq!(
            null.registration_error().map(WeaveError::kind),
            Some(ErrorKind::InvalidType)
        );

        let empty = TypeDescriptor::enumeration("flag", Vec::new());
        assert_eq!(
            empty.registration_error().map(WeaveError::kind),
            Some(ErrorKind::Empty)
        );
    }
}
