use crate::LinkerError;
use core::fmt;
use parity_wasm::elements::{GlobalType, ResizableLimits, ValueType as EValueType};

/// Type of a value held by a global variable.
///
/// Mirrors the four wasm value types. Conversions to and from the
/// `parity-wasm` element type are provided so a front end can hand its parsed
/// types over directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// 32-bit signed or unsigned integer.
    I32,
    /// 64-bit signed or unsigned integer.
    I64,
    /// 32-bit IEEE 754-2008 floating point number.
    F32,
    /// 64-bit IEEE 754-2008 floating point number.
    F64,
}

impl ValueType {
    /// Construct a `ValueType` from the `parity-wasm` element type.
    pub fn from_elements(value_type: EValueType) -> ValueType {
        match value_type {
            EValueType::I32 => ValueType::I32,
            EValueType::I64 => ValueType::I64,
            EValueType::F32 => ValueType::F32,
            EValueType::F64 => ValueType::F64,
        }
    }

    /// Convert this `ValueType` into the `parity-wasm` element type.
    pub fn into_elements(self) -> EValueType {
        match self {
            ValueType::I32 => EValueType::I32,
            ValueType::I64 => EValueType::I64,
            ValueType::F32 => EValueType::F32,
            ValueType::F64 => EValueType::F64,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ValueType::I32 => write!(f, "i32"),
            ValueType::I64 => write!(f, "i64"),
            ValueType::F32 => write!(f, "f32"),
            ValueType::F64 => write!(f, "f64"),
        }
    }
}

/// Mutability modifier of a global variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    /// The global variable is immutable.
    Const,
    /// The global variable is mutable.
    Var,
}

impl Mutability {
    /// Construct a `Mutability` from the `parity-wasm` global type.
    pub fn from_elements(global_type: &GlobalType) -> Mutability {
        if global_type.is_mutable() {
            Mutability::Var
        } else {
            Mutability::Const
        }
    }
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Mutability::Const => write!(f, "const"),
            Mutability::Var => write!(f, "mutable"),
        }
    }
}

/// Name pair identifying an import: the exporting module and the member
/// within it.
///
/// Two descriptors are equal iff both names are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportDescriptor {
    module_name: String,
    member_name: String,
}

impl ImportDescriptor {
    /// Creates a descriptor for the member `member_name` exported by the
    /// module `module_name`.
    pub fn new<M: Into<String>, N: Into<String>>(
        module_name: M,
        member_name: N,
    ) -> ImportDescriptor {
        ImportDescriptor {
            module_name: module_name.into(),
            member_name: member_name.into(),
        }
    }

    /// Returns the name of the exporting module.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Returns the name of the imported member.
    pub fn member_name(&self) -> &str {
        &self.member_name
    }
}

impl fmt::Display for ImportDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.module_name, self.member_name)
    }
}

pub(crate) fn check_limits(limits: &ResizableLimits) -> Result<(), LinkerError> {
    if let Some(maximum) = limits.maximum() {
        if maximum < limits.initial() {
            return Err(LinkerError::new(format!(
                "maximum limit {} is less than minimum {}",
                maximum,
                limits.initial()
            )));
        }
    }

    Ok(())
}
