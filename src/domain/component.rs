//! Device model addressing types
//!
//! Components, variables and their characteristics/attributes as the
//! monitoring engine sees them.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// EVSE reference of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Evse {
    /// EVSE id (1-based)
    pub id: u32,
    /// Connector id on that EVSE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_id: Option<u32>,
}

/// Component of the device model (e.g. `EVSE`, `SampledDataCtrlr`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Component {
    /// Component name
    pub name: String,
    /// Optional component instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Optional EVSE this component belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evse: Option<Evse>,
}

impl Component {
    /// Create a component without instance or EVSE
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance: None,
            evse: None,
        }
    }

    /// Set the component instance
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Set the EVSE reference
    pub fn with_evse(mut self, id: u32, connector_id: Option<u32>) -> Self {
        self.evse = Some(Evse { id, connector_id });
        self
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(instance) = &self.instance {
            write!(f, "[{}]", instance)?;
        }
        if let Some(evse) = &self.evse {
            write!(f, "@evse{}", evse.id)?;
            if let Some(connector) = evse.connector_id {
                write!(f, "/{}", connector)?;
            }
        }
        Ok(())
    }
}

/// Variable of a component (e.g. `Temperature`, `Power`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    /// Variable name
    pub name: String,
    /// Optional variable instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl Variable {
    /// Create a variable without instance
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance: None,
        }
    }

    /// Set the variable instance
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(instance) => write!(f, "{}[{}]", self.name, instance),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Data type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    #[default]
    String,
    Decimal,
    Integer,
    DateTime,
    Boolean,
    OptionList,
    SequenceList,
    MemberList,
}

impl DataType {
    /// Whether values of this type can be compared numerically
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Decimal | Self::Integer)
    }
}

impl FromStr for DataType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(Self::String),
            "decimal" => Ok(Self::Decimal),
            "integer" => Ok(Self::Integer),
            "date_time" | "datetime" => Ok(Self::DateTime),
            "boolean" => Ok(Self::Boolean),
            "option_list" => Ok(Self::OptionList),
            "sequence_list" => Ok(Self::SequenceList),
            "member_list" => Ok(Self::MemberList),
            _ => Err(DomainError::InvalidValue(format!("Unknown data type: {}", s))),
        }
    }
}

/// Characteristics of a variable
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariableCharacteristics {
    pub data_type: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_limit: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_limit: Option<f64>,
}

impl VariableCharacteristics {
    /// Characteristics with only a data type
    pub fn of(data_type: DataType) -> Self {
        Self {
            data_type,
            ..Self::default()
        }
    }
}

/// Attribute kind of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    #[default]
    Actual,
    Target,
    MinSet,
    MaxSet,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actual => write!(f, "Actual"),
            Self::Target => write!(f, "Target"),
            Self::MinSet => write!(f, "MinSet"),
            Self::MaxSet => write!(f, "MaxSet"),
        }
    }
}

/// Attribute mutability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

impl FromStr for Mutability {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read_only" | "readonly" => Ok(Self::ReadOnly),
            "write_only" | "writeonly" => Ok(Self::WriteOnly),
            "read_write" | "readwrite" => Ok(Self::ReadWrite),
            _ => Err(DomainError::InvalidValue(format!("Unknown mutability: {}", s))),
        }
    }
}

/// Variable attribute metadata
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariableAttribute {
    pub kind: AttributeKind,
    pub mutability: Mutability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl VariableAttribute {
    /// Actual attribute with the given mutability
    pub fn actual(mutability: Mutability) -> Self {
        Self {
            kind: AttributeKind::Actual,
            mutability,
            value: None,
        }
    }

    /// Whether the attribute may be written but never read back
    pub fn is_write_only(&self) -> bool {
        self.mutability == Mutability::WriteOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_display() {
        let component = Component::new("EVSE").with_evse(1, Some(2));
        assert_eq!(component.to_string(), "EVSE@evse1/2");

        let component = Component::new("TempSensor").with_instance("inlet");
        assert_eq!(component.to_string(), "TempSensor[inlet]");
    }

    #[test]
    fn test_variable_display() {
        assert_eq!(Variable::new("Power").to_string(), "Power");
        assert_eq!(
            Variable::new("Voltage").with_instance("L1").to_string(),
            "Voltage[L1]"
        );
    }

    #[test]
    fn test_data_type_numeric() {
        assert!(DataType::Decimal.is_numeric());
        assert!(DataType::Integer.is_numeric());
        assert!(!DataType::Boolean.is_numeric());
        assert!(!DataType::String.is_numeric());
    }

    #[test]
    fn test_parse_mutability() {
        assert_eq!("write_only".parse::<Mutability>().unwrap(), Mutability::WriteOnly);
        assert_eq!("ReadOnly".parse::<Mutability>().unwrap(), Mutability::ReadOnly);
        assert!("sometimes".parse::<Mutability>().is_err());
    }

    #[test]
    fn test_write_only_attribute() {
        assert!(VariableAttribute::actual(Mutability::WriteOnly).is_write_only());
        assert!(!VariableAttribute::actual(Mutability::ReadWrite).is_write_only());
    }
}
