//! Relationship definitions - declared joins between models.

use serde::{Deserialize, Serialize};

/// A declared join between exactly two models.
///
/// Used to fill in join criteria when a query joins the two models
/// without an explicit ON clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub name: String,
    /// The two endpoint model names.
    pub models: Vec<String>,
    pub join_type: JoinKind,
    /// Join condition SQL over the two models' columns.
    pub condition: String,
}

impl Relationship {
    pub fn new(name: &str, models: Vec<&str>, join_type: JoinKind, condition: &str) -> Self {
        Self {
            name: name.into(),
            models: models.into_iter().map(String::from).collect(),
            join_type,
            condition: condition.into(),
        }
    }

    /// Whether this relationship connects the two given models,
    /// in either order.
    pub fn connects(&self, left: &str, right: &str) -> bool {
        self.models.len() == 2
            && ((self.models[0] == left && self.models[1] == right)
                || (self.models[0] == right && self.models[1] == left))
    }
}

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    #[serde(rename = "ONE_TO_ONE")]
    OneToOne,
    #[serde(rename = "ONE_TO_MANY")]
    OneToMany,
    #[serde(rename = "MANY_TO_ONE")]
    ManyToOne,
    #[serde(rename = "MANY_TO_MANY")]
    ManyToMany,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connects_either_order() {
        let rel = Relationship::new(
            "OrdersCustomer",
            vec!["Orders", "Customer"],
            JoinKind::ManyToOne,
            "Orders.custkey = Customer.custkey",
        );
        assert!(rel.connects("Orders", "Customer"));
        assert!(rel.connects("Customer", "Orders"));
        assert!(!rel.connects("Orders", "Lineitem"));
    }

    #[test]
    fn test_join_kind_deserialize() {
        let kind: JoinKind = serde_json::from_str("\"MANY_TO_ONE\"").unwrap();
        assert_eq!(kind, JoinKind::ManyToOne);
    }
}
