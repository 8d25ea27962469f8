//! Service level agreement domain model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{FedRegError, FedRegResult};
use crate::graph::Label;
use crate::models::node::{Node, NodeAttrs};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlaAttrs {
    #[serde(default)]
    pub description: String,
    /// Identifier of the signed agreement document. Globally unique.
    pub doc_uuid: String,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl SlaAttrs {
    pub fn validate(&self) -> FedRegResult<()> {
        match self.end_date {
            Some(end) if end <= self.start_date => Err(FedRegError::validation(format!(
                "SLA '{}': start date {} must precede end date {end}",
                self.doc_uuid, self.start_date
            ))),
            _ => Ok(()),
        }
    }
}

impl NodeAttrs for SlaAttrs {
    const LABEL: Label = Label::Sla;
}

pub type Sla = Node<SlaAttrs>;

/// Desired SLA. `project` is the provider-side uuid of the project the
/// agreement refers to on the provider being reconciled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSla {
    #[serde(flatten)]
    pub attrs: SlaAttrs,
    pub project: String,
}

impl CreateSla {
    pub fn validate(&self) -> FedRegResult<()> {
        self.attrs.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn end_date_must_follow_start_date() {
        let mut sla = SlaAttrs {
            doc_uuid: "doc".into(),
            start_date: date(2024, 1, 1),
            end_date: Some(date(2023, 1, 1)),
            ..Default::default()
        };
        assert!(matches!(sla.validate(), Err(FedRegError::Validation { .. })));

        sla.end_date = Some(date(2025, 1, 1));
        sla.validate().unwrap();

        sla.end_date = None;
        sla.validate().unwrap();
    }
}
