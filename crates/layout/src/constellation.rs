//! The constellation table: which of two candidate figures may be placed,
//! and as which variant, given the figure already preceding them on the page.

use crate::LayoutError;
use crate::model::{ModelSpec, WrapMode};
use crate::util::false_as_none;
use pagefig_types::TypesettingClass;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Eligibility of one candidate, stored as `[eligible, variant|false]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "DecisionRepr", into = "DecisionRepr")]
pub struct Decision {
    pub eligible: bool,
    /// Class to place the figure as; `None` keeps the figure's own class.
    pub variant: Option<TypesettingClass>,
}

#[derive(Clone, Serialize, Deserialize)]
struct DecisionRepr(bool, #[serde(with = "false_as_none")] Option<TypesettingClass>);

impl From<DecisionRepr> for Decision {
    fn from(DecisionRepr(eligible, variant): DecisionRepr) -> Self {
        Self { eligible, variant }
    }
}

impl From<Decision> for DecisionRepr {
    fn from(d: Decision) -> Self {
        DecisionRepr(d.eligible, d.variant)
    }
}

impl Decision {
    pub fn place_as(variant: TypesettingClass) -> Self {
        Self {
            eligible: true,
            variant: Some(variant),
        }
    }

    pub fn ineligible() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstellationEntry {
    pub current_figure: Decision,
    pub next_figure: Decision,
}

impl ConstellationEntry {
    fn blocked() -> Self {
        Self::default()
    }
}

/// Flat mapping from `before#current#next` keys to entries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstellationTable {
    entries: BTreeMap<String, ConstellationEntry>,
}

impl ConstellationTable {
    pub fn new(entries: BTreeMap<String, ConstellationEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let table: Self = serde_json::from_str(json)?;
        for key in table.entries.keys() {
            if key.split('#').count() != 3 {
                return Err(LayoutError::Config(format!(
                    "constellation key '{key}' does not have three segments"
                )));
            }
        }
        Ok(table)
    }

    pub fn key(
        before: Option<&TypesettingClass>,
        current: Option<&TypesettingClass>,
        next: Option<&TypesettingClass>,
    ) -> String {
        format!(
            "{}#{}#{}",
            TypesettingClass::key_segment(before),
            TypesettingClass::key_segment(current),
            TypesettingClass::key_segment(next)
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ConstellationEntry> {
        self.entries.get(key)
    }

    /// Looks up the entry for a constellation. A missing key makes both
    /// candidates ineligible.
    pub fn decide(
        &self,
        before: Option<&TypesettingClass>,
        current: Option<&TypesettingClass>,
        next: Option<&TypesettingClass>,
    ) -> ConstellationEntry {
        let key = Self::key(before, current, next);
        match self.entries.get(&key) {
            Some(entry) => entry.clone(),
            None => {
                log::warn!("No constellation entry for '{key}'; deferring both candidates");
                ConstellationEntry::blocked()
            }
        }
    }

    /// Builds the full table over a model's classes plus the empty slot.
    pub fn generate(model: &ModelSpec) -> Self {
        let mut slots: Vec<Option<&TypesettingClass>> = vec![None];
        slots.extend(model.classes().map(Some));

        let wrap = |c: Option<&TypesettingClass>| c.map(|c| model.wrap_of(c));
        let mut entries = BTreeMap::new();

        for &before in &slots {
            for &current in &slots {
                for &next in &slots {
                    let key = Self::key(before, current, next);
                    let Some(current_class) = current else {
                        entries.insert(key, ConstellationEntry::blocked());
                        continue;
                    };

                    let (wb, wc, wn) = (wrap(before), wrap(current), wrap(next));
                    let floats = |w: Option<WrapMode>| w == Some(WrapMode::Float);

                    let next_blocked = next.is_none()
                        // Caption collision: two floats ahead of an overmargin figure.
                        || (floats(wb) && floats(wc) && wn == Some(WrapMode::Overmargin))
                        // No three floats in a row.
                        || (floats(wb) && floats(wc) && floats(wn));

                    let next_figure = match next {
                        Some(n) if !next_blocked => Decision::place_as(n.clone()),
                        _ => Decision::ineligible(),
                    };

                    entries.insert(
                        key,
                        ConstellationEntry {
                            current_figure: Decision::place_as(current_class.clone()),
                            next_figure,
                        },
                    );
                }
            }
        }

        log::debug!("Generated constellation table with {} entries", entries.len());
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str) -> TypesettingClass {
        TypesettingClass::new(name)
    }

    fn table() -> ConstellationTable {
        ConstellationTable::generate(&ModelSpec::default_catalogue())
    }

    #[test]
    fn test_generate_is_full_product() {
        // Seven classes plus the empty slot in each of three positions.
        assert_eq!(table().len(), 8 * 8 * 8);
    }

    #[test]
    fn test_plain_pair_is_eligible() {
        let entry = table().decide(None, Some(&class("medium")), Some(&class("inset")));
        assert_eq!(entry.current_figure, Decision::place_as(class("medium")));
        assert_eq!(entry.next_figure, Decision::place_as(class("inset")));
    }

    #[test]
    fn test_floats_before_overmargin() {
        let entry = table().decide(
            Some(&class("float")),
            Some(&class("float-narrow")),
            Some(&class("overmargin")),
        );
        assert!(entry.current_figure.eligible);
        assert!(!entry.next_figure.eligible);
    }

    #[test]
    fn test_three_floats() {
        let entry = table().decide(
            Some(&class("float")),
            Some(&class("float")),
            Some(&class("float-narrow")),
        );
        assert!(!entry.next_figure.eligible);

        let entry = table().decide(None, Some(&class("float")), Some(&class("float")));
        assert!(entry.next_figure.eligible);
    }

    #[test]
    fn test_page_top_predecessor_keeps_own_class() {
        // Pinning after a page-top figure happens at placement; the size
        // preset stays the candidate's own.
        let entry = table().decide(Some(&class("page-top")), Some(&class("medium")), None);
        assert_eq!(entry.current_figure, Decision::place_as(class("medium")));
        assert!(!entry.next_figure.eligible);

        let entry = table().decide(
            Some(&class("page-top")),
            Some(&class("float-narrow")),
            Some(&class("inset")),
        );
        assert_eq!(entry.current_figure, Decision::place_as(class("float-narrow")));
        assert_eq!(entry.next_figure, Decision::place_as(class("inset")));
    }

    #[test]
    fn test_missing_key_blocks_both() {
        let entry = table().decide(None, Some(&class("unknown")), None);
        assert!(!entry.current_figure.eligible && !entry.next_figure.eligible);
    }

    #[test]
    fn test_json_layout() {
        let json = r#"{
            "false#medium#false": {"currentFigure": [true, "medium"], "nextFigure": [false, false]}
        }"#;
        let table = ConstellationTable::from_json(json).unwrap();
        let entry = table.get("false#medium#false").unwrap();
        assert_eq!(entry.current_figure, Decision::place_as(class("medium")));
        assert_eq!(entry.next_figure, Decision::ineligible());

        let out = serde_json::to_value(&table).unwrap();
        assert_eq!(
            out["false#medium#false"]["nextFigure"],
            serde_json::json!([false, false])
        );
    }

    #[test]
    fn test_rejects_malformed_keys() {
        let json = r#"{"medium#false": {"currentFigure": [true, false], "nextFigure": [false, false]}}"#;
        assert!(ConstellationTable::from_json(json).is_err());
    }
}
