//! Experiment definitions and tree lookup.
use std::{fs::File, io::BufReader, path::Path};

use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::{distribution::calculate_distribution, Error, Result};

/// The full set of experiment definitions, usually loaded once at startup.
///
/// The JSON form is an array of [`ExperimentNode`]s:
///
/// ```
/// # use ab_segment::Experiments;
/// let experiments = Experiments::from_json_str(r#"[
///     { "name": "button-color", "variants": [1, 1], "maxAgeDays": 30 }
/// ]"#).unwrap();
/// assert!(experiments.find_experiment("button-color").is_some());
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(try_from = "Vec<ExperimentNode>")]
pub struct Experiments(Vec<ExperimentNode>);

/// A named experiment. Its variants are either explicit weights or nested experiments.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentNode {
    /// Experiment name, also the suffix of its storage key.
    pub name: String,
    /// Variant weights or nested experiments.
    pub variants: Variants,
    /// Lifetime of a persisted assignment. `None` means session-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_days: Option<f64>,
}

/// Variants of an experiment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, From)]
#[serde(untagged)]
pub enum Variants {
    /// Explicit weights for variants `0..n`. A missing (`null`) weight counts as `1`.
    Weights(Vec<Option<f64>>),
    /// Nested experiments. The parent's variant index selects which child is active.
    Experiments(Vec<ExperimentNode>),
}

impl Variants {
    /// Number of variants.
    pub fn len(&self) -> usize {
        match self {
            Variants::Weights(weights) => weights.len(),
            Variants::Experiments(children) => children.len(),
        }
    }

    /// Returns `true` if there are no variants. Loaded definitions never have empty variants.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExperimentNode {
    /// Create a leaf experiment with explicit weights.
    pub fn leaf(name: impl Into<String>, weights: impl IntoIterator<Item = f64>) -> Self {
        ExperimentNode {
            name: name.into(),
            variants: Variants::Weights(weights.into_iter().map(Some).collect()),
            max_age_days: None,
        }
    }

    /// Create a branch experiment whose variants are the given children.
    pub fn branch(name: impl Into<String>, children: Vec<ExperimentNode>) -> Self {
        ExperimentNode {
            name: name.into(),
            variants: Variants::Experiments(children),
            max_age_days: None,
        }
    }

    /// Set the assignment lifetime in days.
    pub fn max_age_days(mut self, days: f64) -> Self {
        self.max_age_days = Some(days);
        self
    }

    /// A leaf has plain numeric weights.
    pub fn is_leaf(&self) -> bool {
        matches!(self.variants, Variants::Weights(_))
    }

    fn validate(&self) -> Result<()> {
        if let Some(days) = self.max_age_days.filter(|d| !d.is_finite() || *d < 0.0) {
            return Err(Error::InvalidMaxAge {
                experiment: self.name.clone(),
                days,
            });
        }
        if self.variants.is_empty() {
            return Err(Error::EmptyVariants {
                experiment: self.name.clone(),
            });
        }
        match &self.variants {
            Variants::Weights(weights) => {
                if let Some(weight) = weights
                    .iter()
                    .flatten()
                    .find(|w| !w.is_finite() || **w < 0.0)
                {
                    return Err(Error::InvalidWeight {
                        experiment: self.name.clone(),
                        weight: *weight,
                    });
                }
                let total: f64 = weights.iter().map(|w| w.unwrap_or(1.0)).sum();
                if !total.is_finite() {
                    return Err(Error::InvalidTotalWeight {
                        experiment: self.name.clone(),
                    });
                }
                Ok(())
            }
            Variants::Experiments(children) => children.iter().try_for_each(|c| c.validate()),
        }
    }
}

impl TryFrom<Vec<ExperimentNode>> for Experiments {
    type Error = Error;

    fn try_from(nodes: Vec<ExperimentNode>) -> Result<Self> {
        nodes.iter().try_for_each(ExperimentNode::validate)?;
        Ok(Experiments(nodes))
    }
}

impl Experiments {
    /// Validate and wrap a list of top-level experiments.
    pub fn new(nodes: Vec<ExperimentNode>) -> Result<Self> {
        Self::try_from(nodes)
    }

    /// Parse definitions from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let nodes: Vec<ExperimentNode> = serde_json::from_str(json)?;
        Self::new(nodes)
    }

    /// Parse definitions from a JSON reader.
    pub fn from_reader(reader: impl std::io::Read) -> Result<Self> {
        let nodes: Vec<ExperimentNode> = serde_json::from_reader(reader)?;
        Self::new(nodes)
    }

    /// Load definitions from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DefinitionsNotFound`] if the file does not exist, and a parse or
    /// validation error if its content is not a valid definition set.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::DefinitionsNotFound(path.to_owned()));
        }
        let experiments = Self::from_reader(BufReader::new(File::open(path)?))?;
        log::debug!(target: "ab_segment",
                    path:display = path.display(),
                    count = experiments.0.len();
                    "loaded experiment definitions");
        Ok(experiments)
    }

    /// Top-level experiments in definition order.
    pub fn nodes(&self) -> &[ExperimentNode] {
        &self.0
    }

    /// Find an experiment anywhere in the tree. See [`find_experiment`].
    pub fn find_experiment(&self, name: &str) -> Option<FoundExperiment<'_>> {
        find_experiment(name, &self.0, None)
    }

    /// Names of all leaf experiments, depth first. Branches contribute their children's names
    /// instead of their own.
    pub fn leaf_names(&self) -> Vec<&str> {
        fn collect<'a>(nodes: &'a [ExperimentNode], acc: &mut Vec<&'a str>) {
            for node in nodes {
                match &node.variants {
                    Variants::Experiments(children) => collect(children, acc),
                    Variants::Weights(_) => acc.push(&node.name),
                }
            }
        }

        let mut names = Vec::new();
        collect(&self.0, &mut names);
        names
    }
}

/// An experiment located in the tree together with its position.
#[derive(Debug, Clone, Copy)]
pub struct FoundExperiment<'a> {
    /// The matching experiment.
    pub node: &'a ExperimentNode,
    /// Position among its siblings. For a nested experiment, this is the parent variant that
    /// makes it active.
    pub index: usize,
    /// The immediate structural parent, if the experiment is nested.
    pub parent: Option<&'a ExperimentNode>,
}

/// Depth-first search for `name` in `nodes`, in sibling order. The first match wins.
///
/// `parent` is returned unchanged for a match at this level; recursion into a branch passes the
/// branch itself as the parent.
pub fn find_experiment<'a>(
    name: &str,
    nodes: &'a [ExperimentNode],
    parent: Option<&'a ExperimentNode>,
) -> Option<FoundExperiment<'a>> {
    for (index, node) in nodes.iter().enumerate() {
        if node.name == name {
            return Some(FoundExperiment {
                node,
                index,
                parent,
            });
        }
        if let Variants::Experiments(children) = &node.variants {
            if let Some(found) = find_experiment(name, children, Some(node)) {
                return Some(found);
            }
        }
    }
    None
}

/// Per-lookup view of an experiment, with its weights already computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedVariant {
    /// Position among siblings (not a bucket).
    pub index: usize,
    #[allow(missing_docs)]
    pub name: String,
    /// Normalized weights, see [`calculate_distribution`].
    pub weights: Vec<f64>,
    #[allow(missing_docs)]
    pub max_age_days: Option<f64>,
}

impl FoundExperiment<'_> {
    /// Compute the weight distribution for this experiment.
    pub fn resolve(&self) -> ResolvedVariant {
        ResolvedVariant {
            index: self.index,
            name: self.node.name.clone(),
            weights: calculate_distribution(&self.node.variants),
            max_age_days: self.node.max_age_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::BufReader};

    use super::{ExperimentNode, Experiments, Variants};
    use crate::Error;

    fn fixture() -> Experiments {
        let f = File::open("tests/data/experiments.json")
            .expect("Failed to open tests/data/experiments.json");
        Experiments::from_reader(BufReader::new(f)).unwrap()
    }

    #[test]
    fn parse_experiments_fixture() {
        let experiments = fixture();
        assert_eq!(experiments.nodes().len(), 4);

        let button = &experiments.nodes()[0];
        assert_eq!(button.name, "button-color");
        assert_eq!(button.max_age_days, Some(30.0));
        assert_eq!(
            button.variants,
            Variants::Weights(vec![Some(1.0), Some(1.0), Some(2.0)])
        );
        assert!(!experiments.nodes()[1].is_leaf());
    }

    #[test]
    fn null_weight_parses_as_missing() {
        let experiments =
            Experiments::from_json_str(r#"[{ "name": "e", "variants": [2, null] }]"#).unwrap();
        assert_eq!(
            experiments.nodes()[0].variants,
            Variants::Weights(vec![Some(2.0), None])
        );
    }

    #[test]
    fn finds_top_level_experiment_without_parent() {
        let experiments = fixture();
        let found = experiments.find_experiment("hero-banner").unwrap();
        assert_eq!(found.node.name, "hero-banner");
        assert_eq!(found.index, 2);
        assert!(found.parent.is_none());
    }

    #[test]
    fn finds_nested_experiment_with_immediate_parent() {
        let experiments = fixture();
        let found = experiments.find_experiment("multi-step-summary").unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.parent.unwrap().name, "checkout-multi-step");

        let found = experiments.find_experiment("checkout-multi-step").unwrap();
        assert_eq!(found.index, 1);
        assert_eq!(found.parent.unwrap().name, "checkout");
    }

    #[test]
    fn first_match_wins_depth_first() {
        let experiments = Experiments::new(vec![
            ExperimentNode::branch(
                "outer",
                vec![
                    ExperimentNode::leaf("dup", [1.0]),
                    ExperimentNode::leaf("other", [1.0]),
                ],
            ),
            ExperimentNode::leaf("dup", [1.0, 1.0]),
        ])
        .unwrap();

        let found = experiments.find_experiment("dup").unwrap();
        assert_eq!(found.index, 0);
        assert_eq!(found.parent.unwrap().name, "outer");
        assert_eq!(found.node.variants.len(), 1);
    }

    #[test]
    fn unknown_experiment_is_not_found() {
        assert!(fixture().find_experiment("does-not-exist").is_none());
    }

    #[test]
    fn resolve_computes_weights() {
        let experiments = fixture();
        let resolved = experiments.find_experiment("checkout").unwrap().resolve();
        assert_eq!(resolved.index, 1);
        assert_eq!(resolved.weights, vec![50.0, 50.0]);
        assert_eq!(resolved.max_age_days, Some(14.0));

        let resolved = experiments
            .find_experiment("multi-step-progress-bar")
            .unwrap()
            .resolve();
        assert_eq!(resolved.weights, vec![1.0, 1.0]);
    }

    #[test]
    fn leaf_names_skip_branches() {
        assert_eq!(
            fixture().leaf_names(),
            vec![
                "button-color",
                "checkout-single-page",
                "multi-step-progress-bar",
                "multi-step-summary",
                "hero-banner",
                "single",
            ]
        );
    }

    #[test]
    fn rejects_empty_variants() {
        let err =
            Experiments::from_json_str(r#"[{ "name": "b", "variants": [{ "name": "c", "variants": [] }] }]"#)
                .unwrap_err();
        assert!(matches!(err, Error::EmptyVariants { experiment } if experiment == "c"));
    }

    #[test]
    fn rejects_negative_weight() {
        let err = Experiments::new(vec![ExperimentNode::leaf("neg", [1.0, -1.0])]).unwrap_err();
        assert!(matches!(err, Error::InvalidWeight { weight, .. } if weight == -1.0));
    }

    #[test]
    fn rejects_weights_with_infinite_total() {
        let err = Experiments::from_json_str(r#"[{ "name": "big", "variants": [1e308, 1e308] }]"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTotalWeight { experiment } if experiment == "big"));
    }

    #[test]
    fn rejects_invalid_max_age() {
        let err = Experiments::from_json_str(r#"[{ "name": "neg", "variants": [1], "maxAgeDays": -5 }]"#)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMaxAge { days, .. } if days == -5.0));

        let err = Experiments::new(vec![ExperimentNode::branch(
            "outer",
            vec![ExperimentNode::leaf("nan", [1.0]).max_age_days(f64::NAN)],
        )])
        .unwrap_err();
        assert!(matches!(err, Error::InvalidMaxAge { experiment, .. } if experiment == "nan"));

        assert!(Experiments::new(vec![ExperimentNode::leaf("long", [1.0]).max_age_days(1.0e8)]).is_ok());
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Experiments::from_json_str(r#"{ "name": "x" }"#).unwrap_err();
        assert!(matches!(err, Error::DefinitionParse(_)));
    }

    #[test]
    fn missing_definitions_file() {
        let err = Experiments::from_path("tests/data/does-not-exist.json").unwrap_err();
        assert!(matches!(err, Error::DefinitionsNotFound(_)));
    }

    #[test]
    fn deserialize_validates() {
        let result: Result<Experiments, _> =
            serde_json::from_str(r#"[{ "name": "e", "variants": [] }]"#);
        assert!(result.is_err());
    }
}
