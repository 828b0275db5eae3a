use crate::functions;
use crate::split;
use crate::table::Table;
use rand::Rng;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Default)]
pub struct DecisionTreeOptions {
    /// Number of split levels; `0` yields a single leaf.
    pub max_depth: usize,

    /// Features sampled per node; `None` means `ceil(p / 3)`.
    pub max_features: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct DecisionTreeRegressor {
    root: Node,
    features_len: usize,
}

impl DecisionTreeRegressor {
    pub fn fit<R: Rng + ?Sized>(
        rng: &mut R,
        table: &Table,
        options: &DecisionTreeOptions,
    ) -> Result<Self, FitError> {
        if table.is_empty() {
            return Err(FitError::EmptyTable);
        }

        let max_features = options
            .max_features
            .unwrap_or_else(|| split::default_max_features(table.features_len()));
        let mut builder = NodeBuilder { rng, max_features };

        // A budget of `max_depth + 1` node levels: the deepest level records its
        // split but its children are cut off, which leaves it a leaf.
        let root = builder
            .build(table, options.max_depth.saturating_add(1))
            .ok_or(FitError::EmptyTable)?;
        Ok(Self {
            root,
            features_len: table.features_len(),
        })
    }

    /// Predicts `xs`, a row ordered by feature index.
    pub fn predict(&self, xs: &[f64]) -> Result<f64, PredictError> {
        check_row(xs, self.features_len)?;
        Ok(self.root.predict(xs)?)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

impl fmt::Display for DecisionTreeRegressor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.root, f)
    }
}

/// One decision point of a tree.
///
/// Every node stores the mean target of the rows that reached it. A node is a
/// leaf iff both children are absent; a leaf may still carry the split it chose
/// when its children were cut off by the depth budget.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    prediction: f64,
    split: Option<Split>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    feature: usize,
    threshold: f64,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Split {
    pub fn feature(&self) -> usize {
        self.feature
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn left(&self) -> Option<&Node> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Node> {
        self.right.as_deref()
    }
}

impl Node {
    fn leaf(prediction: f64) -> Self {
        Self {
            prediction,
            split: None,
        }
    }

    pub fn prediction(&self) -> f64 {
        self.prediction
    }

    pub fn split(&self) -> Option<&Split> {
        self.split.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.split
            .as_ref()
            .map_or(true, |s| s.left.is_none() && s.right.is_none())
    }

    /// Number of split levels below this node.
    pub fn depth(&self) -> usize {
        self.children()
            .map(|c| c.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn leaves(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children().map(Node::leaves).sum()
        }
    }

    fn children(&self) -> impl Iterator<Item = &Node> {
        self.split
            .iter()
            .flat_map(|s| s.left().into_iter().chain(s.right()))
    }

    fn predict(&self, xs: &[f64]) -> Result<f64, StructuralError> {
        let split = match &self.split {
            Some(split) if !self.is_leaf() => split,
            _ => return Ok(self.prediction),
        };

        let x = xs
            .get(split.feature)
            .copied()
            .ok_or_else(|| StructuralError {
                subtree: self.to_string(),
            })?;
        let child = if x <= split.threshold {
            split.left()
        } else if x > split.threshold {
            split.right()
        } else {
            None
        };
        match child {
            Some(child) => child.predict(xs),
            None => Err(StructuralError {
                subtree: self.to_string(),
            }),
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter, level: usize) -> fmt::Result {
        write!(f, "{:width$}Node <", "", width = level * 2)?;
        if let Some(split) = &self.split {
            write!(
                f,
                "feature={}, threshold={}, ",
                split.feature, split.threshold
            )?;
        }
        writeln!(f, "prediction={}>", self.prediction)?;
        for child in self.children() {
            child.fmt_indented(f, level + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

struct NodeBuilder<'r, R: ?Sized> {
    rng: &'r mut R,
    max_features: usize,
}

impl<R: Rng + ?Sized> NodeBuilder<'_, R> {
    /// Builds the subtree for `table`, or nothing once the depth budget is spent.
    fn build(&mut self, table: &Table, depth: usize) -> Option<Node> {
        if depth == 0 {
            return None;
        }

        let prediction = functions::mean(table.target());
        let best = match split::best_split(&mut *self.rng, table, self.max_features) {
            Some(best) => best,
            None => return Some(Node::leaf(prediction)),
        };

        let (left, right) = split::split_masks(table.feature(best.feature), best.threshold);
        if !left.contains(&true) || !right.contains(&true) {
            return Some(Node::leaf(prediction));
        }

        let left = self.build(&table.select(&left), depth - 1).map(Box::new);
        let right = self.build(&table.select(&right), depth - 1).map(Box::new);
        Some(Node {
            prediction,
            split: Some(Split {
                feature: best.feature,
                threshold: best.threshold,
                left,
                right,
            }),
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("flaw in tree structure:\n{subtree}")]
pub struct StructuralError {
    pub subtree: String,
}

/// Checks that `xs` has `features_len` finite values.
pub(crate) fn check_row(xs: &[f64], features_len: usize) -> Result<(), PredictError> {
    if xs.len() != features_len {
        return Err(PredictError::FeatureCountMismatch {
            expected: features_len,
            got: xs.len(),
        });
    }

    if let Some(feature) = xs.iter().position(|x| !x.is_finite()) {
        return Err(PredictError::NonFiniteValue {
            feature,
            value: xs[feature],
        });
    }
    Ok(())
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("cannot average the predictions of a forest without trees")]
    EmptyForest,

    #[error("expected {expected} feature values, got {got}")]
    FeatureCountMismatch { expected: usize, got: usize },

    #[error("feature {feature} is not a finite number: {value}")]
    NonFiniteValue { feature: usize, value: f64 },

    #[error("feature `{name}` is missing from the evaluated table")]
    MissingFeature { name: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("cannot fit a tree on a table without rows")]
    EmptyTable,
}
