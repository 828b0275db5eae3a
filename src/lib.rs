//! A random forest regressor: bootstrap-aggregated regression trees grown by
//! greedy variance-reduction splitting, scored by mean squared error.
pub use decision_tree::{
    DecisionTreeOptions, DecisionTreeRegressor, FitError, Node, PredictError, Split,
    StructuralError,
};
pub use grid::{GridCell, GridError, GridSearch};
pub use metrics::{mean_squared_error, MseError};
pub use random_forest::{RandomForestOptions, RandomForestRegressor};
pub use table::{Dataset, Table, TableError};

pub mod io;
pub mod split;

mod decision_tree;
mod functions;
mod grid;
mod metrics;
mod random_forest;
mod table;
