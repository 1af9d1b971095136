/// Data layer: tables, loading, and the comparison stages.
///
/// Architecture:
/// ```text
///  control.csv      experimental.csv
///        │                 │
///        ▼                 ▼
///   ┌──────────┐     ┌──────────┐
///   │  loader   │     │  loader   │  parse file → Table
///   └──────────┘     └──────────┘
///        └───────┬─────────┘
///                ▼
///         ┌────────────┐
///         │ normalize   │  experimental / control → ratio Table
///         └────────────┘
///                │
///                ▼
///         ┌────────────┐
///         │ threshold   │  k-fold OLS RMSE × multiplier → Threshold
///         └────────────┘
///                │
///                ▼
///         ┌────────────┐
///         │  filter     │  ratio outside [1-t, 1+t] → AnomalyRecord
///         └────────────┘
///                │
///                ▼
///         ┌────────────┐
///         │  writer     │  Value,Cell CSV (atomic)
///         └────────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod threshold;
pub mod writer;
