/// Data layer: tables, loading, time filtering, series transforms and KDE.
///
/// Architecture:
/// ```text
///  metrics.csv / icontrol.csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse bytes → Table (Time coerced, bad rows dropped)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  TimeRange → row subset
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │  series  │   │   kde    │  raw / rolling mean, density snapshots
///   └──────────┘   └──────────┘
/// ```

pub mod filter;
pub mod kde;
pub mod loader;
pub mod model;
pub mod series;
