//! Domain types: bars, orders, fills, positions, the portfolio ledger, ids.

pub mod bar;
pub mod fill;
pub mod ids;
pub mod order;
pub mod portfolio;
pub mod position;

pub use bar::{Bar, BarDefect, PriceReference};
pub use fill::Fill;
pub use ids::{DatasetHash, IdGen, OrderId};
pub use order::{Order, OrderRequest, OrderType, Side};
pub use portfolio::{EquitySample, Portfolio};
pub use position::{Position, QTY_EPSILON};
