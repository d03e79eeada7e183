pub mod canvas;
pub mod grid;
pub mod ledger;
pub mod pixel;
pub mod portfolio;
pub mod wallet;
