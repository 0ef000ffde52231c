// Risk management module
pub mod position_sizer;

pub use position_sizer::PositionSizer;
