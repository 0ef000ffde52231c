// Per-symbol monitoring and the loop that drives it
pub mod clock;
pub mod journal;
pub mod monitor;
pub mod scheduler;
pub mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use journal::TradeJournal;
pub use monitor::{MonitorContext, SymbolMonitor, SymbolState, TickOutcome};
pub use scheduler::Scheduler;
pub use session::TradingSession;
