// ── Tracked state ──
//
// The live registry and the history ring. Both are owned by the monitor
// and written only by the lifecycle engine.

mod history;
mod registry;

pub use history::HistoryLog;
pub use registry::DeviceRegistry;
