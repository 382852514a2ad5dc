//! Topology entities: buses, panels, lines, line types and paths.
//!
//! Entities are plain values with typed ids. Anything fixed is fixed by
//! construction: there are no setters for ids, line endpoints or a path's
//! chain. The few genuinely dynamic fields (panel size, the write-once
//! demand series) re-validate on every write.

pub mod bus;
pub mod ids;
pub mod line;
pub mod line_type;
pub mod panel;
pub mod path;

pub use bus::Bus;
pub use ids::IdAllocator;
pub use line::Line;
pub use line_type::LineType;
pub use panel::Panel;
pub use path::Path;
