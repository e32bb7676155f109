pub mod arena;
pub mod autosave;
pub mod input;
pub mod selection;
pub mod session;
pub mod shortcuts;
pub mod tools;

pub use arena::{HandleArena, RenderHandle};
pub use autosave::{AutosavePipeline, Clock, Debounce, SaveRequest, SaveState, SaveStatus, SaveTicket};
pub use input::{InputEvent, Modifiers};
pub use selection::{SelectMode, SelectionController};
pub use session::{EditorSession, SessionEvent, StoreMutation, SubscriptionId, TransformOutcome};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use tools::{ShapeTransform, ToolKind};
