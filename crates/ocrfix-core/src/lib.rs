pub mod config;
pub mod geometry;
pub mod groups;
pub mod hit;
pub mod id;
pub mod model;
pub mod ordering;
pub mod store;
pub mod text;
pub mod wire;

pub use config::EditorConfig;
pub use geometry::{StageSize, compute_stage_size, to_display_space, to_image_space};
pub use groups::{
    GroupInfo, GroupTarget, SelectionGroup, ShiftDirection, assign_group, group_label_from_index,
    group_sequence, groups, new_group_id, selection_group_id, shift_group,
};
pub use hit::{hit_test, hit_test_rect};
pub use id::AnnotationId;
pub use model::*;
pub use ordering::{ArrangeDirection, arrange};
pub use store::AnnotationStore;
pub use text::{TextMode, assemble};
pub use wire::{PageDocument, RawAnnotation, SaveBody, SaveReceipt, WireError, decode_page};

// Re-export kurbo geometry types so downstream crates don't need a direct dependency
pub use kurbo::{Point, Rect, Size};
