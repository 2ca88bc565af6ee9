//! State and layout engine for a canvas-based mind-mapping editor.
//!
//! The engine owns a forest of positioned nodes and keeps it consistent under
//! live mutation: adding, deleting, editing, collapsing, dragging, reordering
//! and reparenting nodes, with every structural change re-centering the
//! affected branches and pushing neighbouring trees out of the way. The host
//! UI is responsible only for turning raw input into calls on
//! [`editor::Editor`] and for drawing what the store contains.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`editor`] | Session controller composing every other module |
//! | [`store`] | Flat tree store: nodes, root order, assets |
//! | [`layout`] | Centering, rigid subtree moves, overlap resolution |
//! | [`nav`] | Spatial keyboard navigation |
//! | [`labels`] | EasyMotion jump-label generation and key handling |
//! | [`history`] | Snapshot-based undo/redo |
//! | [`input`] | Pointer gesture state (drag, resize) |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`measure`] | Text measurement collaborator |
//! | [`document`] | Versioned JSON file schema |
//! | [`persist`] | Persistence collaborator and filesystem provider |
//! | [`config`] | Engine configuration and environment overrides |
//! | [`consts`] | Shared numeric defaults |

pub mod camera;
pub mod config;
pub mod consts;
pub mod document;
pub mod editor;
pub mod history;
pub mod input;
pub mod labels;
pub mod layout;
pub mod measure;
pub mod nav;
pub mod persist;
pub mod store;
