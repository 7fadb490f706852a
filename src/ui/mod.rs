//! Terminal UI components for the chat interface

pub mod bubble;
pub mod chat;
pub mod commands;
pub mod composer;
pub mod sidebar;

pub use chat::ChatView;
pub use composer::{Composer, ComposerResult};
pub use sidebar::{Sidebar, SidebarAction};
