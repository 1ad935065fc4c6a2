pub mod desktop;
pub mod terminal;

pub use desktop::{DesktopActor, DesktopActorMsg, DesktopArguments, InputEvent, InputFeedback};
pub use terminal::{TerminalActor, TerminalArguments, TerminalMsg};
