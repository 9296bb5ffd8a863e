mod event_queue;
mod input_handler;

pub use event_queue::{EventQueue, InputEvent};
pub use input_handler::{InputBindings, InputHandler};
