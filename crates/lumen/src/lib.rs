#![doc(html_no_source)]

mod lumen;
pub use lumen::Lumen;

// Reexport all crates
pub use lumen_camera;
pub use lumen_input;
pub use lumen_path_tracer;
pub use lumen_render_loop;
pub use lumen_scene;
pub use lumen_time;
pub use puffin;
